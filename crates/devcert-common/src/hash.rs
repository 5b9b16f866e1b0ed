//! Content fingerprints for tamper detection.
//!
//! The generated key and certificate are fingerprinted right after mkcert
//! writes them. Re-hashing the files later and comparing against the stored
//! fingerprint reveals out-of-band edits or deletion.

use std::path::Path;

use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as a lowercase hex string.
pub fn fingerprint_sha256(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hex_encode(&hash)
}

/// Fingerprint of a file's contents, or `None` when it cannot be read.
///
/// `None` never matches a stored fingerprint, so a missing file always
/// reads as tampered.
pub fn file_fingerprint(path: &Path) -> Option<String> {
    std::fs::read(path).ok().map(|bytes| fingerprint_sha256(&bytes))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let data = b"-----BEGIN CERTIFICATE-----";
        assert_eq!(fingerprint_sha256(data), fingerprint_sha256(data));
    }

    #[test]
    fn fingerprint_is_hex_string() {
        let fp = fingerprint_sha256(b"key material");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn known_digest_of_empty_input() {
        assert_eq!(
            fingerprint_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn missing_file_has_no_fingerprint() {
        let path = std::env::temp_dir().join("devcert-hash-test-does-not-exist.pem");
        let _ = std::fs::remove_file(&path);
        assert!(file_fingerprint(&path).is_none());
    }

    #[test]
    fn file_fingerprint_matches_content_hash() {
        let path = std::env::temp_dir().join(format!(
            "devcert-hash-test-{}.pem",
            std::process::id()
        ));
        std::fs::write(&path, b"cert body").unwrap();

        assert_eq!(file_fingerprint(&path), Some(fingerprint_sha256(b"cert body")));

        let _ = std::fs::remove_file(&path);
    }
}
