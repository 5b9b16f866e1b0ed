//! Persisted mkcert state: installed version and last certificate record.
//!
//! Both live in one JSON file under `<save_path>/state/`. Every mutation is
//! written through immediately; there is exactly one writer per process.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use devcert_common::{hash, persist};

/// State file name inside the state directory.
const STATE_FILE_NAME: &str = "mkcert.json";

/// Content fingerprints of the key and certificate files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertHash {
    pub key: Option<String>,
    pub cert: Option<String>,
}

impl CertHash {
    /// Hash the files currently on disk. Unreadable files hash to `None`.
    pub fn of_files(key_path: &Path, cert_path: &Path) -> Self {
        Self {
            key: hash::file_fingerprint(key_path),
            cert: hash::file_fingerprint(cert_path),
        }
    }

    /// Whether both fingerprints are present and equal to `other`'s.
    ///
    /// A missing side never matches, so a deleted file always counts as
    /// tampered.
    pub fn matches(&self, other: &CertHash) -> bool {
        self.key.is_some() && self.cert.is_some() && self == other
    }
}

/// Hosts and fingerprints captured at the last successful generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertRecord {
    pub hosts: BTreeSet<String>,
    pub hash: CertHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl CertRecord {
    pub fn new(hosts: BTreeSet<String>, hash: CertHash) -> Self {
        Self {
            hosts,
            hash,
            generated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
struct StateData {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    record: Option<CertRecord>,
}

/// VersionStore and CertRecord backed by one JSON file.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    data: StateData,
}

impl StateFile {
    /// Default state file location under a save directory.
    pub fn default_path(save_path: &Path) -> PathBuf {
        devcert_common::paths::state_dir(save_path).join(STATE_FILE_NAME)
    }

    /// Load the state file, or start empty when it does not exist yet.
    pub fn init(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let data: StateData = persist::load_or_default(&path)?;
        tracing::debug!(
            path = %path.display(),
            version = data.version.as_deref().unwrap_or("none"),
            has_record = data.record.is_some(),
            "State loaded"
        );
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> Option<&str> {
        self.data.version.as_deref()
    }

    pub fn set_version(&mut self, version: &str) -> std::io::Result<()> {
        self.data.version = Some(version.to_string());
        self.save()
    }

    pub fn record(&self) -> Option<&CertRecord> {
        self.data.record.as_ref()
    }

    /// Replace the certificate record. Records are overwritten, never appended.
    pub fn set_record(&mut self, record: CertRecord) -> std::io::Result<()> {
        self.data.record = Some(record);
        self.save()
    }

    fn save(&self) -> std::io::Result<()> {
        persist::store(&self.path, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_state_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("devcert-state-{name}-{nanos}"))
            .join(STATE_FILE_NAME)
    }

    fn hosts(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn missing_file_starts_empty() {
        let state = StateFile::init(temp_state_path("empty")).unwrap();
        assert!(state.version().is_none());
        assert!(state.record().is_none());
    }

    #[test]
    fn version_and_record_survive_reload() {
        let path = temp_state_path("reload");
        let mut state = StateFile::init(&path).unwrap();
        state.set_version("v1.4.4").unwrap();
        state
            .set_record(CertRecord::new(
                hosts(&["localhost", "127.0.0.1"]),
                CertHash {
                    key: Some("abc".into()),
                    cert: Some("def".into()),
                },
            ))
            .unwrap();

        let reloaded = StateFile::init(&path).unwrap();
        assert_eq!(reloaded.version(), Some("v1.4.4"));
        let record = reloaded.record().unwrap();
        assert_eq!(record.hosts, hosts(&["127.0.0.1", "localhost"]));
        assert_eq!(record.hash.key.as_deref(), Some("abc"));
    }

    #[test]
    fn record_is_overwritten() {
        let path = temp_state_path("overwrite");
        let mut state = StateFile::init(&path).unwrap();
        state
            .set_record(CertRecord::new(hosts(&["a.test"]), CertHash::default()))
            .unwrap();
        state
            .set_record(CertRecord::new(hosts(&["b.test"]), CertHash::default()))
            .unwrap();

        let reloaded = StateFile::init(&path).unwrap();
        assert_eq!(reloaded.record().unwrap().hosts, hosts(&["b.test"]));
    }

    #[test]
    fn legacy_record_without_timestamp_loads() {
        let path = temp_state_path("legacy");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"version":"v1.4.3","record":{"hosts":["localhost"],"hash":{"key":"abc","cert":"def"}}}"#,
        )
        .unwrap();

        let state = StateFile::init(&path).unwrap();
        assert_eq!(state.record().unwrap().generated_at, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = temp_state_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        let err = StateFile::init(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn missing_fingerprint_never_matches() {
        let recorded = CertHash {
            key: None,
            cert: None,
        };
        assert!(!CertHash::default().matches(&recorded));

        let live = CertHash {
            key: Some("abc".into()),
            cert: Some("def".into()),
        };
        assert!(live.matches(&live.clone()));
        assert!(!live.matches(&CertHash {
            key: Some("abc".into()),
            cert: Some("xyz".into()),
        }));
    }
}
