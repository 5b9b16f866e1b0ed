use std::path::PathBuf;

/// Environment variable that overrides the save directory.
pub const DATA_DIR_ENV: &str = "DEVCERT_DATA_DIR";

/// Directory name used under the project root when no override is set.
const PROJECT_DIR_NAME: &str = ".devcert";

/// Root save directory for devcert.
///
/// Everything devcert persists is project-local: the managed mkcert
/// binary, the state record and the generated key/cert pair.
///
/// - `$DEVCERT_DATA_DIR` when set and non-empty
/// - otherwise `<current dir>/.devcert/`
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    match std::env::current_dir() {
        Ok(cwd) => cwd.join(PROJECT_DIR_NAME),
        // Fallback
        Err(_) => PathBuf::from(PROJECT_DIR_NAME),
    }
}

/// Directory holding the managed mkcert binary under `root`.
pub fn bin_dir(root: &std::path::Path) -> PathBuf {
    root.join("bin")
}

/// Directory holding the generated key and certificate under `root`.
pub fn certs_dir(root: &std::path::Path) -> PathBuf {
    root.join("certs")
}

/// Directory holding persisted records under `root`.
pub fn state_dir(root: &std::path::Path) -> PathBuf {
    root.join("state")
}

/// File name of the mkcert executable on this platform.
pub fn mkcert_file_name() -> &'static str {
    if cfg!(windows) {
        "mkcert.exe"
    } else {
        "mkcert"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn sub_directories_hang_off_root() {
        let root = Path::new("/tmp/project/.devcert");
        assert_eq!(bin_dir(root), root.join("bin"));
        assert_eq!(certs_dir(root), root.join("certs"));
        assert_eq!(state_dir(root), root.join("state"));
    }

    #[test]
    fn mkcert_file_name_matches_platform() {
        let name = mkcert_file_name();
        if cfg!(windows) {
            assert!(name.ends_with(".exe"));
        } else {
            assert_eq!(name, "mkcert");
        }
    }
}
