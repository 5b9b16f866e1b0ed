//! Options for locating mkcert, the release source and certificate files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{MkcertError, Result};
use crate::source::{SourceKind, SourceProvider};

/// Default key file name inside the certs directory.
pub const DEFAULT_KEY_FILE_NAME: &str = "dev.pem";

/// Default certificate file name inside the certs directory.
pub const DEFAULT_CERT_FILE_NAME: &str = "cert.pem";

#[derive(Debug, Clone)]
pub struct MkcertOptions {
    /// Check for a newer mkcert on every `init`, not only when it is missing.
    pub auto_upgrade: bool,
    pub source: SourceKind,
    /// Caller-supplied mkcert binary. Takes precedence over the managed one.
    pub mkcert_path: Option<PathBuf>,
    pub save_path: PathBuf,
    pub key_file_name: String,
    pub cert_file_name: String,
    /// Regenerate on every non-empty `install`.
    pub force: bool,
}

impl Default for MkcertOptions {
    fn default() -> Self {
        Self {
            auto_upgrade: false,
            source: SourceKind::default(),
            mkcert_path: None,
            save_path: devcert_common::paths::data_dir(),
            key_file_name: DEFAULT_KEY_FILE_NAME.to_string(),
            cert_file_name: DEFAULT_CERT_FILE_NAME.to_string(),
            force: false,
        }
    }
}

impl MkcertOptions {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new(Self::default())
    }

    /// Options from a `devcert.toml` file, with defaults for absent keys.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: OptionsFile =
            toml::from_str(text).map_err(|e| MkcertError::Config(e.to_string()))?;
        file.apply(Self::builder()).map(OptionsBuilder::build)
    }

    pub fn key_path(&self) -> PathBuf {
        devcert_common::paths::certs_dir(&self.save_path).join(&self.key_file_name)
    }

    pub fn cert_path(&self) -> PathBuf {
        devcert_common::paths::certs_dir(&self.save_path).join(&self.cert_file_name)
    }

    /// Where a downloaded mkcert is kept.
    pub fn managed_binary_path(&self) -> PathBuf {
        devcert_common::paths::bin_dir(&self.save_path)
            .join(devcert_common::paths::mkcert_file_name())
    }
}

pub struct OptionsBuilder {
    options: MkcertOptions,
}

impl OptionsBuilder {
    pub fn new(options: MkcertOptions) -> Self {
        Self { options }
    }

    pub fn auto_upgrade(mut self, enabled: bool) -> Self {
        self.options.auto_upgrade = enabled;
        self
    }

    pub fn source(mut self, source: SourceKind) -> Self {
        self.options.source = source;
        self
    }

    pub fn custom_source(mut self, provider: Arc<dyn SourceProvider>) -> Self {
        self.options.source = SourceKind::Custom(provider);
        self
    }

    pub fn mkcert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.mkcert_path = Some(path.into());
        self
    }

    pub fn save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.save_path = path.into();
        self
    }

    pub fn key_file_name(mut self, name: impl Into<String>) -> Self {
        self.options.key_file_name = name.into();
        self
    }

    pub fn cert_file_name(mut self, name: impl Into<String>) -> Self {
        self.options.cert_file_name = name.into();
        self
    }

    pub fn force(mut self, enabled: bool) -> Self {
        self.options.force = enabled;
        self
    }

    pub fn build(self) -> MkcertOptions {
        self.options
    }
}

/// On-disk shape of `devcert.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct OptionsFile {
    auto_upgrade: Option<bool>,
    source: Option<String>,
    mkcert_path: Option<PathBuf>,
    save_path: Option<PathBuf>,
    key_file_name: Option<String>,
    cert_file_name: Option<String>,
    force: Option<bool>,
}

impl OptionsFile {
    fn apply(self, mut builder: OptionsBuilder) -> Result<OptionsBuilder> {
        if let Some(name) = self.source {
            let kind = SourceKind::from_name(&name)
                .ok_or_else(|| MkcertError::Config(format!("unknown source `{name}`")))?;
            builder = builder.source(kind);
        }
        if let Some(v) = self.auto_upgrade {
            builder = builder.auto_upgrade(v);
        }
        if let Some(p) = self.mkcert_path {
            builder = builder.mkcert_path(p);
        }
        if let Some(p) = self.save_path {
            builder = builder.save_path(p);
        }
        if let Some(n) = self.key_file_name {
            builder = builder.key_file_name(n);
        }
        if let Some(n) = self.cert_file_name {
            builder = builder.cert_file_name(n);
        }
        if let Some(v) = self.force {
            builder = builder.force(v);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_dev_pem_names() {
        let options = MkcertOptions::builder().save_path("/p/.devcert").build();
        assert!(!options.auto_upgrade);
        assert!(!options.force);
        assert!(options.mkcert_path.is_none());
        assert_eq!(options.key_path(), PathBuf::from("/p/.devcert/certs/dev.pem"));
        assert_eq!(options.cert_path(), PathBuf::from("/p/.devcert/certs/cert.pem"));
        assert_eq!(
            options.managed_binary_path().parent(),
            Some(Path::new("/p/.devcert/bin"))
        );
    }

    #[test]
    fn toml_overrides_defaults() {
        let options = MkcertOptions::from_toml_str(
            r#"
            auto-upgrade = true
            source = "coding"
            save-path = "/srv/app/.devcert"
            key-file-name = "key.pem"
            "#,
        )
        .unwrap();
        assert!(options.auto_upgrade);
        assert!(matches!(options.source, SourceKind::Coding));
        assert_eq!(options.key_path(), PathBuf::from("/srv/app/.devcert/certs/key.pem"));
        assert_eq!(options.cert_file_name, DEFAULT_CERT_FILE_NAME);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let options = MkcertOptions::from_toml_str("").unwrap();
        assert!(matches!(options.source, SourceKind::Github));
    }

    #[test]
    fn unknown_source_is_rejected() {
        let err = MkcertOptions::from_toml_str(r#"source = "gitee""#).unwrap_err();
        assert!(matches!(err, MkcertError::Config(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = MkcertOptions::from_toml_str("autoUpgrade = true").unwrap_err();
        assert!(matches!(err, MkcertError::Config(_)));
    }
}
