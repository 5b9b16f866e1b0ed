//! Release sources for the mkcert binary.
//!
//! A source answers one question: what is the latest mkcert release and where
//! can the binary for this platform be downloaded. Built-in sources are
//! selected by [`SourceKind`]; anything else can be plugged in through
//! [`SourceKind::Custom`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::SourceError;

/// TCP connection timeout for release metadata requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout for release metadata requests.
const READ_TIMEOUT: Duration = Duration::from_secs(15);

/// GitHub endpoint describing the latest mkcert release.
pub const GITHUB_LATEST_RELEASE: &str =
    "https://api.github.com/repos/FiloSottile/mkcert/releases/latest";

/// Default base URL of the coding.net generic artifact mirror.
pub const CODING_MIRROR_BASE: &str = "https://liuweigl-generic.pkg.coding.net/mkcert/generic";

/// Latest release version and download location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub version: String,
    pub download_url: String,
}

/// Anything that can name the latest mkcert release.
///
/// `Ok(None)` means the source answered but has nothing for this platform.
pub trait SourceProvider: Send + Sync {
    fn fetch_latest(&self) -> Result<Option<SourceInfo>, SourceError>;
}

/// Which release source to consult.
#[derive(Clone, Default)]
pub enum SourceKind {
    #[default]
    Github,
    Coding,
    Custom(Arc<dyn SourceProvider>),
}

impl SourceKind {
    /// Parse a configured source name (`github` or `coding`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "github" => Some(Self::Github),
            "coding" => Some(Self::Coding),
            _ => None,
        }
    }

    pub fn provider(&self) -> Arc<dyn SourceProvider> {
        match self {
            Self::Github => Arc::new(GithubSource::new()),
            Self::Coding => Arc::new(CodingSource::new()),
            Self::Custom(provider) => Arc::clone(provider),
        }
    }
}

impl fmt::Debug for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Github => write!(f, "Github"),
            Self::Coding => write!(f, "Coding"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Github => write!(f, "github"),
            Self::Coding => write!(f, "coding"),
            Self::Custom(_) => write!(f, "custom"),
        }
    }
}

// ── Platform naming ───────────────────────────────────────────────

/// mkcert's `<os>-<arch>` identifier for the given Rust target names.
pub fn platform_identifier(os: &str, arch: &str) -> Option<String> {
    let os = match os {
        "linux" => "linux",
        "macos" => "darwin",
        "windows" => "windows",
        "freebsd" => "freebsd",
        _ => return None,
    };
    let arch = match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "arm" => "arm",
        _ => return None,
    };
    Some(format!("{os}-{arch}"))
}

/// Release asset name, e.g. `mkcert-v1.4.4-linux-amd64`.
pub fn asset_name(tag: &str, os: &str, arch: &str) -> Option<String> {
    let platform = platform_identifier(os, arch)?;
    let ext = if os == "windows" { ".exe" } else { "" };
    Some(format!("mkcert-{tag}-{platform}{ext}"))
}

fn current_asset_name(tag: &str) -> Option<String> {
    asset_name(tag, std::env::consts::OS, std::env::consts::ARCH)
}

fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT)
        .timeout_read(READ_TIMEOUT)
        .user_agent(concat!("devcert/", env!("CARGO_PKG_VERSION")))
        .build()
}

fn map_error(err: ureq::Error) -> SourceError {
    match err {
        ureq::Error::Status(code, resp) => {
            SourceError::Transport(format!("HTTP {code} from {}", resp.get_url()))
        }
        ureq::Error::Transport(t) => SourceError::Transport(t.to_string()),
    }
}

// ── GitHub ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

/// Latest release from the upstream GitHub repository.
pub struct GithubSource {
    endpoint: String,
}

impl GithubSource {
    pub fn new() -> Self {
        Self::with_endpoint(GITHUB_LATEST_RELEASE)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for GithubSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceProvider for GithubSource {
    fn fetch_latest(&self) -> Result<Option<SourceInfo>, SourceError> {
        let release: GithubRelease = agent()
            .get(&self.endpoint)
            .set("Accept", "application/vnd.github+json")
            .call()
            .map_err(map_error)?
            .into_json()
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(select_github_asset(&release, current_asset_name(&release.tag_name)))
    }
}

fn select_github_asset(release: &GithubRelease, wanted: Option<String>) -> Option<SourceInfo> {
    let wanted = wanted?;
    release
        .assets
        .iter()
        .find(|asset| asset.name == wanted)
        .map(|asset| SourceInfo {
            version: release.tag_name.clone(),
            download_url: asset.browser_download_url.clone(),
        })
}

// ── coding.net mirror ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MirrorLatest {
    version: String,
}

/// Mirror of the GitHub releases hosted as a coding.net generic repository.
///
/// `<base>/latest.json` names the newest version; binaries live at
/// `<base>/<asset>?version=<version>`.
pub struct CodingSource {
    base_url: String,
}

impl CodingSource {
    pub fn new() -> Self {
        Self::with_base_url(CODING_MIRROR_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn download_url(&self, version: &str, asset: &str) -> String {
        format!("{}/{asset}?version={version}", self.base_url)
    }
}

impl Default for CodingSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceProvider for CodingSource {
    fn fetch_latest(&self) -> Result<Option<SourceInfo>, SourceError> {
        let url = format!("{}/latest.json", self.base_url);
        let latest: MirrorLatest = agent()
            .get(&url)
            .call()
            .map_err(map_error)?
            .into_json()
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let version = latest.version.trim().to_string();
        if version.is_empty() {
            return Ok(None);
        }
        Ok(current_asset_name(&version).map(|asset| SourceInfo {
            download_url: self.download_url(&version, &asset),
            version,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_identifiers_follow_mkcert_naming() {
        assert_eq!(platform_identifier("linux", "x86_64").as_deref(), Some("linux-amd64"));
        assert_eq!(platform_identifier("macos", "aarch64").as_deref(), Some("darwin-arm64"));
        assert_eq!(platform_identifier("windows", "x86_64").as_deref(), Some("windows-amd64"));
        assert_eq!(platform_identifier("linux", "arm").as_deref(), Some("linux-arm"));
        assert_eq!(platform_identifier("solaris", "x86_64"), None);
        assert_eq!(platform_identifier("linux", "riscv64"), None);
    }

    #[test]
    fn windows_asset_has_exe_suffix() {
        assert_eq!(
            asset_name("v1.4.4", "windows", "x86_64").as_deref(),
            Some("mkcert-v1.4.4-windows-amd64.exe")
        );
        assert_eq!(
            asset_name("v1.4.4", "linux", "aarch64").as_deref(),
            Some("mkcert-v1.4.4-linux-arm64")
        );
    }

    #[test]
    fn github_release_picks_matching_asset() {
        let release: GithubRelease = serde_json::from_str(
            r#"{
                "tag_name": "v1.4.4",
                "assets": [
                    {"name": "mkcert-v1.4.4-darwin-amd64", "browser_download_url": "https://example.test/darwin"},
                    {"name": "mkcert-v1.4.4-linux-amd64", "browser_download_url": "https://example.test/linux"}
                ]
            }"#,
        )
        .unwrap();

        let info = select_github_asset(&release, asset_name("v1.4.4", "linux", "x86_64")).unwrap();
        assert_eq!(info.version, "v1.4.4");
        assert_eq!(info.download_url, "https://example.test/linux");

        assert!(select_github_asset(&release, asset_name("v1.4.4", "windows", "x86_64")).is_none());
        assert!(select_github_asset(&release, None).is_none());
    }

    #[test]
    fn coding_download_url_carries_version() {
        let source = CodingSource::with_base_url("https://mirror.test/mkcert/");
        assert_eq!(
            source.download_url("v1.4.4", "mkcert-v1.4.4-linux-amd64"),
            "https://mirror.test/mkcert/mkcert-v1.4.4-linux-amd64?version=v1.4.4"
        );
    }

    #[test]
    fn source_names_parse_case_insensitively() {
        assert!(matches!(SourceKind::from_name("GitHub"), Some(SourceKind::Github)));
        assert!(matches!(SourceKind::from_name(" coding "), Some(SourceKind::Coding)));
        assert!(SourceKind::from_name("gitee").is_none());
    }

    #[test]
    fn custom_source_is_used_as_is() {
        struct Fixed;
        impl SourceProvider for Fixed {
            fn fetch_latest(&self) -> Result<Option<SourceInfo>, SourceError> {
                Ok(Some(SourceInfo {
                    version: "v9.9.9".into(),
                    download_url: "file:///mkcert".into(),
                }))
            }
        }

        let kind = SourceKind::Custom(Arc::new(Fixed));
        let info = kind.provider().fetch_latest().unwrap().unwrap();
        assert_eq!(info.version, "v9.9.9");
        assert_eq!(kind.to_string(), "custom");
    }
}
