//! Fetching the mkcert binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DownloadError;

/// TCP connection timeout for binary downloads.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read timeout between chunks of a binary download.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Puts the file behind `url` at `dest`.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Blocking HTTP downloader.
///
/// The body is streamed into `<dest>.download` and renamed into place once
/// complete, so a failed transfer never leaves a truncated binary at `dest`.
/// On Unix the result is made executable.
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .user_agent(concat!("devcert/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        tracing::info!(url, path = %dest.display(), "Downloading mkcert");

        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| DownloadError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let partial = partial_path(dest);
        let write_err = |source| DownloadError::Write {
            path: dest.to_path_buf(),
            source,
        };

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut file = std::fs::File::create(&partial).map_err(write_err)?;
        let mut body = response.into_reader();
        if let Err(e) = std::io::copy(&mut body, &mut file) {
            drop(file);
            let _ = std::fs::remove_file(&partial);
            return Err(DownloadError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            });
        }
        drop(file);

        finish(&partial, dest)?;
        tracing::debug!(path = %dest.display(), "mkcert download complete");
        Ok(())
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".download");
    PathBuf::from(name)
}

/// Move a completed download into place, discarding it on failure.
fn finish(partial: &Path, dest: &Path) -> Result<(), DownloadError> {
    install_executable(partial, dest).map_err(|source| {
        let _ = std::fs::remove_file(partial);
        DownloadError::Write {
            path: dest.to_path_buf(),
            source,
        }
    })
}

/// Mark `from` executable and move it over `to`.
pub(crate) fn install_executable(from: &Path, to: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(from, std::fs::Permissions::from_mode(0o755))?;
    }

    std::fs::rename(from, to)
}
