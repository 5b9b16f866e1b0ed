//! Making sure a usable mkcert binary is on disk.
//!
//! Source and version problems degrade to "keep using what is installed";
//! only a failed download is an error.

use std::path::{Path, PathBuf};

use crate::config::MkcertOptions;
use crate::download::Downloader;
use crate::error::Result;
use crate::source::{SourceInfo, SourceProvider};
use crate::state::StateFile;
use crate::version::{UpgradeDecision, VersionManager};

/// What provisioning did, including the non-fatal skips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A binary is present and no upgrade check was requested.
    Ready,
    /// No binary was present; one was downloaded.
    Installed { version: String },
    /// The managed binary was replaced with a newer minor/patch release.
    Upgraded { from: Option<String>, to: String },
    /// The installed binary is already the latest release.
    UpToDate { latest: String },
    /// A newer major release exists but was not applied.
    BreakingUpgradeDeferred {
        current: Option<String>,
        latest: String,
    },
    /// The release source returned nothing; provisioning was skipped.
    SourceUnavailable,
    /// The caller-supplied mkcert path does not exist.
    LocalBinaryMissing { path: PathBuf },
}

/// Result of [`BinaryProvisioner::ensure_present`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    /// Binary to invoke, if any is available.
    pub binary: Option<PathBuf>,
    pub outcome: ProvisionOutcome,
}

pub struct BinaryProvisioner<'a> {
    options: &'a MkcertOptions,
    source: &'a dyn SourceProvider,
    downloader: &'a dyn Downloader,
}

impl<'a> BinaryProvisioner<'a> {
    pub fn new(
        options: &'a MkcertOptions,
        source: &'a dyn SourceProvider,
        downloader: &'a dyn Downloader,
    ) -> Self {
        Self {
            options,
            source,
            downloader,
        }
    }

    /// The binary that would be invoked right now, without provisioning.
    ///
    /// A caller-supplied path wins unconditionally, even when a managed
    /// binary also exists.
    pub fn resolve_binary(&self) -> Option<PathBuf> {
        match &self.options.mkcert_path {
            Some(local) => local.exists().then(|| local.clone()),
            None => {
                let managed = self.options.managed_binary_path();
                managed.exists().then_some(managed)
            }
        }
    }

    pub fn ensure_present(&self, state: &mut StateFile) -> Result<Provisioned> {
        if let Some(local) = &self.options.mkcert_path {
            return Ok(self.check_local(local));
        }

        let managed = self.options.managed_binary_path();
        let exists = managed.exists();
        if exists && !self.options.auto_upgrade {
            tracing::debug!(path = %managed.display(), "Using installed mkcert");
            return Ok(Provisioned {
                binary: Some(managed),
                outcome: ProvisionOutcome::Ready,
            });
        }

        let outcome = self.update(state, &managed, exists)?;
        Ok(Provisioned {
            binary: managed.exists().then_some(managed),
            outcome,
        })
    }

    fn check_local(&self, local: &Path) -> Provisioned {
        if !local.exists() {
            tracing::error!(
                path = %local.display(),
                "mkcert binary does not exist, check the configured mkcert path"
            );
            return Provisioned {
                binary: None,
                outcome: ProvisionOutcome::LocalBinaryMissing {
                    path: local.to_path_buf(),
                },
            };
        }

        if self.options.auto_upgrade {
            tracing::debug!(
                path = %local.display(),
                "Auto-upgrade does not apply to a caller-supplied mkcert"
            );
        }
        Provisioned {
            binary: Some(local.to_path_buf()),
            outcome: ProvisionOutcome::Ready,
        }
    }

    fn update(
        &self,
        state: &mut StateFile,
        managed: &Path,
        exists: bool,
    ) -> Result<ProvisionOutcome> {
        let Some(info) = self.fetch_source_info() else {
            tracing::warn!("Could not obtain mkcert download information, update skipped");
            return Ok(ProvisionOutcome::SourceUnavailable);
        };

        let mut versions = VersionManager::new(state);

        if !exists {
            self.downloader.download(&info.download_url, managed)?;
            versions.update(&info.version)?;
            tracing::info!(version = %info.version, path = %managed.display(), "mkcert installed");
            return Ok(ProvisionOutcome::Installed {
                version: info.version,
            });
        }

        let compared = versions.compare(&info.version);
        match compared.decision() {
            UpgradeDecision::Unnecessary => {
                tracing::debug!(
                    current = compared.current_version.as_deref().unwrap_or("unknown"),
                    latest = %info.version,
                    "mkcert is up to date"
                );
                Ok(ProvisionOutcome::UpToDate {
                    latest: info.version,
                })
            }
            UpgradeDecision::Breaking => {
                tracing::warn!(
                    current = compared.current_version.as_deref().unwrap_or("unknown"),
                    latest = %info.version,
                    "mkcert has a breaking change, update skipped"
                );
                Ok(ProvisionOutcome::BreakingUpgradeDeferred {
                    current: compared.current_version,
                    latest: info.version,
                })
            }
            UpgradeDecision::Safe => {
                self.downloader.download(&info.download_url, managed)?;
                versions.update(&info.version)?;
                tracing::info!(
                    from = compared.current_version.as_deref().unwrap_or("unknown"),
                    to = %info.version,
                    "mkcert upgraded"
                );
                Ok(ProvisionOutcome::Upgraded {
                    from: compared.current_version,
                    to: info.version,
                })
            }
        }
    }

    fn fetch_source_info(&self) -> Option<SourceInfo> {
        match self.source.fetch_latest() {
            Ok(Some(info)) => {
                tracing::debug!(
                    version = %info.version,
                    url = %info.download_url,
                    "Latest mkcert release"
                );
                Some(info)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "mkcert release source unavailable");
                None
            }
        }
    }
}
