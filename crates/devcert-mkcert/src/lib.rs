//! devcert mkcert — provisioning and regeneration of local dev certificates.
//!
//! Keeps an mkcert binary installed and current, and reissues the dev server's
//! key/certificate pair only when the requested hostnames change or the files
//! on disk no longer match what was last generated. The cryptography itself is
//! mkcert's job; this crate decides when to run it.

pub mod command;
pub mod config;
pub mod download;
pub mod error;
pub mod provision;
pub mod source;
pub mod state;
pub mod version;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use config::{MkcertOptions, OptionsBuilder};
pub use download::{Downloader, HttpDownloader};
pub use error::{CommandError, DownloadError, MkcertError, Result, SourceError};
pub use provision::{BinaryProvisioner, ProvisionOutcome, Provisioned};
pub use source::{SourceInfo, SourceKind, SourceProvider};
pub use state::{CertHash, CertRecord, StateFile};
pub use version::{Version, VersionInfo, VersionManager};

/// Key and certificate bytes as currently on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub key: Vec<u8>,
    pub cert: Vec<u8>,
}

/// Why a certificate is being reissued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateReason {
    /// `force` is set.
    Forced,
    /// Requested hosts differ from the recorded set (or nothing is recorded).
    HostsChanged,
    /// Files on disk no longer match the recorded fingerprints.
    Tampered,
}

/// Decide whether `hosts` needs a fresh certificate.
///
/// Checks run in order and the first hit wins. `live_hash` is only
/// evaluated when the host sets agree.
pub fn regeneration_reason(
    record: Option<&CertRecord>,
    hosts: &BTreeSet<String>,
    force: bool,
    live_hash: impl FnOnce() -> CertHash,
) -> Option<RegenerateReason> {
    if force {
        return Some(RegenerateReason::Forced);
    }
    let Some(record) = record else {
        return Some(RegenerateReason::HostsChanged);
    };
    if &record.hosts != hosts {
        return Some(RegenerateReason::HostsChanged);
    }
    if !live_hash().matches(&record.hash) {
        return Some(RegenerateReason::Tampered);
    }
    None
}

/// Trim, drop blanks and collapse duplicates. Order is irrelevant.
pub fn normalize_hosts<S: AsRef<str>>(hosts: &[S]) -> BTreeSet<String> {
    hosts
        .iter()
        .map(|h| h.as_ref().trim())
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

/// Certificate orchestrator: one per dev server start.
pub struct Mkcert {
    options: MkcertOptions,
    source: Arc<dyn SourceProvider>,
    downloader: Arc<dyn Downloader>,
    state: Option<StateFile>,
}

impl Mkcert {
    pub fn create(options: MkcertOptions) -> Self {
        let source = options.source.provider();
        Self {
            options,
            source,
            downloader: Arc::new(HttpDownloader::new()),
            state: None,
        }
    }

    /// Replace the HTTP downloader, e.g. with a proxy-aware one.
    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn options(&self) -> &MkcertOptions {
        &self.options
    }

    pub fn key_path(&self) -> PathBuf {
        self.options.key_path()
    }

    pub fn cert_path(&self) -> PathBuf {
        self.options.cert_path()
    }

    /// Loaded state, if `init` or `install` has run.
    pub fn state(&self) -> Option<&StateFile> {
        self.state.as_ref()
    }

    /// mkcert binary that would be invoked right now.
    pub fn binary(&self) -> Option<PathBuf> {
        self.provisioner().resolve_binary()
    }

    /// Prepare the save directory, load state and provision mkcert.
    pub fn init(&mut self) -> Result<ProvisionOutcome> {
        let root = &self.options.save_path;
        for dir in [
            devcert_common::paths::certs_dir(root),
            devcert_common::paths::bin_dir(root),
            devcert_common::paths::state_dir(root),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        tracing::debug!(path = %root.display(), "Save directory ready");

        self.load_state()?;
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| MkcertError::Config("state not loaded".into()))?;
        let provisioner = BinaryProvisioner::new(&self.options, &*self.source, &*self.downloader);
        let provisioned = provisioner.ensure_present(state)?;
        Ok(provisioned.outcome)
    }

    /// Make sure a certificate for `hosts` is on disk and return it.
    ///
    /// An empty host list is a query: the existing files are returned without
    /// any regeneration, and a missing certificate is an `Io(NotFound)` error.
    pub fn install<S: AsRef<str>>(&mut self, hosts: &[S]) -> Result<Certificate> {
        let hosts = normalize_hosts(hosts);
        if hosts.is_empty() {
            tracing::debug!("No hosts requested, returning existing certificate");
            return self.read_certificate();
        }

        self.load_state()?;
        let key_path = self.key_path();
        let cert_path = self.cert_path();
        let record = self.state.as_ref().and_then(StateFile::record);
        let reason = regeneration_reason(record, &hosts, self.options.force, || {
            CertHash::of_files(&key_path, &cert_path)
        });

        match reason {
            Some(reason) => {
                tracing::info!(
                    ?reason,
                    hosts = %join_hosts(&hosts),
                    "Certificate needs regeneration"
                );
                self.regenerate(hosts)?;
            }
            None => tracing::debug!(hosts = %join_hosts(&hosts), "Certificate is current"),
        }

        self.read_certificate()
    }

    /// `init` followed by `install`, as a dev server does on startup.
    ///
    /// A failed download only costs the upgrade: whatever binary is already
    /// installed is used. With no binary at all, `install` then fails with
    /// [`CommandError::Spawn`]. Returns `None` for the outcome when
    /// provisioning failed.
    pub fn start<S: AsRef<str>>(
        &mut self,
        hosts: &[S],
    ) -> Result<(Option<ProvisionOutcome>, Certificate)> {
        let outcome = match self.init() {
            Ok(outcome) => Some(outcome),
            Err(MkcertError::Download(e)) => {
                tracing::error!(
                    error = %e,
                    "mkcert download failed, continuing with the installed binary"
                );
                None
            }
            Err(e) => return Err(e),
        };
        let certificate = self.install(hosts)?;
        Ok((outcome, certificate))
    }

    /// mkcert's CA root directory.
    pub fn ca_root(&self) -> Result<PathBuf> {
        Ok(command::ca_root(self.binary().as_deref())?)
    }

    fn regenerate(&mut self, hosts: BTreeSet<String>) -> Result<()> {
        let key_path = self.key_path();
        let cert_path = self.cert_path();
        ensure_parent(&key_path)?;
        ensure_parent(&cert_path)?;

        let binary = self.binary();
        if binary.is_none() {
            tracing::error!("No mkcert binary available, certificate generation will fail");
        }
        let host_list: Vec<String> = hosts.iter().cloned().collect();
        command::generate(binary.as_deref(), &key_path, &cert_path, &host_list)?;

        let hash = CertHash::of_files(&key_path, &cert_path);
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| MkcertError::Config("state not loaded".into()))?;
        state.set_record(CertRecord::new(hosts, hash))?;

        tracing::info!(
            key = %key_path.display(),
            cert = %cert_path.display(),
            "Certificate generated"
        );
        Ok(())
    }

    fn read_certificate(&self) -> Result<Certificate> {
        Ok(Certificate {
            key: std::fs::read(self.key_path())?,
            cert: std::fs::read(self.cert_path())?,
        })
    }

    fn load_state(&mut self) -> Result<()> {
        if self.state.is_none() {
            let path = StateFile::default_path(&self.options.save_path);
            self.state = Some(StateFile::init(path)?);
        }
        Ok(())
    }

    fn provisioner(&self) -> BinaryProvisioner<'_> {
        BinaryProvisioner::new(&self.options, &*self.source, &*self.downloader)
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) => std::fs::create_dir_all(parent),
        None => Ok(()),
    }
}

fn join_hosts(hosts: &BTreeSet<String>) -> String {
    hosts.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    fn hash(key: &str, cert: &str) -> CertHash {
        CertHash {
            key: Some(key.into()),
            cert: Some(cert.into()),
        }
    }

    fn record() -> CertRecord {
        CertRecord::new(hosts(&["localhost"]), hash("abc", "def"))
    }

    #[test]
    fn matching_hosts_and_hash_need_nothing() {
        let reason = regeneration_reason(Some(&record()), &hosts(&["localhost"]), false, || {
            hash("abc", "def")
        });
        assert_eq!(reason, None);
    }

    #[test]
    fn host_change_wins_without_hashing() {
        let reason = regeneration_reason(
            Some(&record()),
            &hosts(&["localhost", "127.0.0.1"]),
            false,
            || panic!("hash must not be computed when hosts differ"),
        );
        assert_eq!(reason, Some(RegenerateReason::HostsChanged));
    }

    #[test]
    fn no_record_counts_as_host_change() {
        let reason = regeneration_reason(None, &hosts(&["localhost"]), false, CertHash::default);
        assert_eq!(reason, Some(RegenerateReason::HostsChanged));
    }

    #[test]
    fn altered_or_missing_files_are_tampered() {
        let altered = regeneration_reason(Some(&record()), &hosts(&["localhost"]), false, || {
            hash("abc", "zzz")
        });
        assert_eq!(altered, Some(RegenerateReason::Tampered));

        let missing = regeneration_reason(
            Some(&record()),
            &hosts(&["localhost"]),
            false,
            CertHash::default,
        );
        assert_eq!(missing, Some(RegenerateReason::Tampered));
    }

    #[test]
    fn force_always_regenerates() {
        let reason = regeneration_reason(Some(&record()), &hosts(&["localhost"]), true, || {
            hash("abc", "def")
        });
        assert_eq!(reason, Some(RegenerateReason::Forced));
    }

    #[test]
    fn normalize_ignores_order_blanks_and_duplicates() {
        assert_eq!(
            normalize_hosts(&["127.0.0.1", " localhost ", "", "localhost"]),
            normalize_hosts(&["localhost", "127.0.0.1"])
        );
        assert!(normalize_hosts::<&str>(&[]).is_empty());
        assert!(normalize_hosts(&["  "]).is_empty());
    }
}
