//! Error types for provisioning and certificate generation.
//!
//! Only conditions that must stop the caller are errors here. Recoverable
//! provisioning situations (source unreachable, unparsable version, deferred
//! major upgrade, missing local binary) are reported through
//! [`crate::provision::ProvisionOutcome`] instead.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("release source request failed: {0}")]
    Transport(String),

    #[error("invalid release metadata: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("download of {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("could not run mkcert `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("mkcert exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MkcertError {
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    #[error("certificate generation failed: {0}")]
    Command(#[from] CommandError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MkcertError>;
