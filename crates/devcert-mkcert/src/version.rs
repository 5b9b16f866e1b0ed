//! mkcert release version tracking.
//!
//! Major bumps are assumed to change mkcert's command-line contract, so they
//! are reported but never applied automatically.

use std::fmt;

use crate::state::StateFile;

/// A `major.minor.patch` release number.
///
/// Field order matters: the derived `Ord` compares major, then minor, then
/// patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a free-form release tag such as `v1.4.4`, `1.4` or `1.5.0-rc1`.
    ///
    /// Pre-release and build suffixes are ignored. Missing minor or patch
    /// components default to zero. Returns `None` for anything else.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let core = trimmed
            .split(|c| c == '-' || c == '+')
            .next()
            .unwrap_or_default();
        if core.is_empty() {
            return None;
        }

        let mut parts = [0u64; 3];
        let mut count = 0;
        for component in core.split('.') {
            if count == parts.len() || component.is_empty() {
                return None;
            }
            if !component.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            parts[count] = component.parse().ok()?;
            count += 1;
        }

        Some(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Result of comparing the installed mkcert against the latest release.
///
/// Computed on every provisioning check and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub current_version: Option<String>,
    pub next_version: String,
    pub should_update: bool,
    pub breaking_change: bool,
}

/// How a [`VersionInfo`] should be acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeDecision {
    /// Latest is not newer (or could not be parsed).
    Unnecessary,
    /// Same major version; replace the binary.
    Safe,
    /// Major version changed; leave the installed binary alone.
    Breaking,
}

impl VersionInfo {
    pub fn decision(&self) -> UpgradeDecision {
        match (self.should_update, self.breaking_change) {
            (false, _) => UpgradeDecision::Unnecessary,
            (true, true) => UpgradeDecision::Breaking,
            (true, false) => UpgradeDecision::Safe,
        }
    }
}

/// Compare an installed version string against the latest release tag.
///
/// - unparsable `latest`: never an update
/// - absent or unparsable `current`: always an update, never breaking
/// - otherwise: update when `latest > current`, breaking when the majors differ
pub fn compare_versions(current: Option<&str>, latest: &str) -> VersionInfo {
    let mut info = VersionInfo {
        current_version: current.map(str::to_string),
        next_version: latest.to_string(),
        should_update: false,
        breaking_change: false,
    };

    let Some(next) = Version::parse(latest) else {
        tracing::debug!(latest, "Unparsable release version, treating as no update");
        return info;
    };

    match current.and_then(Version::parse) {
        None => info.should_update = true,
        Some(installed) => {
            info.should_update = next > installed;
            info.breaking_change = info.should_update && next.major != installed.major;
        }
    }

    info
}

/// Reads and records the installed mkcert version in the state file.
pub struct VersionManager<'a> {
    state: &'a mut StateFile,
}

impl<'a> VersionManager<'a> {
    pub fn new(state: &'a mut StateFile) -> Self {
        Self { state }
    }

    /// Version of the managed binary as last recorded, if any.
    pub fn current(&self) -> Option<&str> {
        self.state.version()
    }

    pub fn compare(&self, latest: &str) -> VersionInfo {
        compare_versions(self.current(), latest)
    }

    /// Record `version` as installed. Call only after the binary was replaced.
    pub fn update(&mut self, version: &str) -> std::io::Result<()> {
        self.state.set_version(version)
    }
}
