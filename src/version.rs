use std::fmt::{Display, Formatter};

use tracing::warn;

/// Bundle used for clusters whose version cannot be parsed.
pub const DEFAULT_VERSION: KubeVersion = KubeVersion {
    major: 1,
    minor: 25,
};

/// The part of a kubernetes version that selects a manifest bundle.
/// Patch, pre-release and build metadata are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KubeVersion {
    pub major: u64,
    pub minor: u64,
}

impl KubeVersion {
    /// Strict semantic version parse of a reported version, a leading `v` is allowed.
    pub fn parse(reported: &str) -> Result<Self, semver::Error> {
        let trimmed = reported.trim();
        let version = semver::Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))?;
        Ok(Self {
            major: version.major,
            minor: version.minor,
        })
    }

    /// Like [`KubeVersion::parse`] but substitutes [`DEFAULT_VERSION`] when parsing fails.
    pub fn resolve(cluster: &str, reported: &str) -> Self {
        match Self::parse(reported) {
            Ok(version) => version,
            Err(e) => {
                warn!(
                    cluster,
                    version = reported,
                    error = %e,
                    "not able to parse the cluster version, using default {}",
                    DEFAULT_VERSION
                );
                DEFAULT_VERSION
            }
        }
    }
}

impl Display for KubeVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}
