use std::{fmt::Debug, fmt::Formatter, path::PathBuf, str::FromStr};

use clap::Parser;

use crate::agent::ADDON_NAME;

/// Render the OLM addon manifests for one managed cluster and print them as a YAML stream.
#[derive(Parser, Debug, Clone)]
#[clap(version)]
pub struct Opts {
    /// Directory holding the `manifests/v{major}.{minor}/` bundles.
    #[clap(short, long, env = "OLM_ADDON_ASSETS", default_value = ".")]
    pub assets: PathBuf,

    /// Path to the ManagedCluster document of the target cluster.
    #[clap(short, long, env = "OLM_ADDON_CLUSTER")]
    pub cluster: PathBuf,

    /// Path to the AddOnDeploymentConfig attached to the cluster.
    /// Nothing is rendered for a cluster without one.
    #[clap(long, env = "OLM_ADDON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Name the addon registers under.
    #[clap(long, env = "OLM_ADDON_NAME", default_value = ADDON_NAME)]
    pub addon_name: AddonName,
}

/// Valid addon names:
///   must not be empty
///   contain at most 63 characters
///   contain only lowercase alphanumeric characters or '-'
///   start with an alphanumeric character
///   end with an alphanumeric character
#[derive(Clone, PartialEq, Eq)]
pub struct AddonName(String);

impl AddonName {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn is_alphanumeric(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

impl FromStr for AddonName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        anyhow::ensure!(!s.is_empty(), "addon name cannot be an empty string");
        anyhow::ensure!(s.len() <= 63, "addon name must be <= 63 characters");
        anyhow::ensure!(
            s.chars().all(|c| is_alphanumeric(c) || c == '-'),
            "addon name must contain only lowercase alphanumeric characters or '-'"
        );
        anyhow::ensure!(
            s.starts_with(is_alphanumeric),
            "addon name must start with an alphanumeric character"
        );
        anyhow::ensure!(
            s.ends_with(is_alphanumeric),
            "addon name must end with an alphanumeric character"
        );
        Ok(Self(s.to_string()))
    }
}

impl Debug for AddonName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
