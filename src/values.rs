//! Per-cluster overrides of the addon deployment.
//!
//! Overrides reach the addon untyped, as a [`Values`] map built from an
//! `AddOnDeploymentConfig`. [`AddonConfiguration`] is the checked form the
//! render pipeline works with.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use k8s_openapi::api::core::v1::Toleration;
use kube::CustomResource;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cluster::ClusterDescriptor;

pub const NODE_SELECTOR: &str = "NodeSelector";
pub const TOLERATIONS: &str = "Tolerations";
pub const OLM_IMAGE: &str = "OLMImage";

/// Untyped configuration values keyed by option name.
pub type Values = serde_json::Map<String, Value>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration value {key} must be {expected}: {source}")]
    Shape {
        key: &'static str,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("no AddOnDeploymentConfig for cluster {0}")]
    NotFound(String),
    #[error("configuration unavailable: {0:#}")]
    Unavailable(#[from] anyhow::Error),
}

/// Overrides applied to the rendered workloads. An absent option leaves the manifests as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddonConfiguration {
    #[serde(rename = "NodeSelector", skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,
    #[serde(rename = "Tolerations", skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
    #[serde(rename = "OLMImage", skip_serializing_if = "Option::is_none")]
    pub olm_image: Option<String>,
    /// Any other value, only visible to templates.
    #[serde(flatten)]
    pub variables: BTreeMap<String, Value>,
}

impl AddonConfiguration {
    pub fn with_node_selector<K, V>(mut self, selector: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.node_selector = Some(
            selector
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_tolerations(mut self, tolerations: Vec<Toleration>) -> Self {
        self.tolerations = Some(tolerations);
        self
    }

    pub fn with_olm_image(mut self, image: impl Into<String>) -> Self {
        self.olm_image = Some(image.into());
        self
    }

    /// Whether any workload override is set.
    pub fn has_overrides(&self) -> bool {
        self.node_selector.is_some() || self.tolerations.is_some() || self.olm_image.is_some()
    }

    /// Values handed to the template engine.
    pub fn template_context(&self) -> minijinja::Value {
        minijinja::Value::from_serialize(self)
    }
}

impl TryFrom<&Values> for AddonConfiguration {
    type Error = ConfigError;

    fn try_from(values: &Values) -> Result<Self, ConfigError> {
        let mut config = AddonConfiguration::default();
        for (key, value) in values {
            match key.as_str() {
                NODE_SELECTOR => {
                    config.node_selector =
                        Some(checked(NODE_SELECTOR, "a map of strings", value)?)
                }
                TOLERATIONS => {
                    config.tolerations =
                        Some(checked(TOLERATIONS, "a list of tolerations", value)?)
                }
                OLM_IMAGE => config.olm_image = Some(checked(OLM_IMAGE, "a string", value)?),
                _ => {
                    config.variables.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(config)
    }
}

fn checked<T: DeserializeOwned>(
    key: &'static str,
    expected: &'static str,
    value: &Value,
) -> Result<T, ConfigError> {
    T::deserialize(value).map_err(|source| ConfigError::Shape {
        key,
        expected,
        source,
    })
}

/// Configuration attached to a managed cluster addon.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize)]
#[kube(
    group = "addon.open-cluster-management.io",
    version = "v1alpha1",
    kind = "AddOnDeploymentConfig",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct AddOnDeploymentConfigSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customized_variables: Vec<CustomizedVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_placement: Option<NodePlacement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomizedVariable {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePlacement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
}

impl AddOnDeploymentConfig {
    /// Customized variables become string values under their own name.
    /// A node placement sets both the node selector and the tolerations,
    /// an unset member becomes empty and clears the field it overrides.
    pub fn to_values(&self) -> Values {
        let mut values = Values::new();
        for variable in &self.spec.customized_variables {
            values.insert(variable.name.clone(), Value::String(variable.value.clone()));
        }
        if let Some(placement) = &self.spec.node_placement {
            let selector = placement.node_selector.clone().unwrap_or_default();
            let tolerations = placement.tolerations.clone().unwrap_or_default();
            values.insert(NODE_SELECTOR.to_string(), serde_json::json!(selector));
            values.insert(TOLERATIONS.to_string(), serde_json::json!(tolerations));
        }
        values
    }
}

/// Where the per-cluster configuration comes from.
pub trait ConfigSource {
    fn values_for(&self, cluster: &ClusterDescriptor) -> Result<Values, LookupError>;
}

impl<F> ConfigSource for F
where
    F: Fn(&ClusterDescriptor) -> Result<Values, LookupError>,
{
    fn values_for(&self, cluster: &ClusterDescriptor) -> Result<Values, LookupError> {
        self(cluster)
    }
}

/// Reads an `AddOnDeploymentConfig` document from disk on every lookup.
/// Without a path every cluster is reported as unconfigured.
#[derive(Debug, Clone, Default)]
pub struct FileConfigSource {
    path: Option<PathBuf>,
}

impl FileConfigSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn load(path: &Path) -> anyhow::Result<AddOnDeploymentConfig> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.to_string_lossy()))?;
        let config = serde_yaml::from_str(&raw).with_context(|| {
            format!(
                "{} is not an AddOnDeploymentConfig",
                path.to_string_lossy()
            )
        })?;
        Ok(config)
    }
}

impl ConfigSource for FileConfigSource {
    fn values_for(&self, cluster: &ClusterDescriptor) -> Result<Values, LookupError> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| LookupError::NotFound(cluster.name.clone()))?;
        if !path.exists() {
            return Err(LookupError::NotFound(cluster.name.clone()));
        }
        Ok(Self::load(path)?.to_values())
    }
}
