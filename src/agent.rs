//! The addon agent: decides whether a cluster gets OLM and renders the manifests for it.

use tracing::{debug, error, info};

use crate::{
    assets::{bundle_path, AssetStore, BUNDLE_FILES},
    cluster::ClusterDescriptor,
    error::{Error, Result},
    inject::inject,
    resource::{Registry, RenderedResource},
    template::TemplateRenderer,
    values::{AddonConfiguration, ConfigSource, LookupError},
    version::KubeVersion,
};

pub const ADDON_NAME: &str = "olm-addon";

/// Deployment whose availability reports the health of the addon.
pub const HEALTH_PROBE_NAMESPACE: &str = "olm";
pub const HEALTH_PROBE_DEPLOYMENT: &str = "olm-operator";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

/// How the addon registers with the addon manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub addon_name: String,
    pub health_probe: ProbeTarget,
    pub supported_configs: Vec<ConfigResource>,
}

/// Renders the OLM bundle for managed clusters.
///
/// The agent keeps no state between renders, one agent can serve any number
/// of clusters, concurrently if its asset store and config source allow it.
pub struct OlmAgent<A, C> {
    addon_name: String,
    assets: A,
    config: C,
    renderer: TemplateRenderer,
    registry: Registry,
}

impl<A: AssetStore, C: ConfigSource> OlmAgent<A, C> {
    pub fn new(addon_name: impl Into<String>, assets: A, config: C) -> Self {
        Self {
            addon_name: addon_name.into(),
            assets,
            config,
            renderer: TemplateRenderer::new(),
            registry: Registry::default(),
        }
    }

    /// Replace the kinds manifests may declare.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn addon_name(&self) -> &str {
        &self.addon_name
    }

    pub fn options(&self) -> AgentOptions {
        AgentOptions {
            addon_name: self.addon_name.clone(),
            health_probe: ProbeTarget {
                namespace: HEALTH_PROBE_NAMESPACE.to_string(),
                name: HEALTH_PROBE_DEPLOYMENT.to_string(),
            },
            supported_configs: vec![ConfigResource {
                group: "addon.open-cluster-management.io".to_string(),
                version: "v1alpha1".to_string(),
                resource: "addondeploymentconfigs".to_string(),
            }],
        }
    }

    /// Objects to deploy on `cluster`, in apply order.
    ///
    /// An ineligible or unconfigured cluster gets nothing. Any failure while
    /// rendering discards the whole list.
    pub fn manifests(&self, cluster: &ClusterDescriptor) -> Result<Vec<RenderedResource>> {
        let name = cluster.name.as_str();
        if !cluster.is_eligible() {
            info!(
                addon = %self.addon_name,
                cluster = name,
                "Cluster may be OpenShift, not deploying the olm addon. \
                 Label the cluster with a \"vendor\" value different from \"OpenShift\" otherwise."
            );
            return Ok(Vec::new());
        }

        // pick a different set of manifests according to the version
        let version = KubeVersion::resolve(name, &cluster.kubernetes_version);
        info!(cluster = name, %version, "cluster version");

        let values = match self.config.values_for(cluster) {
            Ok(values) => values,
            Err(LookupError::NotFound(_)) => {
                debug!(cluster = name, "no AddOnDeploymentConfig, not deploying");
                return Ok(Vec::new());
            }
            Err(e) => {
                error!(
                    cluster = name,
                    error = %e,
                    "not able to retrieve the AddOnDeploymentConfig, not deploying"
                );
                return Ok(Vec::new());
            }
        };
        let config = AddonConfiguration::try_from(&values).map_err(|source| Error::Config {
            cluster: name.to_string(),
            source,
        })?;
        debug!(cluster = name, ?config, "configuration");

        // keep the ordering of the file list and of the documents in each file
        let mut objects = Vec::new();
        for file in BUNDLE_FILES {
            let path = bundle_path(version, file);
            objects.extend(self.load_file(name, &path, &config)?);
        }
        Ok(objects)
    }

    fn load_file(
        &self,
        cluster: &str,
        path: &str,
        config: &AddonConfiguration,
    ) -> Result<Vec<RenderedResource>> {
        let raw = self.assets.read(path).map_err(|source| Error::Asset {
            cluster: cluster.to_string(),
            source,
        })?;
        let documents = self
            .renderer
            .render(&raw, config)
            .map_err(|source| Error::Template {
                cluster: cluster.to_string(),
                path: path.to_string(),
                source,
            })?;
        debug!(cluster, path, documents = documents.len(), "rendered");

        let mut objects = Vec::with_capacity(documents.len());
        for (document, text) in documents.iter().enumerate() {
            let mut object = self
                .registry
                .decode(text)
                .map_err(|source| Error::Decode {
                    cluster: cluster.to_string(),
                    path: path.to_string(),
                    document,
                    source,
                })?;
            inject(&mut object, config);
            objects.push(object);
        }
        Ok(objects)
    }
}
