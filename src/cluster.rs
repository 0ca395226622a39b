use std::collections::BTreeMap;

use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Label carrying the distribution of a managed cluster.
pub const VENDOR_LABEL: &str = "vendor";

/// OLM ships as part of this distribution, clusters labelled with it never get the addon.
pub const OPENSHIFT_VENDOR: &str = "OpenShift";

/// A cluster registered with the hub.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize)]
#[kube(
    group = "cluster.open-cluster-management.io",
    version = "v1",
    kind = "ManagedCluster",
    status = "ManagedClusterStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSpec {
    #[serde(default)]
    pub hub_accepts_client: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_duration_seconds: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ManagedClusterStatus {
    #[serde(default)]
    pub version: ManagedClusterVersion,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ManagedClusterVersion {
    #[serde(default)]
    pub kubernetes: String,
}

/// What the render pipeline needs to know about a target cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterDescriptor {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Version reported by the cluster, may be empty or unparsable.
    pub kubernetes_version: String,
}

impl ClusterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.kubernetes_version = version.into();
        self
    }

    /// Filters clusters according to the vendor label.
    /// A cluster without the label is eligible.
    pub fn is_eligible(&self) -> bool {
        match self.labels.get(VENDOR_LABEL) {
            None => true,
            Some(vendor) => !vendor.eq_ignore_ascii_case(OPENSHIFT_VENDOR),
        }
    }
}

impl From<&ManagedCluster> for ClusterDescriptor {
    fn from(cluster: &ManagedCluster) -> Self {
        Self {
            name: cluster.metadata.name.clone().unwrap_or_default(),
            labels: cluster.metadata.labels.clone().unwrap_or_default(),
            kubernetes_version: cluster
                .status
                .as_ref()
                .map(|s| s.version.kubernetes.clone())
                .unwrap_or_default(),
        }
    }
}
