//! Typed resources decoded from rendered manifests.

use std::collections::{BTreeMap, HashMap};

use k8s_openapi::{
    api::{
        admissionregistration::v1::{MutatingWebhookConfiguration, ValidatingWebhookConfiguration},
        apps::v1::{DaemonSet, Deployment, DeploymentSpec, ReplicaSet, StatefulSet},
        batch::v1::{CronJob, Job},
        core::v1::{
            ConfigMap, LimitRange, Namespace, PersistentVolumeClaim, ResourceQuota, Secret,
            Service, ServiceAccount,
        },
        networking::v1::NetworkPolicy,
        policy::v1::PodDisruptionBudget,
        rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
        scheduling::v1::PriorityClass,
    },
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
    kube_aggregator::pkg::apis::apiregistration::v1::APIService,
};
use kube::{core::DynamicObject, CustomResource};
use serde::{de::DeserializeOwned, Deserialize, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("document is not valid yaml: {0}")]
    Yaml(#[source] serde_yaml::Error),
    #[error("document does not declare both apiVersion and kind")]
    MissingType,
    #[error("no known resource kind {kind} in {api_version}")]
    UnknownKind { api_version: String, kind: String },
    #[error("{kind} does not match its schema: {source}")]
    Schema {
        kind: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Operator metadata and install strategy, as shipped by OLM.
/// Only the install strategy is typed, every other field is carried through untouched.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "ClusterServiceVersion",
    namespaced,
    schema = "disabled"
)]
pub struct ClusterServiceVersionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<NamedInstallStrategy>,
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NamedInstallStrategy {
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<StrategyDetailsDeployment>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrategyDetailsDeployment {
    #[serde(default, rename = "deployments")]
    pub deployment_specs: Vec<StrategyDeploymentSpec>,
    /// permissions, clusterPermissions
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrategyDeploymentSpec {
    pub name: String,
    pub spec: DeploymentSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<BTreeMap<String, String>>,
}

/// A decoded manifest. The variant decides which overrides apply to it.
#[derive(Debug, Clone)]
pub enum RenderedResource {
    /// Workload with a single pod template.
    Deployment(Box<Deployment>),
    /// Bundle embedding any number of deployment specs.
    ClusterServiceVersion(Box<ClusterServiceVersion>),
    /// Known kind without overrides.
    Other(Box<DynamicObject>),
}

impl RenderedResource {
    pub fn kind(&self) -> &str {
        match self {
            Self::Deployment(_) => <Deployment as k8s_openapi::Resource>::KIND,
            Self::ClusterServiceVersion(_) => "ClusterServiceVersion",
            Self::Other(obj) => obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or(""),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Deployment(d) => d.metadata.name.as_deref(),
            Self::ClusterServiceVersion(csv) => csv.metadata.name.as_deref(),
            Self::Other(obj) => obj.metadata.name.as_deref(),
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

impl Serialize for RenderedResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Deployment(d) => d.serialize(serializer),
            Self::ClusterServiceVersion(csv) => csv.serialize(serializer),
            Self::Other(obj) => obj.serialize(serializer),
        }
    }
}

type Decoder = fn(serde_yaml::Value) -> Result<RenderedResource, serde_yaml::Error>;

/// Resource kinds a manifest may declare, keyed by apiVersion and kind.
#[derive(Clone)]
pub struct Registry {
    kinds: HashMap<(String, String), Decoder>,
}

impl Registry {
    /// A registry that knows no kinds.
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Accept a kind without checking its shape beyond object metadata.
    pub fn register_dynamic(&mut self, api_version: &str, kind: &str) {
        self.insert(api_version, kind, decode_dynamic);
    }

    /// Accept an upstream kind, checked against its schema.
    pub fn register_checked<K>(&mut self)
    where
        K: k8s_openapi::Resource + DeserializeOwned,
    {
        self.insert(K::API_VERSION, K::KIND, decode_checked::<K>);
    }

    pub fn contains(&self, api_version: &str, kind: &str) -> bool {
        self.kinds
            .contains_key(&(api_version.to_string(), kind.to_string()))
    }

    fn insert(&mut self, api_version: &str, kind: &str, decoder: Decoder) {
        self.kinds
            .insert((api_version.to_string(), kind.to_string()), decoder);
    }

    /// Decodes one rendered document.
    /// The document must declare its apiVersion and kind, and they must be registered.
    pub fn decode(&self, document: &str) -> Result<RenderedResource, DecodeError> {
        let value: serde_yaml::Value = serde_yaml::from_str(document).map_err(DecodeError::Yaml)?;
        let field = |name: &str| value.get(name).and_then(serde_yaml::Value::as_str);
        let (api_version, kind) = match (field("apiVersion"), field("kind")) {
            (Some(api_version), Some(kind)) => (api_version.to_string(), kind.to_string()),
            _ => return Err(DecodeError::MissingType),
        };
        let decoder = self
            .kinds
            .get(&(api_version.clone(), kind.clone()))
            .ok_or_else(|| DecodeError::UnknownKind {
                api_version,
                kind: kind.clone(),
            })?;
        decoder(value).map_err(|source| DecodeError::Schema { kind, source })
    }
}

impl Default for Registry {
    /// The kinds found in OLM bundles.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.insert(
            <Deployment as k8s_openapi::Resource>::API_VERSION,
            <Deployment as k8s_openapi::Resource>::KIND,
            decode_deployment,
        );
        registry.insert(
            "operators.coreos.com/v1alpha1",
            "ClusterServiceVersion",
            decode_csv,
        );

        registry.register_checked::<CustomResourceDefinition>();
        registry.register_checked::<Namespace>();
        registry.register_checked::<ServiceAccount>();
        registry.register_checked::<ConfigMap>();
        registry.register_checked::<Secret>();
        registry.register_checked::<Service>();
        registry.register_checked::<ClusterRole>();
        registry.register_checked::<ClusterRoleBinding>();
        registry.register_checked::<Role>();
        registry.register_checked::<RoleBinding>();
        registry.register_checked::<Job>();
        registry.register_checked::<DaemonSet>();
        registry.register_checked::<StatefulSet>();
        registry.register_checked::<ReplicaSet>();
        registry.register_checked::<CronJob>();
        registry.register_checked::<PersistentVolumeClaim>();
        registry.register_checked::<ResourceQuota>();
        registry.register_checked::<LimitRange>();
        registry.register_checked::<NetworkPolicy>();
        registry.register_checked::<PodDisruptionBudget>();
        registry.register_checked::<PriorityClass>();
        registry.register_checked::<ValidatingWebhookConfiguration>();
        registry.register_checked::<MutatingWebhookConfiguration>();
        registry.register_checked::<APIService>();

        for (api_version, kind) in [
            ("operators.coreos.com/v1alpha1", "CatalogSource"),
            ("operators.coreos.com/v1alpha1", "InstallPlan"),
            ("operators.coreos.com/v1alpha1", "Subscription"),
            ("operators.coreos.com/v1alpha2", "OperatorGroup"),
            ("operators.coreos.com/v1", "OperatorGroup"),
            ("operators.coreos.com/v1", "OLMConfig"),
            ("operators.coreos.com/v1", "Operator"),
            ("operators.coreos.com/v1", "OperatorCondition"),
            ("operators.coreos.com/v2", "OperatorCondition"),
            ("packages.operators.coreos.com/v1", "PackageManifest"),
        ] {
            registry.register_dynamic(api_version, kind);
        }
        registry
    }
}

fn decode_deployment(value: serde_yaml::Value) -> Result<RenderedResource, serde_yaml::Error> {
    let deployment: Deployment = serde_yaml::from_value(value)?;
    Ok(RenderedResource::Deployment(Box::new(deployment)))
}

fn decode_csv(value: serde_yaml::Value) -> Result<RenderedResource, serde_yaml::Error> {
    let csv: ClusterServiceVersion = serde_yaml::from_value(value)?;
    Ok(RenderedResource::ClusterServiceVersion(Box::new(csv)))
}

fn decode_checked<K: DeserializeOwned>(
    value: serde_yaml::Value,
) -> Result<RenderedResource, serde_yaml::Error> {
    serde_yaml::from_value::<K>(value.clone())?;
    decode_dynamic(value)
}

fn decode_dynamic(value: serde_yaml::Value) -> Result<RenderedResource, serde_yaml::Error> {
    let obj: DynamicObject = serde_yaml::from_value(value)?;
    Ok(RenderedResource::Other(Box::new(obj)))
}
