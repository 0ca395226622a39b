use std::path::{Path, PathBuf};

use k8s_openapi::api::core::v1::PodSpec;
use olm_addon::{
    agent::{OlmAgent, ADDON_NAME},
    assets::{AssetError, DirAssetStore},
    cluster::ClusterDescriptor,
    resource::{Registry, RenderedResource},
    values::FileConfigSource,
    Error,
};

const CONFIG: &str = r#"
apiVersion: addon.open-cluster-management.io/v1alpha1
kind: AddOnDeploymentConfig
metadata:
  name: olm-config
  namespace: spoke1
spec:
  customizedVariables:
  - name: OLMImage
    value: registry.example.com/olm:v0.24.0-patched
  - name: CleanupImage
    value: bitnami/kubectl:1.25
  nodePlacement:
    nodeSelector:
      node-role.kubernetes.io/infra: ""
    tolerations:
    - key: node-role.kubernetes.io/infra
      operator: Exists
      effect: NoSchedule
"#;

fn assets() -> DirAssetStore {
    DirAssetStore::new(env!("CARGO_MANIFEST_DIR"))
}

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.yaml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

fn kinds(objects: &[RenderedResource]) -> Vec<&str> {
    objects.iter().map(RenderedResource::kind).collect()
}

fn workload_pods(objects: &[RenderedResource]) -> Vec<&PodSpec> {
    let mut pods = Vec::new();
    for object in objects {
        match object {
            RenderedResource::Deployment(d) => {
                pods.push(d.spec.as_ref().unwrap().template.spec.as_ref().unwrap())
            }
            RenderedResource::ClusterServiceVersion(csv) => {
                let install = csv.spec.install.as_ref().unwrap();
                for deployment in &install.spec.as_ref().unwrap().deployment_specs {
                    pods.push(deployment.spec.template.spec.as_ref().unwrap());
                }
            }
            RenderedResource::Other(_) => {}
        }
    }
    pods
}

#[test]
fn unparsable_version_renders_default_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let agent = OlmAgent::new(
        ADDON_NAME,
        assets(),
        FileConfigSource::new(Some(write_config(dir.path()))),
    );
    let cluster = ClusterDescriptor::new("spoke1").with_version("not-a-version");
    let objects = agent.manifests(&cluster).unwrap();

    assert_eq!(
        kinds(&objects),
        [
            // crds.yaml
            "CustomResourceDefinition",
            "CustomResourceDefinition",
            "CustomResourceDefinition",
            "CustomResourceDefinition",
            // permissions.yaml
            "Namespace",
            "Namespace",
            "ServiceAccount",
            "ClusterRole",
            "ClusterRoleBinding",
            // olm.yaml
            "OperatorGroup",
            "OperatorGroup",
            "Deployment",
            "Deployment",
            "ClusterServiceVersion",
            "CatalogSource",
            // cleanup.yaml
            "Job",
            "ConfigMap",
        ]
    );
}

#[test]
fn configuration_is_applied_to_every_workload() {
    let dir = tempfile::tempdir().unwrap();
    let agent = OlmAgent::new(
        ADDON_NAME,
        assets(),
        FileConfigSource::new(Some(write_config(dir.path()))),
    );
    let cluster = ClusterDescriptor::new("spoke1").with_version("v1.25.8");
    let objects = agent.manifests(&cluster).unwrap();

    let pods = workload_pods(&objects);
    assert_eq!(pods.len(), 3);
    for pod in pods {
        assert_eq!(
            pod.node_selector,
            Some([("node-role.kubernetes.io/infra".to_string(), String::new())].into())
        );
        let tolerations = pod.tolerations.as_ref().unwrap();
        assert_eq!(tolerations.len(), 1);
        assert_eq!(tolerations[0].effect.as_deref(), Some("NoSchedule"));
        for container in &pod.containers {
            assert_eq!(
                container.image.as_deref(),
                Some("registry.example.com/olm:v0.24.0-patched")
            );
        }
    }

    // template substitution happens before decoding
    let catalog = objects
        .iter()
        .find(|o| o.name() == Some("catalog-operator"))
        .unwrap()
        .to_yaml()
        .unwrap();
    assert!(catalog.contains("- registry.example.com/olm:v0.24.0-patched"));
}

#[test]
fn rendered_objects_decode_again() {
    let dir = tempfile::tempdir().unwrap();
    let agent = OlmAgent::new(
        ADDON_NAME,
        assets(),
        FileConfigSource::new(Some(write_config(dir.path()))),
    );
    let cluster = ClusterDescriptor::new("spoke1").with_version("v1.25.0");
    let registry = Registry::default();
    for object in agent.manifests(&cluster).unwrap() {
        let yaml = object.to_yaml().unwrap();
        let again = registry.decode(&yaml).unwrap();
        assert_eq!(again.kind(), object.kind());
        assert_eq!(again.name(), object.name());
    }
}

#[test]
fn guarded_cleanup_job_needs_its_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "apiVersion: addon.open-cluster-management.io/v1alpha1\nkind: AddOnDeploymentConfig\nmetadata:\n  name: c\n  namespace: spoke1\nspec: {}\n",
    )
    .unwrap();
    let agent = OlmAgent::new(ADDON_NAME, assets(), FileConfigSource::new(Some(path)));
    let objects = agent
        .manifests(&ClusterDescriptor::new("spoke1").with_version("v1.25.0"))
        .unwrap();
    assert_eq!(objects.len(), 16);
    assert!(!kinds(&objects).contains(&"Job"));
    // nothing configured, the manifests keep their own values
    for pod in workload_pods(&objects) {
        assert_eq!(
            pod.node_selector,
            Some([("kubernetes.io/os".to_string(), "linux".to_string())].into())
        );
        assert!(pod.tolerations.is_none());
    }
}

#[test]
fn openshift_cluster_renders_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let agent = OlmAgent::new(
        ADDON_NAME,
        assets(),
        FileConfigSource::new(Some(write_config(dir.path()))),
    );
    let cluster = ClusterDescriptor::new("ocp")
        .with_label("vendor", "OpenShift")
        .with_version("v1.25.0");
    assert!(agent.manifests(&cluster).unwrap().is_empty());
}

#[test]
fn missing_config_renders_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let agent = OlmAgent::new(
        ADDON_NAME,
        assets(),
        FileConfigSource::new(Some(dir.path().join("absent.yaml"))),
    );
    let cluster = ClusterDescriptor::new("spoke1").with_version("v1.25.0");
    assert!(agent.manifests(&cluster).unwrap().is_empty());
}

#[test]
fn version_without_bundle_fails() {
    let dir = tempfile::tempdir().unwrap();
    let agent = OlmAgent::new(
        ADDON_NAME,
        assets(),
        FileConfigSource::new(Some(write_config(dir.path()))),
    );
    let cluster = ClusterDescriptor::new("spoke1").with_version("v1.99.0");
    match agent.manifests(&cluster) {
        Err(Error::Asset {
            cluster,
            source: AssetError::NotFound(path),
        }) => {
            assert_eq!(cluster, "spoke1");
            assert_eq!(path, "manifests/v1.99/crds.yaml");
        }
        other => panic!("expected a missing asset, got {other:?}"),
    }
}
