use k8s_openapi::api::core::v1::PodTemplateSpec;

use crate::{resource::RenderedResource, values::AddonConfiguration};

/// Replaces node selector, tolerations and images of the pod templates in `resource`
/// with what has been configured. Fields are replaced, never merged, so applying
/// the same configuration twice changes nothing.
pub fn inject(resource: &mut RenderedResource, config: &AddonConfiguration) {
    if !config.has_overrides() {
        return;
    }
    match resource {
        RenderedResource::Deployment(deployment) => {
            if let Some(spec) = deployment.spec.as_mut() {
                apply(&mut spec.template, config);
            }
        }
        RenderedResource::ClusterServiceVersion(csv) => {
            let deployments = csv
                .spec
                .install
                .iter_mut()
                .filter_map(|install| install.spec.as_mut())
                .flat_map(|details| details.deployment_specs.iter_mut());
            for deployment in deployments {
                apply(&mut deployment.spec.template, config);
            }
        }
        RenderedResource::Other(_) => {}
    }
}

fn apply(template: &mut PodTemplateSpec, config: &AddonConfiguration) {
    let pod = template.spec.get_or_insert_with(Default::default);
    if let Some(node_selector) = &config.node_selector {
        pod.node_selector = Some(node_selector.clone());
    }
    if let Some(tolerations) = &config.tolerations {
        pod.tolerations = Some(tolerations.clone());
    }
    if let Some(image) = &config.olm_image {
        for container in pod.containers.iter_mut() {
            container.image = Some(image.clone());
        }
    }
}
