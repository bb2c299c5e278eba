//! The LeaderWorkerSet controller manager Deployment.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;

use crate::controller::error::{Error, Result};
use crate::crd::{LeaderWorkerSetOperator, LogLevel};
use crate::manifests;

use super::common::{Target, spec_annotations};

/// Placeholder image in the Deployment template.
pub const CONTROLLER_IMAGE_PLACEHOLDER: &str = "${CONTROLLER_IMAGE}";

/// Node selector restricting the controller manager to worker nodes.
pub const WORKER_NODE_LABEL: &str = "node-role.kubernetes.io/worker";

/// Arguments for the controller manager container at the given operand log level.
pub fn controller_args(level: Option<LogLevel>) -> Vec<String> {
    vec![
        "--config=/controller_manager_config.yaml".to_string(),
        format!("--zap-log-level={}", LogLevel::zap_level(level)),
    ]
}

/// Build the required controller manager Deployment.
///
/// `image` replaces the `${CONTROLLER_IMAGE}` placeholder when set; with no
/// target image the placeholder is left as-is.
pub fn deployment(
    target: &Target,
    operator: &LeaderWorkerSetOperator,
    image: Option<&str>,
) -> Result<Deployment> {
    let mut required: Deployment = manifests::read(manifests::DEPLOYMENT)?;
    target.own_namespaced(&mut required.metadata);

    let pod_template = &mut required
        .spec
        .as_mut()
        .ok_or_else(|| Error::MissingField("deployment spec".to_string()))?
        .template;
    let pod_spec = pod_template
        .spec
        .as_mut()
        .ok_or_else(|| Error::MissingField("deployment pod spec".to_string()))?;

    if let Some(image) = image.filter(|i| !i.is_empty()) {
        for container in pod_spec.containers.iter_mut() {
            if container.image.as_deref() == Some(CONTROLLER_IMAGE_PLACEHOLDER) {
                container.image = Some(image.to_string());
            }
        }
    }

    pod_spec.node_selector = Some(BTreeMap::from([(
        WORKER_NODE_LABEL.to_string(),
        String::new(),
    )]));

    let manager = pod_spec
        .containers
        .first_mut()
        .ok_or_else(|| Error::MissingField("deployment containers".to_string()))?;
    manager.args = Some(controller_args(operator.spec.log_level));

    pod_template
        .metadata
        .get_or_insert_with(Default::default)
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .extend(spec_annotations(operator));

    Ok(required)
}
