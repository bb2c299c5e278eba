//! The LeaderWorkerSet CustomResourceDefinition served by the operand.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, WebhookClientConfig,
};

use crate::controller::error::Result;
use crate::manifests;

use super::common::{Target, set_inject_ca_annotation};

/// Name of the managed CRD.
pub const LEADERWORKERSET_CRD_NAME: &str = "leaderworkersets.leaderworkerset.x-k8s.io";

fn conversion_client_config(crd: &CustomResourceDefinition) -> Option<&WebhookClientConfig> {
    crd.spec
        .conversion
        .as_ref()?
        .webhook
        .as_ref()?
        .client_config
        .as_ref()
}

fn conversion_client_config_mut(
    crd: &mut CustomResourceDefinition,
) -> Option<&mut WebhookClientConfig> {
    crd.spec
        .conversion
        .as_mut()?
        .webhook
        .as_mut()?
        .client_config
        .as_mut()
}

/// Build the required CRD.
///
/// `live` is the CRD currently in the cluster, if any. Its conversion
/// `caBundle` is carried over so the apply does not fight the CA injector.
pub fn custom_resource_definition(
    target: &Target,
    live: Option<&CustomResourceDefinition>,
) -> Result<CustomResourceDefinition> {
    let mut required: CustomResourceDefinition = manifests::read(manifests::CRD)?;
    target.own(&mut required.metadata);

    if let Some(service) = conversion_client_config_mut(&mut required).and_then(|c| c.service.as_mut()) {
        service.namespace = target.namespace.clone();
    }

    set_inject_ca_annotation(&mut required.metadata, target);

    let live_ca_bundle = live
        .and_then(conversion_client_config)
        .and_then(|c| c.ca_bundle.clone());
    if let Some(config) = conversion_client_config_mut(&mut required) {
        config.ca_bundle = live_ca_bundle;
    }

    Ok(required)
}
