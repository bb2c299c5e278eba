//! Admission webhook configurations pointing at the operand webhook Service.

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};

use crate::controller::error::Result;
use crate::manifests;

use super::common::{Target, set_inject_ca_annotation};

pub fn mutating_webhook(target: &Target) -> Result<MutatingWebhookConfiguration> {
    let mut required: MutatingWebhookConfiguration = manifests::read(manifests::MUTATING_WEBHOOK)?;
    target.own(&mut required.metadata);
    for webhook in required.webhooks.iter_mut().flatten() {
        if let Some(service) = webhook.client_config.service.as_mut() {
            service.namespace = target.namespace.clone();
        }
    }
    set_inject_ca_annotation(&mut required.metadata, target);
    Ok(required)
}

pub fn validating_webhook(target: &Target) -> Result<ValidatingWebhookConfiguration> {
    let mut required: ValidatingWebhookConfiguration =
        manifests::read(manifests::VALIDATING_WEBHOOK)?;
    target.own(&mut required.metadata);
    for webhook in required.webhooks.iter_mut().flatten() {
        if let Some(service) = webhook.client_config.service.as_mut() {
            service.namespace = target.namespace.clone();
        }
    }
    set_inject_ca_annotation(&mut required.metadata, target);
    Ok(required)
}
