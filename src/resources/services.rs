//! Core objects: the controller ConfigMap, ServiceAccount and Services.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ConfigMap, Service, ServiceAccount};

use crate::controller::error::Result;
use crate::manifests;

use super::common::Target;

/// Key under which the controller manager reads its configuration.
pub const CONFIG_KEY: &str = "controller_manager_config.yaml";

/// ConfigMap carrying the controller manager configuration file.
pub fn config_map(target: &Target) -> Result<ConfigMap> {
    let config = manifests::asset(manifests::CONTROLLER_CONFIG)?;
    let mut required: ConfigMap = manifests::read(manifests::CONFIG_MAP)?;
    target.own_namespaced(&mut required.metadata);
    required.data = Some(BTreeMap::from([(CONFIG_KEY.to_string(), config.to_string())]));
    Ok(required)
}

pub fn service_account(target: &Target) -> Result<ServiceAccount> {
    let mut required: ServiceAccount = manifests::read(manifests::SERVICE_ACCOUNT)?;
    target.own_namespaced(&mut required.metadata);
    Ok(required)
}

/// Metrics Service in front of the controller manager.
pub fn service_controller(target: &Target) -> Result<Service> {
    let mut required: Service = manifests::read(manifests::SERVICE_METRICS)?;
    target.own_namespaced(&mut required.metadata);
    Ok(required)
}

/// Service the API server calls for admission and conversion webhooks.
pub fn service_webhook(target: &Target) -> Result<Service> {
    let mut required: Service = manifests::read(manifests::SERVICE_WEBHOOK)?;
    target.own_namespaced(&mut required.metadata);
    Ok(required)
}
