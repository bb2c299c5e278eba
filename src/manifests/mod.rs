//! Embedded manifest templates.
//!
//! Every object the operator manages starts life as a YAML template compiled
//! into the binary. Templates are written for the `lws-system` namespace and
//! contain the `${CONTROLLER_IMAGE}` placeholder; the builders in
//! [`crate::resources`] rewrite both before applying.

use kube::api::DynamicObject;
use serde::de::DeserializeOwned;

use crate::controller::error::{Error, Result};

pub const CONTROLLER_CONFIG: &str = "lws-controller-config/config.yaml";
pub const CONFIG_MAP: &str = "lws-controller/configmap.yaml";

pub const CLUSTER_ROLE_MANAGER: &str =
    "lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrole_lws-manager-role.yaml";
pub const CLUSTER_ROLE_METRICS: &str =
    "lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrole_lws-metrics-reader.yaml";
pub const CLUSTER_ROLE_PROXY: &str =
    "lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrole_lws-proxy-role.yaml";

pub const CLUSTER_ROLE_BINDING_MANAGER: &str = "lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrolebinding_lws-manager-rolebinding.yaml";
pub const CLUSTER_ROLE_BINDING_METRICS: &str = "lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrolebinding_lws-metrics-reader-rolebinding.yaml";
pub const CLUSTER_ROLE_BINDING_PROXY: &str = "lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrolebinding_lws-proxy-rolebinding.yaml";

pub const ROLE_LEADER_ELECTION: &str =
    "lws-controller-generated/rbac.authorization.k8s.io_v1_role_lws-leader-election-role.yaml";
pub const ROLE_MONITORING: &str =
    "lws-controller-generated/rbac.authorization.k8s.io_v1_role_lws-prometheus-k8s.yaml";
pub const ROLE_BINDING_LEADER_ELECTION: &str = "lws-controller-generated/rbac.authorization.k8s.io_v1_rolebinding_lws-leader-election-rolebinding.yaml";
pub const ROLE_BINDING_MONITORING: &str =
    "lws-controller-generated/rbac.authorization.k8s.io_v1_rolebinding_lws-prometheus-k8s.yaml";

pub const CRD: &str = "lws-controller-generated/apiextensions.k8s.io_v1_customresourcedefinition_leaderworkersets.leaderworkerset.x-k8s.io.yaml";
pub const SERVICE_ACCOUNT: &str =
    "lws-controller-generated/v1_serviceaccount_lws-controller-manager.yaml";
pub const SERVICE_METRICS: &str =
    "lws-controller-generated/v1_service_lws-controller-manager-metrics-service.yaml";
pub const SERVICE_WEBHOOK: &str = "lws-controller-generated/v1_service_lws-webhook-service.yaml";
pub const MUTATING_WEBHOOK: &str = "lws-controller-generated/admissionregistration.k8s.io_v1_mutatingwebhookconfiguration_lws-mutating-webhook-configuration.yaml";
pub const VALIDATING_WEBHOOK: &str = "lws-controller-generated/admissionregistration.k8s.io_v1_validatingwebhookconfiguration_lws-validating-webhook-configuration.yaml";
pub const SERVICE_MONITOR: &str = "lws-controller-generated/monitoring.coreos.com_v1_servicemonitor_lws-controller-manager-metrics-monitor.yaml";
pub const DEPLOYMENT: &str =
    "lws-controller-generated/apps_v1_deployment_lws-controller-manager.yaml";

pub const ISSUER: &str = "cert-manager/issuer.yaml";
pub const WEBHOOK_CERTIFICATE: &str = "cert-manager/webhook-certificate.yaml";
pub const METRICS_CERTIFICATE: &str = "cert-manager/metrics-certificate.yaml";

/// All embedded templates, keyed by their path under `assets/`.
pub static ASSETS: &[(&str, &str)] = &[
    (
        CONTROLLER_CONFIG,
        include_str!("../../assets/lws-controller-config/config.yaml"),
    ),
    (
        CONFIG_MAP,
        include_str!("../../assets/lws-controller/configmap.yaml"),
    ),
    (
        CLUSTER_ROLE_MANAGER,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrole_lws-manager-role.yaml"),
    ),
    (
        CLUSTER_ROLE_METRICS,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrole_lws-metrics-reader.yaml"),
    ),
    (
        CLUSTER_ROLE_PROXY,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrole_lws-proxy-role.yaml"),
    ),
    (
        CLUSTER_ROLE_BINDING_MANAGER,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrolebinding_lws-manager-rolebinding.yaml"),
    ),
    (
        CLUSTER_ROLE_BINDING_METRICS,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrolebinding_lws-metrics-reader-rolebinding.yaml"),
    ),
    (
        CLUSTER_ROLE_BINDING_PROXY,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_clusterrolebinding_lws-proxy-rolebinding.yaml"),
    ),
    (
        ROLE_LEADER_ELECTION,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_role_lws-leader-election-role.yaml"),
    ),
    (
        ROLE_MONITORING,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_role_lws-prometheus-k8s.yaml"),
    ),
    (
        ROLE_BINDING_LEADER_ELECTION,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_rolebinding_lws-leader-election-rolebinding.yaml"),
    ),
    (
        ROLE_BINDING_MONITORING,
        include_str!("../../assets/lws-controller-generated/rbac.authorization.k8s.io_v1_rolebinding_lws-prometheus-k8s.yaml"),
    ),
    (
        CRD,
        include_str!("../../assets/lws-controller-generated/apiextensions.k8s.io_v1_customresourcedefinition_leaderworkersets.leaderworkerset.x-k8s.io.yaml"),
    ),
    (
        SERVICE_ACCOUNT,
        include_str!("../../assets/lws-controller-generated/v1_serviceaccount_lws-controller-manager.yaml"),
    ),
    (
        SERVICE_METRICS,
        include_str!("../../assets/lws-controller-generated/v1_service_lws-controller-manager-metrics-service.yaml"),
    ),
    (
        SERVICE_WEBHOOK,
        include_str!("../../assets/lws-controller-generated/v1_service_lws-webhook-service.yaml"),
    ),
    (
        MUTATING_WEBHOOK,
        include_str!("../../assets/lws-controller-generated/admissionregistration.k8s.io_v1_mutatingwebhookconfiguration_lws-mutating-webhook-configuration.yaml"),
    ),
    (
        VALIDATING_WEBHOOK,
        include_str!("../../assets/lws-controller-generated/admissionregistration.k8s.io_v1_validatingwebhookconfiguration_lws-validating-webhook-configuration.yaml"),
    ),
    (
        SERVICE_MONITOR,
        include_str!("../../assets/lws-controller-generated/monitoring.coreos.com_v1_servicemonitor_lws-controller-manager-metrics-monitor.yaml"),
    ),
    (
        DEPLOYMENT,
        include_str!("../../assets/lws-controller-generated/apps_v1_deployment_lws-controller-manager.yaml"),
    ),
    (
        ISSUER,
        include_str!("../../assets/cert-manager/issuer.yaml"),
    ),
    (
        WEBHOOK_CERTIFICATE,
        include_str!("../../assets/cert-manager/webhook-certificate.yaml"),
    ),
    (
        METRICS_CERTIFICATE,
        include_str!("../../assets/cert-manager/metrics-certificate.yaml"),
    ),
];

/// Look up an embedded template by path.
pub fn asset(path: &str) -> Result<&'static str> {
    ASSETS
        .iter()
        .find(|(name, _)| *name == path)
        .map(|(_, content)| *content)
        .ok_or_else(|| Error::UnknownAsset(path.to_string()))
}

/// Decode an embedded template into a typed object.
pub fn read<K: DeserializeOwned>(path: &str) -> Result<K> {
    let raw = asset(path)?;
    serde_yaml::from_str(raw).map_err(|source| Error::Manifest {
        asset: path.to_string(),
        source,
    })
}

/// Decode an embedded template for a kind without typed bindings.
pub fn read_dynamic(path: &str) -> Result<DynamicObject> {
    read(path)
}
