//! cert-manager resources for the operand's serving certificates.
//!
//! A self-signed Issuer signs two Certificates: one for the webhook Service
//! (admission and CRD conversion) and one for the metrics Service. The CA
//! injector copies the webhook CA into the CRD and webhook configurations.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use serde::{Deserialize, Serialize};

use crate::controller::error::Result;
use crate::manifests;

use super::common::Target;
use super::{METRICS_SERVICE_NAME, WEBHOOK_SERVICE_NAME};

// ============================================================================
// cert-manager Certificate types
// ============================================================================

/// cert-manager Certificate resource.
///
/// A simplified representation of the cert-manager Certificate CRD.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: CertificateSpec,
}

/// Specification for a cert-manager Certificate.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Name of the Secret that will contain the certificate.
    pub secret_name: String,

    /// Reference to the issuer responsible for issuing the certificate.
    pub issuer_ref: CertIssuerRef,

    /// DNS names to include in the certificate.
    pub dns_names: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renew_before: Option<String>,
}

/// Reference to a cert-manager Issuer or ClusterIssuer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertIssuerRef {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Certificate {
    /// Convert into the dynamic form used for server-side apply.
    pub fn into_dynamic(self) -> Result<DynamicObject> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }
}

fn cert_manager_resource(kind: &str) -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind {
        group: "cert-manager.io".to_string(),
        version: "v1".to_string(),
        kind: kind.to_string(),
    })
}

/// API resource for cert-manager Certificates.
pub fn certificate_resource() -> ApiResource {
    cert_manager_resource("Certificate")
}

/// API resource for cert-manager Issuers.
pub fn issuer_resource() -> ApiResource {
    cert_manager_resource("Issuer")
}

// ============================================================================
// Builders
// ============================================================================

/// Self-signed Issuer in the operand namespace.
pub fn issuer(target: &Target) -> Result<DynamicObject> {
    let mut required = manifests::read_dynamic(manifests::ISSUER)?;
    target.own_namespaced(&mut required.metadata);
    Ok(required)
}

fn certificate(asset: &str, service: &str, target: &Target) -> Result<Certificate> {
    let mut required: Certificate = manifests::read(asset)?;
    target.own_namespaced(&mut required.metadata);
    required.spec.dns_names = target.service_dns_names(service);
    Ok(required)
}

/// Serving certificate for the webhook Service.
pub fn webhook_certificate(target: &Target) -> Result<Certificate> {
    certificate(manifests::WEBHOOK_CERTIFICATE, WEBHOOK_SERVICE_NAME, target)
}

/// Serving certificate for the metrics Service.
pub fn metrics_certificate(target: &Target) -> Result<Certificate> {
    certificate(manifests::METRICS_CERTIFICATE, METRICS_SERVICE_NAME, target)
}
