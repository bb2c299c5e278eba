//! Resource generation module.
//!
//! Builders that turn the embedded templates into the objects the operator
//! applies. Each builder is pure: it reads its template, points it at the
//! operand namespace and stamps the owner reference.
//!
//! ## Resources Generated
//!
//! | Resource | Purpose |
//! |----------|---------|
//! | ClusterRole / ClusterRoleBinding | Controller, metrics reader and auth proxy permissions |
//! | Role / RoleBinding | Leader election and Prometheus scraping |
//! | ConfigMap | Controller manager configuration |
//! | CustomResourceDefinition | The LeaderWorkerSet API |
//! | ServiceAccount, Services | Controller identity, metrics and webhook endpoints |
//! | Mutating/ValidatingWebhookConfiguration | Admission for LeaderWorkerSets and their pods |
//! | ServiceMonitor | Metrics scraping by cluster monitoring |
//! | Issuer, Certificate | Serving certificates via cert-manager |
//! | Deployment | The LeaderWorkerSet controller manager |

pub mod certificate;
pub mod common;
pub mod deployment;
pub mod leaderworkerset_crd;
pub mod monitoring;
pub mod rbac;
pub mod services;
pub mod webhooks;

pub use common::{Target, owner_reference, spec_annotations};

/// Name of the controller manager Deployment.
pub const DEPLOYMENT_NAME: &str = "lws-controller-manager";

/// Label selecting the controller manager pods.
pub const CONTROLLER_POD_SELECTOR: &str = "control-plane=controller-manager";

pub const METRICS_SERVICE_NAME: &str = "lws-controller-manager-metrics-service";
pub const WEBHOOK_SERVICE_NAME: &str = "lws-webhook-service";

/// cert-manager Certificate whose CA is injected into webhooks and the CRD.
pub const WEBHOOK_CERT_NAME: &str = "webhook-cert";

/// Secrets cert-manager writes the serving certificates to.
pub const WEBHOOK_SECRET_NAME: &str = "webhook-server-cert";
pub const METRICS_SECRET_NAME: &str = "metrics-server-cert";
