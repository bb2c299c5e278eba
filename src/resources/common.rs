//! Common resource generation utilities.
//!
//! Ownership, namespacing and annotation helpers shared by every builder.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::ResourceExt;

use crate::crd::{LeaderWorkerSetOperator, OPERATOR_API_VERSION, OPERATOR_KIND};

/// Annotation on the pod template that tracks the operator resource generation.
pub const SPEC_ANNOTATION: &str = "leaderworkersetoperator.operator.openshift.io/cluster";

/// Annotation asking cert-manager's CA injector to fill in `caBundle` fields.
pub const INJECT_CA_ANNOTATION: &str = "cert-manager.io/inject-ca-from";

/// Where and for whom the managed objects are rendered.
#[derive(Clone, Debug)]
pub struct Target {
    /// Namespace the LeaderWorkerSet controller runs in.
    pub namespace: String,
    /// Owner reference stamped on every managed object.
    pub owner: OwnerReference,
}

impl Target {
    pub fn new(operator: &LeaderWorkerSetOperator, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            owner: owner_reference(operator),
        }
    }

    /// Make `meta` owned by the operator resource (cluster-scoped objects).
    pub fn own(&self, meta: &mut ObjectMeta) {
        meta.owner_references = Some(vec![self.owner.clone()]);
    }

    /// Make `meta` owned by the operator resource and place it in the operand namespace.
    pub fn own_namespaced(&self, meta: &mut ObjectMeta) {
        meta.namespace = Some(self.namespace.clone());
        self.own(meta);
    }

    /// `<namespace>/webhook-cert`, the value of the CA injection annotation.
    pub fn inject_ca_from(&self) -> String {
        format!("{}/{}", self.namespace, super::WEBHOOK_CERT_NAME)
    }

    /// In-cluster DNS names of a service in the operand namespace.
    pub fn service_dns_names(&self, service: &str) -> Vec<String> {
        vec![
            format!("{}.{}.svc", service, self.namespace),
            format!("{}.{}.svc.cluster.local", service, self.namespace),
        ]
    }
}

/// Create owner reference for the LeaderWorkerSetOperator
pub fn owner_reference(operator: &LeaderWorkerSetOperator) -> OwnerReference {
    OwnerReference {
        api_version: OPERATOR_API_VERSION.to_string(),
        kind: OPERATOR_KIND.to_string(),
        name: operator.name_any(),
        uid: operator.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Annotations merged into the operand pod template so that every spec
/// change rolls the Deployment.
pub fn spec_annotations(operator: &LeaderWorkerSetOperator) -> BTreeMap<String, String> {
    BTreeMap::from([(
        SPEC_ANNOTATION.to_string(),
        operator.metadata.generation.unwrap_or_default().to_string(),
    )])
}

/// Set the cert-manager CA injection annotation, keeping any others.
pub fn set_inject_ca_annotation(meta: &mut ObjectMeta, target: &Target) {
    meta.annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(INJECT_CA_ANNOTATION.to_string(), target.inject_ca_from());
}
