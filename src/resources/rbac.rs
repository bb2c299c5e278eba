//! RBAC objects for the LeaderWorkerSet controller.

use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding, Subject};

use crate::controller::error::Result;
use crate::manifests;

use super::common::Target;

fn cluster_role(asset: &str, target: &Target) -> Result<ClusterRole> {
    let mut required: ClusterRole = manifests::read(asset)?;
    target.own(&mut required.metadata);
    Ok(required)
}

pub fn cluster_role_manager(target: &Target) -> Result<ClusterRole> {
    cluster_role(manifests::CLUSTER_ROLE_MANAGER, target)
}

pub fn cluster_role_metrics(target: &Target) -> Result<ClusterRole> {
    cluster_role(manifests::CLUSTER_ROLE_METRICS, target)
}

pub fn cluster_role_proxy(target: &Target) -> Result<ClusterRole> {
    cluster_role(manifests::CLUSTER_ROLE_PROXY, target)
}

fn rebind_subjects(subjects: &mut Option<Vec<Subject>>, namespace: &str) {
    for subject in subjects.iter_mut().flatten() {
        subject.namespace = Some(namespace.to_string());
    }
}

fn cluster_role_binding(asset: &str, target: &Target) -> Result<ClusterRoleBinding> {
    let mut required: ClusterRoleBinding = manifests::read(asset)?;
    target.own(&mut required.metadata);
    rebind_subjects(&mut required.subjects, &target.namespace);
    Ok(required)
}

pub fn cluster_role_binding_manager(target: &Target) -> Result<ClusterRoleBinding> {
    cluster_role_binding(manifests::CLUSTER_ROLE_BINDING_MANAGER, target)
}

pub fn cluster_role_binding_metrics(target: &Target) -> Result<ClusterRoleBinding> {
    cluster_role_binding(manifests::CLUSTER_ROLE_BINDING_METRICS, target)
}

pub fn cluster_role_binding_proxy(target: &Target) -> Result<ClusterRoleBinding> {
    cluster_role_binding(manifests::CLUSTER_ROLE_BINDING_PROXY, target)
}

/// Leader election Role used by the controller manager.
pub fn role(target: &Target) -> Result<Role> {
    let mut required: Role = manifests::read(manifests::ROLE_LEADER_ELECTION)?;
    target.own_namespaced(&mut required.metadata);
    Ok(required)
}

/// Role letting cluster monitoring scrape the operand namespace.
pub fn role_monitoring(target: &Target) -> Result<Role> {
    let mut required: Role = manifests::read(manifests::ROLE_MONITORING)?;
    target.own_namespaced(&mut required.metadata);
    Ok(required)
}

pub fn role_binding(target: &Target) -> Result<RoleBinding> {
    let mut required: RoleBinding = manifests::read(manifests::ROLE_BINDING_LEADER_ELECTION)?;
    target.own_namespaced(&mut required.metadata);
    rebind_subjects(&mut required.subjects, &target.namespace);
    Ok(required)
}

/// Binding for the cluster Prometheus; its subject lives in openshift-monitoring.
pub fn role_binding_monitoring(target: &Target) -> Result<RoleBinding> {
    let mut required: RoleBinding = manifests::read(manifests::ROLE_BINDING_MONITORING)?;
    target.own_namespaced(&mut required.metadata);
    Ok(required)
}
