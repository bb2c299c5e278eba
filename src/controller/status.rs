//! Status management utilities.
//!
//! Provides helpers for building operator conditions and tracking the
//! generations of managed workloads.

use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;

use crate::crd::{GenerationStatus, OperatorCondition};

/// Builder for managing conditions list
///
/// Starts from the conditions already on the resource so that
/// `lastTransitionTime` only moves when a condition's status flips.
pub struct ConditionBuilder {
    conditions: Vec<OperatorCondition>,
}

impl ConditionBuilder {
    /// Create a new builder seeded with existing conditions
    pub fn new(existing: &[OperatorCondition]) -> Self {
        Self {
            conditions: existing.to_vec(),
        }
    }

    /// Add or update a condition
    pub fn set(&mut self, mut condition: OperatorCondition) -> &mut Self {
        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition.r#type)
        {
            if existing.status == condition.status {
                condition
                    .last_transition_time
                    .clone_from(&existing.last_transition_time);
            }
            *existing = condition;
        } else {
            self.conditions.push(condition);
        }
        self
    }

    /// Set Available condition
    pub fn available(&mut self, available: bool, reason: &str, message: &str) -> &mut Self {
        self.set(OperatorCondition::available(available, reason, message))
    }

    /// Set Progressing condition
    pub fn progressing(&mut self, progressing: bool, reason: &str, message: &str) -> &mut Self {
        self.set(OperatorCondition::progressing(progressing, reason, message))
    }

    /// Set the sync controller's Degraded condition
    pub fn degraded(&mut self, degraded: bool, reason: &str, message: &str) -> &mut Self {
        self.set(OperatorCondition::degraded(degraded, reason, message))
    }

    /// Build the conditions list
    pub fn build(self) -> Vec<OperatorCondition> {
        self.conditions
    }
}

/// Check if a condition type is true
pub fn is_condition_true(conditions: &[OperatorCondition], condition_type: &str) -> bool {
    find_condition(conditions, condition_type).is_some_and(OperatorCondition::is_true)
}

/// Find a condition by type
pub fn find_condition<'a>(
    conditions: &'a [OperatorCondition],
    condition_type: &str,
) -> Option<&'a OperatorCondition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

fn is_deployment_entry(entry: &GenerationStatus, namespace: &str, name: &str) -> bool {
    entry.group == "apps"
        && entry.resource == "deployments"
        && entry.namespace == namespace
        && entry.name == name
}

/// Generation recorded for a Deployment on the previous sync, if any.
pub fn expected_deployment_generation(
    generations: &[GenerationStatus],
    namespace: &str,
    name: &str,
) -> Option<i64> {
    generations
        .iter()
        .find(|g| is_deployment_entry(g, namespace, name))
        .map(|g| g.last_generation)
}

/// Record the generation of an applied Deployment.
pub fn set_deployment_generation(generations: &mut Vec<GenerationStatus>, deployment: &Deployment) {
    let namespace = deployment.namespace().unwrap_or_default();
    let name = deployment.name_any();
    let last_generation = deployment.metadata.generation.unwrap_or_default();

    if let Some(entry) = generations
        .iter_mut()
        .find(|g| is_deployment_entry(g, &namespace, &name))
    {
        entry.last_generation = last_generation;
        return;
    }

    generations.push(GenerationStatus {
        group: "apps".to_string(),
        resource: "deployments".to_string(),
        namespace,
        name,
        last_generation,
        hash: String::new(),
    });
}
