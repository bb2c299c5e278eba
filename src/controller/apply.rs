//! Apply-with-diff on top of server-side apply.
//!
//! Every managed object goes through [`apply`]: a forced server-side apply
//! under the operator's field manager, preceded by a read so the caller learns
//! whether the object was created, updated or left as it was. A Deployment
//! edited outside the operator gets its whole spec replaced first.

use std::fmt::Debug;

use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::context::FIELD_MANAGER;
use super::error::{Error, Result};

/// What an apply did to the live object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyChange {
    Created,
    Updated,
    Unchanged,
}

impl ApplyChange {
    /// Compare the resourceVersion before and after the apply.
    pub fn between(before: Option<&str>, after: Option<&str>, existed: bool) -> Self {
        if !existed {
            ApplyChange::Created
        } else if before != after {
            ApplyChange::Updated
        } else {
            ApplyChange::Unchanged
        }
    }

    pub fn changed(self) -> bool {
        self != ApplyChange::Unchanged
    }

    /// Event reason for this change on an object of `kind`, if one is due.
    pub fn event_reason(self, kind: &str) -> Option<String> {
        match self {
            ApplyChange::Created => Some(format!("{kind}Created")),
            ApplyChange::Updated => Some(format!("{kind}Updated")),
            ApplyChange::Unchanged => None,
        }
    }

    /// Metric label for this change
    pub fn as_label(self) -> &'static str {
        match self {
            ApplyChange::Created | ApplyChange::Updated => "changed",
            ApplyChange::Unchanged => "unchanged",
        }
    }
}

/// Result of applying one object.
#[derive(Clone, Debug)]
pub struct ApplyOutcome<K> {
    /// The object as returned by the API server.
    pub object: K,
    pub change: ApplyChange,
}

/// Server-side apply `required` and report whether the live object changed.
pub async fn apply<K>(api: &Api<K>, required: &K, kind: &str) -> Result<ApplyOutcome<K>>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug,
{
    let name = required
        .meta()
        .name
        .clone()
        .ok_or_else(|| Error::MissingField(format!("{kind} metadata.name")))?;

    let existing = api.get_opt(&name).await?;
    let applied = api
        .patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(required),
        )
        .await?;

    let change = ApplyChange::between(
        existing.as_ref().and_then(|e| e.meta().resource_version.as_deref()),
        applied.meta().resource_version.as_deref(),
        existing.is_some(),
    );

    if change.changed() {
        info!(kind, name = %name, change = ?change, "Applied object");
    } else {
        debug!(kind, name = %name, "Object already up to date");
    }

    Ok(ApplyOutcome {
        object: applied,
        change,
    })
}

/// Whether the live Deployment was modified since the operator last applied it.
///
/// `expected` is the generation recorded in the operator status. With no
/// record, or no live object, there is nothing to compare against.
pub fn deployment_drifted(live: Option<&Deployment>, expected: Option<i64>) -> bool {
    match (live.and_then(|d| d.metadata.generation), expected) {
        (Some(actual), Some(expected)) => actual != expected,
        _ => false,
    }
}

/// `live` with its spec put back to the spec of `required`.
///
/// Metadata comes from `live`, resourceVersion included, so the update fails
/// with a conflict if the Deployment moved again in between.
pub fn reverted_deployment(live: &Deployment, required: &Deployment) -> Deployment {
    let mut reverted = live.clone();
    reverted.spec = required.spec.clone();
    reverted.status = None;
    reverted.metadata.managed_fields = None;
    reverted
}

/// Replace the whole spec of a drifted Deployment.
///
/// A server-side apply only reclaims the fields the operator sets; fields
/// another manager added (extra env, volumes) would survive it.
pub async fn replace_deployment(
    api: &Api<Deployment>,
    live: &Deployment,
    required: &Deployment,
) -> Result<Deployment> {
    let name = live.name_any();
    let params = PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };
    let replaced = api
        .replace(&name, &params, &reverted_deployment(live, required))
        .await?;
    info!(
        name = %name,
        generation = ?replaced.metadata.generation,
        "Reverted Deployment spec"
    );
    Ok(replaced)
}

/// Namespaced `name` of an object for event notes.
pub fn describe<K: Resource>(object: &K) -> String {
    match object.namespace() {
        Some(ns) => format!("{}/{}", ns, object.name_any()),
        None => object.name_any(),
    }
}
