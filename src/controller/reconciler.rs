//! Sync loop for the LeaderWorkerSetOperator.
//!
//! Each pass renders every managed object from its template and applies it
//! in a fixed order, stopping at the first error. The controller runtime
//! retries the whole pass; there is no per-object recovery.

use std::sync::Arc;
use std::time::{Duration, Instant};

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, ApiResource, DynamicObject, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::controller::apply::{self, ApplyOutcome, deployment_drifted, describe};
use crate::controller::context::{Context, FIELD_MANAGER};
use crate::controller::error::{Error, Result};
use crate::controller::status::{
    ConditionBuilder, expected_deployment_generation, set_deployment_generation,
};
use crate::crd::{
    ConditionType, LeaderWorkerSetOperator, LeaderWorkerSetOperatorStatus, ManagementState,
    OPERATOR_CONFIG_NAME,
};
use crate::resources::{
    self, DEPLOYMENT_NAME, METRICS_SECRET_NAME, Target, WEBHOOK_SECRET_NAME, certificate,
    leaderworkerset_crd, monitoring, rbac, services, webhooks,
};

/// Periodic resync, also used after a successful pass.
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Requeue while waiting for the operand to become available.
pub const NOT_AVAILABLE_REQUEUE: Duration = Duration::from_secs(30);

pub const REASON_AS_EXPECTED: &str = "AsExpected";
pub const REASON_SYNC_ERROR: &str = "SyncError";
pub const REASON_DEPLOYMENT_UNAVAILABLE: &str = "DeploymentUnavailable";
pub const REASON_WAITING_FOR_TLS: &str = "WaitingForTLSSecret";
pub const REASON_ROLLING_OUT: &str = "RollingOut";

/// Observed state of the operand after a sync pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperandState {
    pub available_replicas: i32,
    pub ready_replicas: i32,
    /// The Deployment controller has caught up with the latest spec.
    pub rollout_complete: bool,
    /// Both serving certificate Secrets exist.
    pub tls_ready: bool,
}

impl OperandState {
    pub fn from_deployment(deployment: &Deployment, tls_ready: bool) -> Self {
        let desired = deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(1);
        let generation = deployment.metadata.generation.unwrap_or_default();
        let status = deployment.status.clone().unwrap_or_default();

        let available_replicas = status.available_replicas.unwrap_or_default();
        let updated_replicas = status.updated_replicas.unwrap_or_default();
        let total_replicas = status.replicas.unwrap_or_default();
        let observed = status.observed_generation.unwrap_or_default();

        // Old ReplicaSet pods still count towards status.replicas until they are gone.
        Self {
            available_replicas,
            ready_replicas: status.ready_replicas.unwrap_or_default(),
            rollout_complete: observed >= generation
                && updated_replicas >= desired
                && total_replicas == updated_replicas
                && available_replicas >= updated_replicas,
            tls_ready,
        }
    }

    /// (available, reason, message) for the Available condition
    pub fn availability(&self) -> (bool, &'static str, String) {
        if self.available_replicas < 1 {
            (
                false,
                REASON_DEPLOYMENT_UNAVAILABLE,
                format!("deployment/{DEPLOYMENT_NAME} has no available replicas"),
            )
        } else if !self.tls_ready {
            (
                false,
                REASON_WAITING_FOR_TLS,
                format!("waiting for secrets {WEBHOOK_SECRET_NAME} and {METRICS_SECRET_NAME}"),
            )
        } else {
            (true, REASON_AS_EXPECTED, String::new())
        }
    }

    /// When the next pass should run
    pub fn requeue_after(&self) -> Duration {
        if self.availability().0 {
            RESYNC_INTERVAL
        } else {
            NOT_AVAILABLE_REQUEUE
        }
    }
}

/// Reconcile the LeaderWorkerSetOperator
pub async fn reconcile(obj: Arc<LeaderWorkerSetOperator>, ctx: Arc<Context>) -> Result<Action> {
    let start_time = Instant::now();
    let name = obj.name_any();

    if name != OPERATOR_CONFIG_NAME {
        debug!(name = %name, "Ignoring LeaderWorkerSetOperator not named {}", OPERATOR_CONFIG_NAME);
        return Ok(Action::await_change());
    }

    if let Some(log_level) = &ctx.log_level {
        log_level.apply(obj.spec.operator_log_level);
    }

    let api: Api<LeaderWorkerSetOperator> = Api::all(ctx.client.clone());

    let state = obj.spec.management_state;
    if !state.is_managed() {
        info!(name = %name, management_state = %state, "Skipping sync");
        update_status(&api, &obj, skipped_status(&obj, state)).await?;
        return Ok(Action::requeue(RESYNC_INTERVAL));
    }

    debug!(name = %name, generation = ?obj.metadata.generation, "Syncing operand");

    match sync(&obj, &ctx).await {
        Ok((deployment, operand)) => {
            let status = synced_status(&obj, &deployment, &operand);
            publish_condition_metrics(&ctx, &status);
            update_status(&api, &obj, status).await?;

            if let Some(ref health) = ctx.health_state {
                health
                    .metrics
                    .record_sync(&name, start_time.elapsed().as_secs_f64());
                health
                    .metrics
                    .operand_ready_replicas
                    .set(i64::from(operand.ready_replicas));
                health.mark_synced();
            }

            Ok(Action::requeue(operand.requeue_after()))
        }
        Err(e) => {
            error!(name = %name, error = %e, "Sync failed");
            ctx.publish_warning_event(&obj, "SyncFailed", "Sync", Some(e.to_string()))
                .await;

            let status = failed_status(&obj, &e);
            publish_condition_metrics(&ctx, &status);
            if let Err(status_err) = update_status(&api, &obj, status).await {
                warn!(name = %name, error = %status_err, "Failed to record degraded status");
            }
            Err(e)
        }
    }
}

/// Error policy for the controller
pub fn error_policy(obj: Arc<LeaderWorkerSetOperator>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = obj.name_any();

    if let Some(ref health) = ctx.health_state {
        health.metrics.record_error(&name);
    }

    if error.is_not_found() {
        debug!(name = %name, "Object not found, waiting for change");
        return Action::await_change();
    }

    let delay = error.requeue_after();
    warn!(name = %name, error = %error, retry_in = ?delay, "Sync will be retried");
    Action::requeue(delay)
}

/// Apply every managed object in order and report the operand state.
async fn sync(obj: &LeaderWorkerSetOperator, ctx: &Context) -> Result<(Deployment, OperandState)> {
    let pass = SyncPass::new(obj, ctx);
    let target = &pass.target;

    pass.apply_cluster(rbac::cluster_role_manager(target)?).await?;
    pass.apply_cluster(rbac::cluster_role_metrics(target)?).await?;
    pass.apply_cluster(rbac::cluster_role_proxy(target)?).await?;

    pass.apply_cluster(rbac::cluster_role_binding_manager(target)?)
        .await?;
    pass.apply_cluster(rbac::cluster_role_binding_metrics(target)?)
        .await?;
    pass.apply_cluster(rbac::cluster_role_binding_proxy(target)?)
        .await?;

    pass.apply_namespaced::<Role>(rbac::role(target)?).await?;
    pass.apply_namespaced::<Role>(rbac::role_monitoring(target)?)
        .await?;
    pass.apply_namespaced::<RoleBinding>(rbac::role_binding(target)?)
        .await?;
    pass.apply_namespaced::<RoleBinding>(rbac::role_binding_monitoring(target)?)
        .await?;

    pass.apply_namespaced::<ConfigMap>(services::config_map(target)?)
        .await?;

    pass.apply_custom_resource_definition().await?;

    pass.apply_namespaced::<ServiceAccount>(services::service_account(target)?)
        .await?;
    pass.apply_namespaced::<Service>(services::service_controller(target)?)
        .await?;
    pass.apply_namespaced::<Service>(services::service_webhook(target)?)
        .await?;

    pass.apply_cluster::<MutatingWebhookConfiguration>(webhooks::mutating_webhook(target)?)
        .await?;
    pass.apply_cluster::<ValidatingWebhookConfiguration>(webhooks::validating_webhook(target)?)
        .await?;

    pass.apply_dynamic(
        monitoring::service_monitor(target)?,
        &monitoring::service_monitor_resource(),
    )
    .await?;
    pass.apply_dynamic(certificate::issuer(target)?, &certificate::issuer_resource())
        .await?;
    let certificates = certificate::certificate_resource();
    pass.apply_dynamic(
        certificate::webhook_certificate(target)?.into_dynamic()?,
        &certificates,
    )
    .await?;
    pass.apply_dynamic(
        certificate::metrics_certificate(target)?.into_dynamic()?,
        &certificates,
    )
    .await?;

    let deployment = pass.apply_deployment().await?;
    let tls_ready = pass.tls_secrets_exist().await?;

    let operand = OperandState::from_deployment(&deployment, tls_ready);
    Ok((deployment, operand))
}

/// State shared by the applies of one sync pass.
struct SyncPass<'a> {
    obj: &'a LeaderWorkerSetOperator,
    ctx: &'a Context,
    target: Target,
}

impl<'a> SyncPass<'a> {
    fn new(obj: &'a LeaderWorkerSetOperator, ctx: &'a Context) -> Self {
        Self {
            obj,
            ctx,
            target: Target::new(obj, ctx.namespace()),
        }
    }

    async fn apply_with<K>(&self, api: Api<K>, required: K, kind: &str) -> Result<K>
    where
        K: Resource + Clone + Serialize + DeserializeOwned + std::fmt::Debug,
    {
        let outcome = apply::apply(&api, &required, kind).await;
        if let Some(ref health) = self.ctx.health_state {
            let label = match &outcome {
                Ok(o) => o.change.as_label(),
                Err(_) => "error",
            };
            health.metrics.record_apply(kind, label);
        }

        let ApplyOutcome { object, change } = outcome?;
        if let Some(reason) = change.event_reason(kind) {
            self.ctx
                .publish_normal_event(
                    self.obj,
                    &reason,
                    "Apply",
                    Some(format!("{:?} {} {}", change, kind, describe(&object))),
                )
                .await;
        }
        Ok(object)
    }

    async fn apply_cluster<K>(&self, required: K) -> Result<K>
    where
        K: Resource<Scope = k8s_openapi::ClusterResourceScope>
            + Clone
            + Serialize
            + DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let kind = K::kind(&K::DynamicType::default()).to_string();
        self.apply_with(Api::all(self.ctx.client.clone()), required, &kind)
            .await
    }

    async fn apply_namespaced<K>(&self, required: K) -> Result<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + Serialize
            + DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let kind = K::kind(&K::DynamicType::default()).to_string();
        let api = Api::namespaced(self.ctx.client.clone(), &self.target.namespace);
        self.apply_with(api, required, &kind).await
    }

    async fn apply_dynamic(&self, required: DynamicObject, resource: &ApiResource) -> Result<DynamicObject> {
        let api = Api::namespaced_with(self.ctx.client.clone(), &self.target.namespace, resource);
        self.apply_with(api, required, &resource.kind).await
    }

    async fn apply_custom_resource_definition(&self) -> Result<CustomResourceDefinition> {
        let api: Api<CustomResourceDefinition> = Api::all(self.ctx.client.clone());
        let live = api
            .get_opt(leaderworkerset_crd::LEADERWORKERSET_CRD_NAME)
            .await?;
        let required = leaderworkerset_crd::custom_resource_definition(&self.target, live.as_ref())?;
        self.apply_cluster(required).await
    }

    async fn apply_deployment(&self) -> Result<Deployment> {
        let api: Api<Deployment> = Api::namespaced(self.ctx.client.clone(), &self.target.namespace);
        let required = resources::deployment::deployment(
            &self.target,
            self.obj,
            self.ctx.config.operand_image.as_deref(),
        )?;

        let generations = self
            .obj
            .status
            .as_ref()
            .map(|s| s.generations.as_slice())
            .unwrap_or_default();
        let expected =
            expected_deployment_generation(generations, &self.target.namespace, DEPLOYMENT_NAME);
        let live = api.get_opt(DEPLOYMENT_NAME).await?;
        if let Some(live) = live.filter(|d| deployment_drifted(Some(d), expected)) {
            warn!(
                deployment = DEPLOYMENT_NAME,
                expected = ?expected,
                actual = ?live.metadata.generation,
                "Deployment modified outside the operator, reverting"
            );
            self.ctx
                .publish_warning_event(
                    self.obj,
                    "DeploymentDriftDetected",
                    "Apply",
                    Some(format!(
                        "deployment/{DEPLOYMENT_NAME} changed outside the operator, reverting"
                    )),
                )
                .await;
            apply::replace_deployment(&api, &live, &required).await?;
        }

        self.apply_namespaced(required).await
    }

    async fn tls_secrets_exist(&self) -> Result<bool> {
        let api: Api<Secret> = Api::namespaced(self.ctx.client.clone(), &self.target.namespace);
        for name in [WEBHOOK_SECRET_NAME, METRICS_SECRET_NAME] {
            if api.get_metadata_opt(name).await?.is_none() {
                debug!(secret = name, "Serving certificate secret not issued yet");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn current_status(obj: &LeaderWorkerSetOperator) -> LeaderWorkerSetOperatorStatus {
    obj.status.clone().unwrap_or_default()
}

/// Status after a successful sync pass.
pub fn synced_status(
    obj: &LeaderWorkerSetOperator,
    deployment: &Deployment,
    operand: &OperandState,
) -> LeaderWorkerSetOperatorStatus {
    let mut status = current_status(obj);
    let (available, reason, message) = operand.availability();

    let mut conditions = ConditionBuilder::new(&status.conditions);
    conditions
        .degraded(false, REASON_AS_EXPECTED, "")
        .available(available, reason, &message);
    if operand.rollout_complete {
        conditions.progressing(false, REASON_AS_EXPECTED, "");
    } else {
        conditions.progressing(
            true,
            REASON_ROLLING_OUT,
            &format!("deployment/{DEPLOYMENT_NAME} is rolling out"),
        );
    }
    status.conditions = conditions.build();

    set_deployment_generation(&mut status.generations, deployment);
    status.observed_generation = obj.metadata.generation;
    status.ready_replicas = operand.ready_replicas;
    status
}

/// Status after a failed sync pass; everything but Degraded is left alone.
pub fn failed_status(obj: &LeaderWorkerSetOperator, error: &Error) -> LeaderWorkerSetOperatorStatus {
    let mut status = current_status(obj);
    let mut conditions = ConditionBuilder::new(&status.conditions);
    conditions.degraded(true, REASON_SYNC_ERROR, &error.to_string());
    status.conditions = conditions.build();
    status
}

/// Status when the management state tells the operator to stand back.
pub fn skipped_status(
    obj: &LeaderWorkerSetOperator,
    state: ManagementState,
) -> LeaderWorkerSetOperatorStatus {
    let mut status = current_status(obj);
    let mut conditions = ConditionBuilder::new(&status.conditions);
    conditions.degraded(
        false,
        &state.to_string(),
        &format!("managementState is {state}, operand left untouched"),
    );
    status.conditions = conditions.build();
    status.observed_generation = obj.metadata.generation;
    status
}

fn publish_condition_metrics(ctx: &Context, status: &LeaderWorkerSetOperatorStatus) {
    if let Some(ref health) = ctx.health_state {
        for condition in &status.conditions {
            health
                .metrics
                .set_condition(&condition.r#type, condition.is_true());
        }
    }
}

async fn update_status(
    api: &Api<LeaderWorkerSetOperator>,
    obj: &LeaderWorkerSetOperator,
    status: LeaderWorkerSetOperatorStatus,
) -> Result<()> {
    if obj.status.as_ref() == Some(&status) {
        debug!("Status unchanged");
        return Ok(());
    }

    let patch = serde_json::json!({
        "status": status
    });
    let params = PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };
    api.patch_status(&obj.name_any(), &params, &Patch::Merge(&patch))
    .await?;

    let available = status
        .conditions
        .iter()
        .find(|c| c.r#type == ConditionType::Available.as_str())
        .is_some_and(|c| c.is_true());
    debug!(available, ready_replicas = status.ready_replicas, "Updated status");
    Ok(())
}
