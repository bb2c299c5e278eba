//! lws-operator library crate
//!
//! Installs and manages the LeaderWorkerSet controller on OpenShift. Exports
//! the controller, the operator CRD, the manifest builders and the ambient
//! plumbing (configuration, health server, log level control).

pub mod config;
pub mod controller;
pub mod crd;
pub mod health;
pub mod log_level;
pub mod manifests;
pub mod resources;

pub use config::OperatorConfig;
pub use health::HealthState;
pub use log_level::LogLevelController;

use std::sync::Arc;

use futures::{Stream, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::controller::Error as ControllerError;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::{Controller, WatchStreamExt, predicates, reflector, watcher};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use controller::context::Context;
use controller::reconciler::{error_policy, reconcile};
use crd::{LeaderWorkerSetOperator, OPERATOR_CONFIG_NAME};
use resources::DEPLOYMENT_NAME;

/// Create the default watcher configuration for all watches.
///
/// `any_semantic()` lets the API server answer list calls from its cache.
fn default_watcher_config() -> WatcherConfig {
    WatcherConfig::default().any_semantic()
}

/// Reflector-backed stream of `api` that drops status-only updates.
///
/// The operator writes its own status on every pass; without the generation
/// predicate each write would schedule another full pass.
fn create_filtered_stream<K>(
    api: Api<K>,
    watcher_config: WatcherConfig,
) -> (
    reflector::Store<K>,
    impl Stream<Item = Result<K, watcher::Error>>,
)
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug + Send + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let (reader, writer) = reflector::store();
    let stream = reflector(writer, watcher(api, watcher_config))
        .default_backoff()
        .applied_objects()
        .predicate_filter(predicates::generation);
    (reader, stream)
}

/// Run the operator controller.
///
/// Watches LeaderWorkerSetOperator resources cluster-wide and the controller
/// manager Deployment in the operand namespace. Deployment events are mapped
/// back to the `cluster` singleton, since the owner is cluster-scoped and
/// cannot be resolved from a namespaced owner reference lookup.
///
/// If health_state is provided, metrics will be recorded for sync passes.
pub async fn run_controller(
    client: Client,
    config: OperatorConfig,
    health_state: Option<Arc<HealthState>>,
    log_level: Option<Arc<LogLevelController>>,
) {
    info!(
        namespace = %config.namespace,
        operand_image = ?config.operand_image,
        "Starting LeaderWorkerSetOperator controller"
    );

    if let Some(ref state) = health_state {
        state.set_ready(true).await;
    }

    let operators: Api<LeaderWorkerSetOperator> = Api::all(client.clone());
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), &config.namespace);
    let deployment_watch =
        default_watcher_config().fields(&format!("metadata.name={DEPLOYMENT_NAME}"));

    let ctx = Arc::new(Context::new(client, config, health_state, log_level));

    let (reader, operator_stream) = create_filtered_stream(operators, default_watcher_config());

    Controller::for_stream(operator_stream, reader)
        .watches(deployments, deployment_watch, |_| {
            Some(ObjectRef::<LeaderWorkerSetOperator>::new(OPERATOR_CONFIG_NAME))
        })
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    debug!("Synced: {}", obj.name);
                }
                Err(e) => {
                    // Deployment events map to `cluster` even before it exists.
                    let is_not_found = match &e {
                        ControllerError::ObjectNotFound(_) => true,
                        ControllerError::ReconcilerFailed(err, _) => err.is_not_found(),
                        _ => false,
                    };
                    if is_not_found {
                        debug!("Operator resource does not exist: {:?}", e);
                    } else {
                        error!("Sync error: {:?}", e);
                    }
                }
            }
        })
        .await;

    error!("Controller stream ended unexpectedly");
}
