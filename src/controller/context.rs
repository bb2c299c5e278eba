//! Shared context for the controller.
//!
//! The Context struct holds shared state that is passed to the reconciler,
//! including the Kubernetes client, event recorder and startup configuration.

use std::sync::Arc;

use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};

use crate::config::OperatorConfig;
use crate::crd::LeaderWorkerSetOperator;
use crate::health::HealthState;
use crate::log_level::LogLevelController;

/// Field manager name for server-side apply
pub const FIELD_MANAGER: &str = "lws-operator";

/// Shared context for the controller
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Startup configuration (operand image and namespace)
    pub config: OperatorConfig,
    /// Event reporter identity
    reporter: Reporter,
    /// Optional health state for metrics and readiness
    pub health_state: Option<Arc<HealthState>>,
    /// Optional handle on the operator's own log filter
    pub log_level: Option<Arc<LogLevelController>>,
}

impl Context {
    /// Create a new context
    pub fn new(
        client: Client,
        config: OperatorConfig,
        health_state: Option<Arc<HealthState>>,
        log_level: Option<Arc<LogLevelController>>,
    ) -> Self {
        let reporter = Reporter {
            controller: FIELD_MANAGER.into(),
            instance: config.pod_name.clone(),
        };
        Self {
            client,
            config,
            reporter,
            health_state,
            log_level,
        }
    }

    /// Namespace the operand is installed into
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    fn recorder(&self) -> Recorder {
        Recorder::new(self.client.clone(), self.reporter.clone())
    }

    async fn publish(
        &self,
        resource: &LeaderWorkerSetOperator,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let object_ref = resource.object_ref(&());
        if let Err(e) = self
            .recorder()
            .publish(
                &Event {
                    type_,
                    reason: reason.into(),
                    note,
                    action: action.into(),
                    secondary: None,
                },
                &object_ref,
            )
            .await
        {
            tracing::warn!(reason = %reason, error = %e, "Failed to publish event");
        }
    }

    /// Publish a normal event on the operator resource
    pub async fn publish_normal_event(
        &self,
        resource: &LeaderWorkerSetOperator,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        self.publish(resource, EventType::Normal, reason, action, note)
            .await;
    }

    /// Publish a warning event on the operator resource
    pub async fn publish_warning_event(
        &self,
        resource: &LeaderWorkerSetOperator,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        self.publish(resource, EventType::Warning, reason, action, note)
            .await;
    }
}
