//! Health server for Kubernetes probes and Prometheus metrics.
//!
//! Provides:
//! - `/healthz` - Liveness probe (always returns 200 if server is running)
//! - `/readyz` - Readiness probe (returns 200 once leader and syncing)
//! - `/metrics` - Prometheus metrics endpoint

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::sync::RwLock;
use tracing::info;

/// Labels for sync metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct SyncLabels {
    pub name: String,
}

impl EncodeLabelSet for SyncLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("name", self.name.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for applied object metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ApplyLabels {
    pub kind: String,
    /// "unchanged", "changed" or "error"
    pub result: String,
}

impl EncodeLabelSet for ApplyLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("kind", self.kind.as_str()).encode(encoder.encode_label())?;
        ("result", self.result.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for condition gauges
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ConditionLabels {
    pub condition: String,
}

impl EncodeLabelSet for ConditionLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("condition", self.condition.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics for the operator
pub struct Metrics {
    /// Total sync passes
    pub syncs_total: Family<SyncLabels, Counter>,
    /// Failed sync passes
    pub sync_errors_total: Family<SyncLabels, Counter>,
    /// Sync pass duration histogram
    pub sync_duration_seconds: Family<SyncLabels, Histogram>,
    /// Applied objects by kind and outcome
    pub applied_objects_total: Family<ApplyLabels, Counter>,
    /// 1 when the condition is True, 0 otherwise
    pub condition_status: Family<ConditionLabels, Gauge>,
    /// Ready replicas of the controller manager Deployment
    pub operand_ready_replicas: Gauge,
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with registered metrics
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let syncs_total = Family::<SyncLabels, Counter>::default();
        registry.register(
            "lwsoperator_syncs",
            "Total number of sync passes",
            syncs_total.clone(),
        );

        let sync_errors_total = Family::<SyncLabels, Counter>::default();
        registry.register(
            "lwsoperator_sync_errors",
            "Total number of failed sync passes",
            sync_errors_total.clone(),
        );

        let sync_duration_seconds = Family::<SyncLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.005, 2.0, 12))
        });
        registry.register(
            "lwsoperator_sync_duration_seconds",
            "Duration of a sync pass in seconds",
            sync_duration_seconds.clone(),
        );

        let applied_objects_total = Family::<ApplyLabels, Counter>::default();
        registry.register(
            "lwsoperator_applied_objects",
            "Objects applied by kind and outcome",
            applied_objects_total.clone(),
        );

        let condition_status = Family::<ConditionLabels, Gauge>::default();
        registry.register(
            "lwsoperator_condition_status",
            "Operator conditions, 1 when True",
            condition_status.clone(),
        );

        let operand_ready_replicas = Gauge::default();
        registry.register(
            "lwsoperator_operand_ready_replicas",
            "Ready replicas of the LeaderWorkerSet controller",
            operand_ready_replicas.clone(),
        );

        Self {
            syncs_total,
            sync_errors_total,
            sync_duration_seconds,
            applied_objects_total,
            condition_status,
            operand_ready_replicas,
            registry,
        }
    }

    /// Record a completed sync pass
    pub fn record_sync(&self, name: &str, duration_secs: f64) {
        let labels = SyncLabels {
            name: name.to_string(),
        };
        self.syncs_total.get_or_create(&labels).inc();
        self.sync_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record a failed sync pass
    pub fn record_error(&self, name: &str) {
        let labels = SyncLabels {
            name: name.to_string(),
        };
        self.sync_errors_total.get_or_create(&labels).inc();
    }

    /// Record the outcome of applying one object
    pub fn record_apply(&self, kind: &str, result: &str) {
        let labels = ApplyLabels {
            kind: kind.to_string(),
            result: result.to_string(),
        };
        self.applied_objects_total.get_or_create(&labels).inc();
    }

    /// Publish a condition's status
    pub fn set_condition(&self, condition: &str, status: bool) {
        let labels = ConditionLabels {
            condition: condition.to_string(),
        };
        self.condition_status
            .get_or_create(&labels)
            .set(i64::from(status));
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether the operator is ready (acquired leadership and running controller)
    ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
    /// Last successful sync timestamp (Unix epoch seconds)
    pub last_sync: AtomicU64,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (starts as not ready)
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
            last_sync: AtomicU64::new(0),
        }
    }

    /// Mark the operator as ready or not ready
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Check if the operator is ready
    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }

    /// Stamp the time of the last successful sync
    pub fn mark_synced(&self) {
        let now = jiff::Timestamp::now().as_second().max(0) as u64;
        self.last_sync.store(now, Ordering::Relaxed);
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Returns 503 until the operator holds the lease and runs the controller.
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

async fn metrics_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the health server on `0.0.0.0:<port>`.
pub async fn run_health_server(state: Arc<HealthState>, port: u16) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting health server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
