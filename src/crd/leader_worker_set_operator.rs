//! LeaderWorkerSetOperator Custom Resource Definition.
//!
//! A cluster-scoped singleton (always named `cluster`) that carries the
//! standard OpenShift operator spec and status. The spec tells the operator
//! how to run the LeaderWorkerSet controller; the status reports back what
//! was observed on the last sync.

use std::fmt;
use std::str::FromStr;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Name of the only LeaderWorkerSetOperator the operator acts upon.
pub const OPERATOR_CONFIG_NAME: &str = "cluster";

/// API version used in owner references pointing at the operator resource.
pub const OPERATOR_API_VERSION: &str = "operator.openshift.io/v1";

/// Kind used in owner references pointing at the operator resource.
pub const OPERATOR_KIND: &str = "LeaderWorkerSetOperator";

/// LeaderWorkerSetOperator configures the LeaderWorkerSet controller deployment.
///
/// Example:
/// ```yaml
/// apiVersion: operator.openshift.io/v1
/// kind: LeaderWorkerSetOperator
/// metadata:
///   name: cluster
/// spec:
///   managementState: Managed
///   logLevel: Normal
///   operatorLogLevel: Normal
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "operator.openshift.io",
    version = "v1",
    kind = "LeaderWorkerSetOperator",
    plural = "leaderworkersetoperators",
    status = "LeaderWorkerSetOperatorStatus",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".spec.managementState"}"#,
    printcolumn = r#"{"name":"Ready", "type":"integer", "jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LeaderWorkerSetOperatorSpec {
    /// Whether and how the operator should manage the component.
    #[serde(default, deserialize_with = "lenient_management_state")]
    pub management_state: ManagementState,

    /// Log level of the LeaderWorkerSet controller.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_log_level"
    )]
    pub log_level: Option<LogLevel>,

    /// Log level of the operator itself.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_log_level"
    )]
    pub operator_log_level: Option<LogLevel>,

    /// Overrides that are not supported and may break upgrades.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsupported_config_overrides: Option<serde_json::Value>,

    /// Sparse config observed from the cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_config: Option<serde_json::Value>,
}

/// How the operator treats the component it manages.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ManagementState {
    /// The operator keeps the component in the desired state.
    #[default]
    Managed,
    /// The operator leaves the component alone.
    Unmanaged,
    /// The component should be removed. Not acted upon.
    Removed,
    /// Like `Managed`, used to push through upgrades.
    Force,
}

impl ManagementState {
    /// Whether a sync pass should apply manifests in this state.
    pub fn is_managed(self) -> bool {
        matches!(self, ManagementState::Managed | ManagementState::Force)
    }
}

impl fmt::Display for ManagementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagementState::Managed => write!(f, "Managed"),
            ManagementState::Unmanaged => write!(f, "Unmanaged"),
            ManagementState::Removed => write!(f, "Removed"),
            ManagementState::Force => write!(f, "Force"),
        }
    }
}

impl FromStr for ManagementState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Managed" => Ok(ManagementState::Managed),
            "Unmanaged" => Ok(ManagementState::Unmanaged),
            "Removed" => Ok(ManagementState::Removed),
            "Force" => Ok(ManagementState::Force),
            other => Err(format!("unknown management state {other:?}")),
        }
    }
}

/// Verbosity shared by `logLevel` and `operatorLogLevel`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum LogLevel {
    #[default]
    Normal,
    Debug,
    Trace,
    TraceAll,
}

impl LogLevel {
    /// Verbosity passed to the LeaderWorkerSet controller as `--zap-log-level`.
    pub fn zap_level(level: Option<LogLevel>) -> u8 {
        match level {
            Some(LogLevel::Debug) => 4,
            Some(LogLevel::Trace) => 6,
            Some(LogLevel::TraceAll) => 9,
            Some(LogLevel::Normal) | None => 2,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Normal => write!(f, "Normal"),
            LogLevel::Debug => write!(f, "Debug"),
            LogLevel::Trace => write!(f, "Trace"),
            LogLevel::TraceAll => write!(f, "TraceAll"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(LogLevel::Normal),
            "Debug" => Ok(LogLevel::Debug),
            "Trace" => Ok(LogLevel::Trace),
            "TraceAll" => Ok(LogLevel::TraceAll),
            other => Err(format!("unknown log level {other:?}")),
        }
    }
}

// The API allows "" for both enums; treat it, and anything unknown, as unset.
fn lenient_log_level<'de, D>(deserializer: D) -> Result<Option<LogLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

fn lenient_management_state<'de, D>(deserializer: D) -> Result<ManagementState, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()).unwrap_or_default())
}

/// Observed state of the LeaderWorkerSet operator.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderWorkerSetOperatorStatus {
    /// The generation most recently observed by the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Conditions describing the operator state.
    #[serde(default)]
    pub conditions: Vec<OperatorCondition>,

    /// Level the operator is at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Number of ready replicas of the LeaderWorkerSet controller.
    #[serde(default)]
    pub ready_replicas: i32,

    /// Newest revision that is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_available_revision: Option<i32>,

    /// Generations of managed workloads, used to detect out-of-band edits.
    #[serde(default)]
    pub generations: Vec<GenerationStatus>,
}

/// A single operator condition, as published on OpenShift operator resources.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorCondition {
    /// Type of condition, e.g. `Available`.
    pub r#type: String,
    /// "True", "False" or "Unknown".
    pub status: String,
    /// Last time the status flipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    /// Machine-readable reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperatorCondition {
    /// Create a condition stamped with the current time.
    pub fn new(condition_type: &str, status: bool, reason: &str, message: &str) -> Self {
        Self {
            r#type: condition_type.to_string(),
            status: if status {
                CONDITION_TRUE.to_string()
            } else {
                CONDITION_FALSE.to_string()
            },
            last_transition_time: Some(now_rfc3339()),
            reason: Some(reason.to_string()),
            message: if message.is_empty() {
                None
            } else {
                Some(message.to_string())
            },
        }
    }

    /// Create an `Available` condition.
    pub fn available(available: bool, reason: &str, message: &str) -> Self {
        Self::new(ConditionType::Available.as_str(), available, reason, message)
    }

    /// Create a `Progressing` condition.
    pub fn progressing(progressing: bool, reason: &str, message: &str) -> Self {
        Self::new(ConditionType::Progressing.as_str(), progressing, reason, message)
    }

    /// Create the sync controller's `Degraded` condition.
    pub fn degraded(degraded: bool, reason: &str, message: &str) -> Self {
        Self::new(
            ConditionType::TargetConfigControllerDegraded.as_str(),
            degraded,
            reason,
            message,
        )
    }

    /// Whether the status is "True".
    pub fn is_true(&self) -> bool {
        self.status == CONDITION_TRUE
    }
}

/// "True" condition status.
pub const CONDITION_TRUE: &str = "True";
/// "False" condition status.
pub const CONDITION_FALSE: &str = "False";

/// Condition types published by the operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConditionType {
    /// The LeaderWorkerSet controller is running and serving.
    Available,
    /// A rollout of the LeaderWorkerSet controller is in flight.
    Progressing,
    /// The last sync pass failed.
    TargetConfigControllerDegraded,
}

impl ConditionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::Available => "Available",
            ConditionType::Progressing => "Progressing",
            ConditionType::TargetConfigControllerDegraded => "TargetConfigControllerDegraded",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation of a managed workload at the time it was last applied.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub group: String,
    pub resource: String,
    pub namespace: String,
    pub name: String,
    pub last_generation: i64,
    #[serde(default)]
    pub hash: String,
}

/// Current time in the RFC 3339 form the API server stores for conditions.
pub fn now_rfc3339() -> String {
    jiff::Timestamp::now()
        .strftime("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}
