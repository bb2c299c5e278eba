//! Operator configuration, read once from the environment at startup.

use thiserror::Error;

/// Target operand image, as published in the operator's CSV.
pub const OPERAND_IMAGE_ENV: &str = "RELATED_IMAGE_OPERAND_IMAGE";

/// Namespace the operand is installed into.
pub const DEFAULT_OPERAND_NAMESPACE: &str = "openshift-lws-operator";

/// Namespace reported when the operator runs outside a cluster; never a valid operand home.
const OUT_OF_CLUSTER_NAMESPACE: &str = "openshift-config-managed";

/// Default port for `/healthz`, `/readyz` and `/metrics`.
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Error reading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Startup configuration for the operator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Image of the LeaderWorkerSet controller; the template placeholder is kept when unset.
    pub operand_image: Option<String>,
    /// Namespace holding the operand and the leader election lease.
    pub namespace: String,
    /// Leader election identity.
    pub pod_name: Option<String>,
    pub health_port: u16,
}

impl OperatorConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let namespace = non_empty("OPERATOR_NAMESPACE")
            .or_else(|| non_empty("POD_NAMESPACE"))
            .filter(|ns| ns != OUT_OF_CLUSTER_NAMESPACE)
            .unwrap_or_else(|| DEFAULT_OPERAND_NAMESPACE.to_string());

        let health_port = match non_empty("HEALTH_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "HEALTH_PORT",
                value: raw,
            })?,
            None => DEFAULT_HEALTH_PORT,
        };

        Ok(Self {
            operand_image: non_empty(OPERAND_IMAGE_ENV),
            namespace,
            pod_name: non_empty("POD_NAME"),
            health_port,
        })
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            operand_image: None,
            namespace: DEFAULT_OPERAND_NAMESPACE.to_string(),
            pod_name: None,
            health_port: DEFAULT_HEALTH_PORT,
        }
    }
}
