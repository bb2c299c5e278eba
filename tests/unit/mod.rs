// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Unit tests for lws-operator.
//!
//! These tests run without a Kubernetes cluster and test individual
//! components in isolation.

#[path = "../common/mod.rs"]
mod common;

mod crd_tests {
    use kube::CustomResourceExt;
    use lws_operator::crd::{
        LeaderWorkerSetOperator, LeaderWorkerSetOperatorSpec, LogLevel, ManagementState,
        OperatorCondition,
    };

    #[test]
    fn test_crd_identity() {
        let crd = LeaderWorkerSetOperator::crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("leaderworkersetoperators.operator.openshift.io")
        );
        assert_eq!(crd.spec.scope, "Cluster");
        assert_eq!(crd.spec.names.kind, "LeaderWorkerSetOperator");
    }

    #[test]
    fn test_spec_from_yaml() {
        let spec: LeaderWorkerSetOperatorSpec = serde_yaml::from_str(
            "managementState: Managed\nlogLevel: Debug\noperatorLogLevel: TraceAll\n",
        )
        .unwrap();
        assert_eq!(spec.management_state, ManagementState::Managed);
        assert_eq!(spec.log_level, Some(LogLevel::Debug));
        assert_eq!(spec.operator_log_level, Some(LogLevel::TraceAll));
    }

    #[test]
    fn test_empty_spec_defaults() {
        let spec: LeaderWorkerSetOperatorSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.management_state, ManagementState::Managed);
        assert_eq!(spec.log_level, None);
        assert_eq!(spec.operator_log_level, None);
    }

    #[test]
    fn test_empty_strings_are_unset() {
        let spec: LeaderWorkerSetOperatorSpec =
            serde_json::from_str(r#"{"managementState":"","logLevel":"","operatorLogLevel":"Loud"}"#)
                .unwrap();
        assert_eq!(spec.management_state, ManagementState::Managed);
        assert_eq!(spec.log_level, None);
        assert_eq!(spec.operator_log_level, None);
    }

    #[test]
    fn test_spec_serializes_camel_case() {
        let spec = LeaderWorkerSetOperatorSpec {
            log_level: Some(LogLevel::Trace),
            ..Default::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["managementState"], "Managed");
        assert_eq!(json["logLevel"], "Trace");
        assert!(json.get("operatorLogLevel").is_none());
    }

    #[test]
    fn test_zap_levels() {
        assert_eq!(LogLevel::zap_level(None), 2);
        assert_eq!(LogLevel::zap_level(Some(LogLevel::Normal)), 2);
        assert_eq!(LogLevel::zap_level(Some(LogLevel::Debug)), 4);
        assert_eq!(LogLevel::zap_level(Some(LogLevel::Trace)), 6);
        assert_eq!(LogLevel::zap_level(Some(LogLevel::TraceAll)), 9);
    }

    #[test]
    fn test_management_state_is_managed() {
        assert!(ManagementState::Managed.is_managed());
        assert!(ManagementState::Force.is_managed());
        assert!(!ManagementState::Unmanaged.is_managed());
        assert!(!ManagementState::Removed.is_managed());
    }

    #[test]
    fn test_condition_constructors() {
        let available = OperatorCondition::available(true, "AsExpected", "");
        assert_eq!(available.r#type, "Available");
        assert_eq!(available.status, "True");
        assert_eq!(available.message, None);
        assert!(available.last_transition_time.is_some());

        let degraded = OperatorCondition::degraded(true, "SyncError", "boom");
        assert_eq!(degraded.r#type, "TargetConfigControllerDegraded");
        assert_eq!(degraded.message.as_deref(), Some("boom"));

        assert!(!OperatorCondition::progressing(false, "AsExpected", "").is_true());
    }
}

mod manifest_tests {
    use k8s_openapi::api::core::v1::Service;
    use lws_operator::manifests::{self, ASSETS};

    #[test]
    fn test_asset_table_is_complete() {
        assert_eq!(ASSETS.len(), 23);
        for (path, content) in ASSETS {
            assert!(!content.trim().is_empty(), "{path} is empty");
        }
    }

    #[test]
    fn test_templates_target_default_namespace() {
        let svc: Service = manifests::read(manifests::SERVICE_METRICS).unwrap();
        assert_eq!(svc.metadata.namespace.as_deref(), Some("lws-system"));
    }

    #[test]
    fn test_deployment_template_uses_placeholder() {
        let raw = manifests::asset(manifests::DEPLOYMENT).unwrap();
        assert!(raw.contains("${CONTROLLER_IMAGE}"));
    }
}

mod config_tests {
    use std::collections::HashMap;

    use lws_operator::OperatorConfig;
    use lws_operator::config::{ConfigError, DEFAULT_OPERAND_NAMESPACE};

    fn config(vars: &[(&str, &str)]) -> Result<OperatorConfig, ConfigError> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        OperatorConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn test_pod_namespace_fallback() {
        let cfg = config(&[("POD_NAMESPACE", "lws-operator")]).unwrap();
        assert_eq!(cfg.namespace, "lws-operator");
    }

    #[test]
    fn test_out_of_cluster_namespace_is_replaced() {
        let cfg = config(&[("OPERATOR_NAMESPACE", "openshift-config-managed")]).unwrap();
        assert_eq!(cfg.namespace, DEFAULT_OPERAND_NAMESPACE);
    }

    #[test]
    fn test_invalid_health_port() {
        let err = config(&[("HEALTH_PORT", "http")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "HEALTH_PORT",
                value: "http".to_string()
            }
        );
    }
}

mod error_tests {
    use std::time::Duration;

    use lws_operator::controller::error::Error;

    #[test]
    fn test_error_display() {
        let err = Error::MissingField("deployment spec".to_string());
        assert!(err.to_string().contains("deployment spec"));
    }

    #[test]
    fn test_unknown_asset_is_not_retried_quickly() {
        let err = Error::UnknownAsset("x.yaml".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.requeue_after(), Duration::from_secs(300));
    }

    #[test]
    fn test_transient_is_retryable() {
        let err = Error::Transient("etcd leader changed".to_string());
        assert!(err.is_retryable());
        assert_eq!(err.requeue_after(), Duration::from_secs(30));
    }
}

mod fixture_tests {
    use super::common::OperatorBuilder;
    use lws_operator::crd::{LogLevel, ManagementState};

    #[test]
    fn test_builder_defaults() {
        let op = OperatorBuilder::new().build();
        assert_eq!(op.metadata.name.as_deref(), Some("cluster"));
        assert_eq!(op.spec.management_state, ManagementState::Managed);
        assert!(op.status.is_none());
    }

    #[test]
    fn test_builder_with_options() {
        let op = OperatorBuilder::named("other")
            .log_level(LogLevel::Debug)
            .management_state(ManagementState::Removed)
            .generation(7)
            .build();
        assert_eq!(op.metadata.name.as_deref(), Some("other"));
        assert_eq!(op.spec.log_level, Some(LogLevel::Debug));
        assert_eq!(op.metadata.generation, Some(7));
    }
}
