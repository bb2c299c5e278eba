//! Full reconcile passes against the fake API server.
//!
//! These drive `reconcile` itself, so they see the requests a sync pass
//! actually issues: which objects are applied, in what order, the events
//! published and the status write.

use std::sync::Arc;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};
use kube::runtime::controller::Action;
use lws_operator::OperatorConfig;
use lws_operator::controller::context::Context;
use lws_operator::controller::reconciler::{
    NOT_AVAILABLE_REQUEUE, RESYNC_INTERVAL, reconcile, skipped_status,
};
use lws_operator::controller::status::{is_condition_true, set_deployment_generation};
use lws_operator::crd::{LeaderWorkerSetOperator, LeaderWorkerSetOperatorStatus, ManagementState};
use lws_operator::resources::DEPLOYMENT_NAME;
use lws_operator::resources::leaderworkerset_crd::LEADERWORKERSET_CRD_NAME;
use serde_json::Value;

use crate::common::{OperatorBuilder, TEST_NAMESPACE, ready_deployment};
use crate::fake_api::{FakeApiServer, Requests, finish};

const OPERATOR_STATUS_PATH: &str =
    "/apis/operator.openshift.io/v1/leaderworkersetoperators/cluster/status";

/// Plural resource of every applied object, in sync order.
const APPLY_ORDER: [&str; 22] = [
    "clusterroles",
    "clusterroles",
    "clusterroles",
    "clusterrolebindings",
    "clusterrolebindings",
    "clusterrolebindings",
    "roles",
    "roles",
    "rolebindings",
    "rolebindings",
    "configmaps",
    "customresourcedefinitions",
    "serviceaccounts",
    "services",
    "services",
    "mutatingwebhookconfigurations",
    "validatingwebhookconfigurations",
    "servicemonitors",
    "issuers",
    "certificates",
    "certificates",
    "deployments",
];

fn deployment_path() -> String {
    format!("/apis/apps/v1/namespaces/{TEST_NAMESPACE}/deployments/{DEPLOYMENT_NAME}")
}

fn crd_path() -> String {
    format!("/apis/apiextensions.k8s.io/v1/customresourcedefinitions/{LEADERWORKERSET_CRD_NAME}")
}

fn config() -> OperatorConfig {
    OperatorConfig {
        operand_image: Some("registry.example.com/lws:v0.6.0".to_string()),
        namespace: TEST_NAMESPACE.to_string(),
        ..Default::default()
    }
}

/// Run one reconcile against `server` and collect what it sent.
async fn run(
    server: FakeApiServer,
    op: LeaderWorkerSetOperator,
) -> (lws_operator::controller::error::Result<Action>, Requests) {
    let (client, handle) = server.start();
    let ctx = Arc::new(Context::new(client, config(), None, None));
    let result = reconcile(Arc::new(op), ctx).await;
    (result, finish(handle).await)
}

fn manager_container(env: Option<Vec<EnvVar>>) -> Container {
    Container {
        name: "manager".to_string(),
        image: Some("registry.example.com/lws:v0.6.0".to_string()),
        env,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_other_names_are_ignored() {
    let op = OperatorBuilder::named("not-cluster").build();
    let (result, requests) = run(FakeApiServer::new(&op), op).await;

    assert_eq!(result.unwrap(), Action::await_change());
    assert!(requests.0.is_empty(), "unexpected requests: {:?}", requests.0);
}

#[tokio::test]
async fn test_fresh_install_applies_in_order() {
    let op = OperatorBuilder::new().build();
    let (result, requests) = run(FakeApiServer::new(&op), op).await;

    // Nothing is running yet, so the pass asks to be requeued soon
    assert_eq!(result.unwrap(), Action::requeue(NOT_AVAILABLE_REQUEUE));

    let applies = requests.applies();
    let kinds: Vec<&str> = applies.iter().map(|r| r.resource()).collect();
    assert_eq!(kinds, APPLY_ORDER);

    for apply in &applies {
        assert!(apply.query.contains("fieldManager=lws-operator"), "{}", apply.query);
        assert!(apply.query.contains("force=true"), "{}", apply.query);
        let cluster_scoped = matches!(
            apply.resource(),
            "clusterroles"
                | "clusterrolebindings"
                | "customresourcedefinitions"
                | "mutatingwebhookconfigurations"
                | "validatingwebhookconfigurations"
        );
        assert_eq!(
            apply.path.contains(&format!("/namespaces/{TEST_NAMESPACE}/")),
            !cluster_scoped,
            "{}",
            apply.path
        );
    }

    let deployment = applies.last().unwrap();
    assert_eq!(
        deployment.body["spec"]["template"]["spec"]["containers"][0]["image"],
        "registry.example.com/lws:v0.6.0"
    );
}

#[tokio::test]
async fn test_created_objects_are_announced() {
    let op = OperatorBuilder::new().build();
    let (_, requests) = run(FakeApiServer::new(&op), op).await;

    let reasons = requests.event_reasons();
    assert_eq!(reasons.len(), APPLY_ORDER.len());
    assert!(reasons.iter().all(|r| r.ends_with("Created")), "{reasons:?}");
    assert_eq!(reasons.first().map(String::as_str), Some("ClusterRoleCreated"));
    assert_eq!(reasons.last().map(String::as_str), Some("DeploymentCreated"));
    assert!(reasons.contains(&"CustomResourceDefinitionCreated".to_string()));
}

#[tokio::test]
async fn test_status_written_as_merge_patch() {
    let op = OperatorBuilder::new().generation(3).build();
    let (_, requests) = run(FakeApiServer::new(&op), op).await;

    let patches = requests.status_patches();
    assert_eq!(patches.len(), 1);
    let patch = patches[0];
    assert_eq!(patch.path, OPERATOR_STATUS_PATH);
    assert!(patch.is_merge_patch());
    assert!(patch.query.contains("fieldManager=lws-operator"));
    assert!(!patch.query.contains("force"));

    let status: LeaderWorkerSetOperatorStatus =
        serde_json::from_value(patch.body["status"].clone()).unwrap();
    assert_eq!(status.observed_generation, Some(3));
    assert!(!is_condition_true(&status.conditions, "Available"));
    assert!(is_condition_true(&status.conditions, "Progressing"));

    // The status write comes after the last apply
    let last_apply = requests
        .position(|r| r.resource() == "deployments" && r.is_apply())
        .unwrap();
    let status_write = requests.position(|r| r.is_status_patch()).unwrap();
    assert!(last_apply < status_write);
}

#[tokio::test]
async fn test_unmanaged_applies_nothing() {
    for state in [ManagementState::Unmanaged, ManagementState::Removed] {
        let op = OperatorBuilder::new().management_state(state).build();
        let (result, requests) = run(FakeApiServer::new(&op), op).await;

        assert_eq!(result.unwrap(), Action::requeue(RESYNC_INTERVAL));
        assert!(requests.applies().is_empty(), "{state}: {:?}", requests.0);
        assert!(requests.event_reasons().is_empty());
        assert_eq!(requests.status_patches().len(), 1);
    }
}

#[tokio::test]
async fn test_unchanged_status_is_not_written() {
    let mut op = OperatorBuilder::new()
        .management_state(ManagementState::Unmanaged)
        .build();
    op.status = Some(skipped_status(&op, ManagementState::Unmanaged));

    let (_, requests) = run(FakeApiServer::new(&op), op).await;
    assert!(requests.0.is_empty(), "unexpected requests: {:?}", requests.0);
}

#[tokio::test]
async fn test_sync_stops_at_first_failure() {
    let op = OperatorBuilder::new().build();
    let server = FakeApiServer::new(&op).forbidding(crd_path());
    let (result, requests) = run(server, op).await;

    assert!(result.is_err());

    // Everything before the CRD went out, nothing after it
    let kinds: Vec<&str> = requests.applies().iter().map(|r| r.resource()).collect();
    assert_eq!(kinds, APPLY_ORDER[..11]);
    assert!(requests.event_reasons().contains(&"SyncFailed".to_string()));

    let patches = requests.status_patches();
    assert_eq!(patches.len(), 1);
    let status: LeaderWorkerSetOperatorStatus =
        serde_json::from_value(patches[0].body["status"].clone()).unwrap();
    assert!(is_condition_true(&status.conditions, "TargetConfigControllerDegraded"));
}

#[tokio::test]
async fn test_drifted_deployment_spec_is_replaced() {
    let mut op = OperatorBuilder::new().build();
    let mut generations = Vec::new();
    set_deployment_generation(&mut generations, &ready_deployment(2));
    op.status = Some(LeaderWorkerSetOperatorStatus {
        generations,
        ..Default::default()
    });

    // Someone ran `kubectl set env`: generation moved and a foreign env entry appeared
    let mut live = ready_deployment(3);
    live.metadata.resource_version = Some("7".to_string());
    live.spec = Some(DeploymentSpec {
        replicas: Some(1),
        template: PodTemplateSpec {
            spec: Some(PodSpec {
                containers: vec![manager_container(Some(vec![EnvVar {
                    name: "FOO".to_string(),
                    value: Some("bar".to_string()),
                    ..Default::default()
                }]))],
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    });

    let server =
        FakeApiServer::new(&op).with_object(deployment_path(), serde_json::to_value(&live).unwrap());
    let (_, requests) = run(server, op).await;

    assert!(
        requests
            .event_reasons()
            .contains(&"DeploymentDriftDetected".to_string())
    );

    let replace = requests
        .position(|r| r.method == http::Method::PUT && r.path == deployment_path())
        .expect("drifted Deployment was not replaced");
    let replaced: Deployment = serde_json::from_value(requests.0[replace].body.clone()).unwrap();
    assert_eq!(replaced.metadata.resource_version.as_deref(), Some("7"));

    let containers = replaced.spec.unwrap().template.spec.unwrap().containers;
    let env_names: Vec<String> = containers
        .iter()
        .flat_map(|c| c.env.iter().flatten())
        .map(|e| e.name.clone())
        .collect();
    assert!(!env_names.contains(&"FOO".to_string()), "{env_names:?}");

    // The forced apply still follows the replace
    let apply = requests
        .position(|r| r.is_apply() && r.path == deployment_path())
        .unwrap();
    assert!(replace < apply);
}

#[tokio::test]
async fn test_recorded_generation_skips_replace() {
    let mut op = OperatorBuilder::new().build();
    let mut generations = Vec::new();
    set_deployment_generation(&mut generations, &ready_deployment(3));
    op.status = Some(LeaderWorkerSetOperatorStatus {
        generations,
        ..Default::default()
    });

    let live: Value = serde_json::to_value(ready_deployment(3)).unwrap();
    let server = FakeApiServer::new(&op).with_object(deployment_path(), live);
    let (_, requests) = run(server, op).await;

    assert!(requests.position(|r| r.method == http::Method::PUT).is_none());
    assert!(
        !requests
            .event_reasons()
            .contains(&"DeploymentDriftDetected".to_string())
    );
}
