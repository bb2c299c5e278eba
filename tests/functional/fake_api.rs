//! In-process API server for driving `reconcile` without a cluster.
//!
//! Requests go through a `tower_test` mock service. GETs answer from a fixed
//! set of live objects or 404; writes echo the request body back.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use http::{Method, Request, Response, StatusCode};
use kube::Client;
use kube::client::Body;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tower_test::mock;

use lws_operator::crd::LeaderWorkerSetOperator;

use crate::common::TEST_NAMESPACE;

const APPLY_CONTENT_TYPE: &str = "application/apply-patch+yaml";
const MERGE_CONTENT_TYPE: &str = "application/merge-patch+json";

/// One request as the fake API server saw it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub content_type: Option<String>,
    pub body: Value,
}

impl Recorded {
    /// A server-side apply.
    pub fn is_apply(&self) -> bool {
        self.method == Method::PATCH && self.content_type.as_deref() == Some(APPLY_CONTENT_TYPE)
    }

    pub fn is_status_patch(&self) -> bool {
        self.method == Method::PATCH && self.path.ends_with("/status")
    }

    pub fn is_merge_patch(&self) -> bool {
        self.content_type.as_deref() == Some(MERGE_CONTENT_TYPE)
    }

    pub fn is_event(&self) -> bool {
        self.method == Method::POST && self.path.ends_with("/events")
    }

    /// Plural resource name, e.g. `clusterroles`, for object paths.
    pub fn resource(&self) -> &str {
        let mut segments = self.path.rsplit('/');
        segments.next();
        segments.next().unwrap_or_default()
    }
}

/// Requests seen by one fake server, in arrival order.
#[derive(Debug, Default)]
pub struct Requests(pub Vec<Recorded>);

impl Requests {
    pub fn applies(&self) -> Vec<&Recorded> {
        self.0.iter().filter(|r| r.is_apply()).collect()
    }

    pub fn status_patches(&self) -> Vec<&Recorded> {
        self.0.iter().filter(|r| r.is_status_patch()).collect()
    }

    pub fn event_reasons(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|r| r.is_event())
            .filter_map(|r| r.body["reason"].as_str().map(str::to_string))
            .collect()
    }

    pub fn position(&self, predicate: impl Fn(&Recorded) -> bool) -> Option<usize> {
        self.0.iter().position(predicate)
    }
}

/// Fake API server state: live objects by path and paths that fail.
pub struct FakeApiServer {
    operator: Value,
    live: HashMap<String, Value>,
    forbidden: HashSet<String>,
}

impl FakeApiServer {
    /// Server whose status writes return `operator` with the patched status.
    pub fn new(operator: &LeaderWorkerSetOperator) -> Self {
        Self {
            operator: serde_json::to_value(operator).unwrap(),
            live: HashMap::new(),
            forbidden: HashSet::new(),
        }
    }

    /// Serve `object` for GETs of `path`.
    pub fn with_object(mut self, path: impl Into<String>, object: Value) -> Self {
        self.live.insert(path.into(), object);
        self
    }

    /// Answer every request to `path` with 403.
    pub fn forbidding(mut self, path: impl Into<String>) -> Self {
        self.forbidden.insert(path.into());
        self
    }

    /// Start serving; the returned handle yields every request once the client is gone.
    pub fn start(self) -> (Client, JoinHandle<Requests>) {
        let (service, mut handle) = mock::pair::<Request<Body>, Response<Body>>();
        let server = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some((request, send)) = handle.next_request().await {
                let recorded = record(request).await;
                let (status, body) = self.respond(&recorded);
                send.send_response(
                    Response::builder()
                        .status(status)
                        .header("content-type", "application/json")
                        .body(Body::from(serde_json::to_vec(&body).unwrap()))
                        .unwrap(),
                );
                seen.push(recorded);
            }
            Requests(seen)
        });
        (Client::new(service, TEST_NAMESPACE), server)
    }

    fn respond(&self, request: &Recorded) -> (StatusCode, Value) {
        if self.forbidden.contains(&request.path) {
            return (StatusCode::FORBIDDEN, failure(403, "Forbidden", &request.path));
        }
        if request.is_status_patch() {
            let mut operator = self.operator.clone();
            operator["status"] = request.body["status"].clone();
            return (StatusCode::OK, operator);
        }
        match request.method {
            Method::GET => match self.live.get(&request.path) {
                Some(object) => (StatusCode::OK, object.clone()),
                None => (StatusCode::NOT_FOUND, failure(404, "NotFound", &request.path)),
            },
            Method::PATCH if request.is_apply() => {
                let mut object = request.body.clone();
                object["metadata"]["resourceVersion"] = json!("1");
                (StatusCode::OK, object)
            }
            Method::POST => (StatusCode::CREATED, request.body.clone()),
            _ => (StatusCode::OK, request.body.clone()),
        }
    }
}

/// Wait for the server to drain after the last client handle was dropped.
pub async fn finish(server: JoinHandle<Requests>) -> Requests {
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("client handles still alive")
        .unwrap()
}

async fn record(request: Request<Body>) -> Recorded {
    let (parts, body) = request.into_parts();
    let bytes = body.collect_bytes().await.unwrap();
    Recorded {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().unwrap_or_default().to_string(),
        content_type: parts
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
    }
}

fn failure(code: u16, reason: &str, path: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": format!("{path}: {reason}"),
        "reason": reason,
        "code": code,
    })
}
