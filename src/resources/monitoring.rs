//! Prometheus Operator ServiceMonitor for the controller metrics endpoint.
//!
//! The monitoring CRDs ship with the cluster monitoring stack, so the object
//! is handled as a [`DynamicObject`] rather than a typed binding.

use kube::api::{ApiResource, DynamicObject, GroupVersionKind};

use crate::controller::error::Result;
use crate::manifests;

use super::METRICS_SERVICE_NAME;
use super::common::Target;

/// API resource for `monitoring.coreos.com/v1` ServiceMonitor.
pub fn service_monitor_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind {
        group: "monitoring.coreos.com".to_string(),
        version: "v1".to_string(),
        kind: "ServiceMonitor".to_string(),
    })
}

pub fn service_monitor(target: &Target) -> Result<DynamicObject> {
    let mut required = manifests::read_dynamic(manifests::SERVICE_MONITOR)?;
    target.own_namespaced(&mut required.metadata);

    let server_name = format!("{}.{}.svc", METRICS_SERVICE_NAME, target.namespace);
    if let Some(endpoints) = required
        .data
        .pointer_mut("/spec/endpoints")
        .and_then(|e| e.as_array_mut())
    {
        for endpoint in endpoints {
            if let Some(tls) = endpoint
                .pointer_mut("/tlsConfig")
                .and_then(|t| t.as_object_mut())
            {
                tls.insert(
                    "serverName".to_string(),
                    serde_json::Value::String(server_name.clone()),
                );
            }
        }
    }

    Ok(required)
}
