//! metrics.k8s.io backed usage source
//!
//! Reads `NodeMetrics` objects from the resource metrics API served by
//! metrics-server. The API has no typed bindings in k8s-openapi, so the
//! object is fetched dynamically and `usage.cpu` is read from its payload.

use super::{async_trait, parse_cpu_quantity, CollectorError, MetricsSource};
use crate::models::Machine;
use anyhow::{Context, Result};
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use serde_json::Value;

const METRICS_GROUP: &str = "metrics.k8s.io";
const METRICS_VERSION: &str = "v1beta1";
const NODE_METRICS_KIND: &str = "NodeMetrics";
const NODE_METRICS_PLURAL: &str = "nodes";

/// Usage source querying metrics-server through the Kubernetes API
#[derive(Clone)]
pub struct MetricsServerSource {
    api: Api<DynamicObject>,
}

impl MetricsServerSource {
    pub fn new(client: Client) -> Self {
        let gvk = GroupVersionKind::gvk(METRICS_GROUP, METRICS_VERSION, NODE_METRICS_KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, NODE_METRICS_PLURAL);
        Self {
            api: Api::all_with(client, &resource),
        }
    }

    /// Connect with in-cluster configuration, falling back to the local kubeconfig
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client for metrics.k8s.io")?;
        Ok(Self::new(client))
    }

    /// Extract `usage.cpu` from a NodeMetrics payload
    pub fn usage_from_payload(node: &str, payload: &Value) -> Result<f64, CollectorError> {
        let raw = payload
            .get("usage")
            .and_then(|usage| usage.get("cpu"))
            .and_then(Value::as_str)
            .ok_or_else(|| CollectorError::MissingUsage {
                node: node.to_string(),
            })?;

        parse_cpu_quantity(raw).ok_or_else(|| CollectorError::MalformedQuantity {
            node: node.to_string(),
            field: "cpu usage",
            value: raw.to_string(),
        })
    }
}

#[async_trait]
impl MetricsSource for MetricsServerSource {
    async fn cpu_usage_cores(&self, machine: &Machine) -> Result<f64, CollectorError> {
        let metrics = self
            .api
            .get(&machine.name)
            .await
            .map_err(|e| CollectorError::Unavailable {
                node: machine.name.clone(),
                message: e.to_string(),
            })?;

        Self::usage_from_payload(&machine.name, &metrics.data)
    }

    fn name(&self) -> &'static str {
        "metrics-server"
    }
}
