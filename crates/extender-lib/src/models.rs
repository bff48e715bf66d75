//! Core data models for the extender
//!
//! Wire types follow the kube-scheduler extender v1 JSON contract. Node and
//! pod objects are kept as close to the API server's representation as
//! possible so that filter results can echo nodes back without losing
//! fields the extender does not understand.

use k8s_openapi::api::core::v1::{NodeSpec, NodeStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A cluster node as sent by the scheduler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<NodeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    /// Fields outside metadata/spec/status (apiVersion, kind)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

/// A pending pod as sent by the scheduler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeList {
    #[serde(default)]
    pub items: Vec<Node>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeList {
    pub fn new(items: Vec<Node>) -> Self {
        Self {
            items,
            extra: Map::new(),
        }
    }
}

/// Arguments of a filter or prioritize call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtenderArgs {
    #[serde(default)]
    pub pod: Option<Pod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<NodeList>,
    /// Populated instead of `nodes` when the scheduler is node-cache capable
    #[serde(default, rename = "nodenames", skip_serializing_if = "Option::is_none")]
    pub node_names: Option<Vec<String>>,
}

/// Result of a filter call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtenderFilterResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<NodeList>,
    #[serde(default, rename = "nodenames", skip_serializing_if = "Option::is_none")]
    pub node_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failed_nodes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failed_and_unresolvable_nodes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl ExtenderFilterResult {
    pub fn from_error(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Default::default()
        }
    }
}

/// Score of one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPriority {
    pub host: String,
    pub score: i64,
}

pub type HostPriorityList = Vec<HostPriority>;

/// Workload being placed; only used for log context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
    pub name: String,
    pub namespace: String,
}

impl Workload {
    pub fn from_pod(pod: Option<&Pod>) -> Self {
        let metadata = pod.map(|p| &p.metadata);
        Self {
            name: metadata
                .and_then(|m| m.name.clone())
                .unwrap_or_default(),
            namespace: metadata
                .and_then(|m| m.namespace.clone())
                .unwrap_or_else(|| "default".to_string()),
        }
    }
}

/// Scoring view of a candidate node
///
/// Built fresh from each request's node list and dropped with the response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Machine {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Raw `status.allocatable.cpu` quantity
    pub allocatable_cpu: Option<String>,
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_allocatable_cpu(mut self, quantity: impl Into<String>) -> Self {
        self.allocatable_cpu = Some(quantity.into());
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

impl From<&Node> for Machine {
    fn from(node: &Node) -> Self {
        let allocatable_cpu = node
            .status
            .as_ref()
            .and_then(|s| s.allocatable.as_ref())
            .and_then(|a| a.get("cpu"))
            .map(|q| q.0.clone());

        Self {
            name: node.name().to_string(),
            labels: node.metadata.labels.clone().unwrap_or_default(),
            annotations: node.metadata.annotations.clone().unwrap_or_default(),
            allocatable_cpu,
        }
    }
}

/// Final score for one machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineScore {
    pub name: String,
    pub score: i64,
}

impl From<MachineScore> for HostPriority {
    fn from(score: MachineScore) -> Self {
        HostPriority {
            host: score.name,
            score: score.score,
        }
    }
}
