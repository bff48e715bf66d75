//! Node CPU utilization collection
//!
//! Utilization is current CPU usage divided by allocatable CPU. Usage comes
//! from a [`MetricsSource`]; allocatable capacity comes from the node
//! object in the scheduler request. Unlike telemetry, any failure here is
//! fatal for the request: excess cannot be computed without real load.

mod metrics_server;
mod quantity;
mod sources;


pub use metrics_server::MetricsServerSource;
pub use quantity::parse_cpu_quantity;
pub use sources::{AnnotationSource, StaticSource, CPU_USAGE_ANNOTATION};

use crate::models::Machine;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

pub use async_trait::async_trait;

/// Default per-call timeout for the metrics source
pub const DEFAULT_METRICS_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors that abort a scoring request
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("metrics source unavailable for node {node}: {message}")]
    Unavailable { node: String, message: String },

    #[error("metrics query for node {node} timed out after {timeout:?}")]
    Timeout { node: String, timeout: Duration },

    #[error("no CPU usage reported for node {node}")]
    MissingUsage { node: String },

    #[error("node {node} has malformed {field} quantity '{value}'")]
    MalformedQuantity {
        node: String,
        field: &'static str,
        value: String,
    },

    #[error("node {node} reports no allocatable CPU")]
    MissingAllocatable { node: String },
}

impl CollectorError {
    pub fn node(&self) -> &str {
        match self {
            CollectorError::Unavailable { node, .. }
            | CollectorError::Timeout { node, .. }
            | CollectorError::MissingUsage { node }
            | CollectorError::MalformedQuantity { node, .. }
            | CollectorError::MissingAllocatable { node } => node,
        }
    }
}

/// Source of current CPU usage per node
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Current CPU usage of the node in cores
    async fn cpu_usage_cores(&self, machine: &Machine) -> Result<f64, CollectorError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Utilization of one node with the inputs it was derived from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuUtilization {
    pub usage_cores: f64,
    pub allocatable_cores: f64,
    /// usage / allocatable, not clamped: usage can transiently exceed allocatable
    pub fraction: f64,
}

/// Collects utilization for every candidate node of a request
#[derive(Clone)]
pub struct UtilizationCollector {
    source: Arc<dyn MetricsSource>,
    timeout: Duration,
}

impl UtilizationCollector {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self {
            source,
            timeout: DEFAULT_METRICS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Utilization of a single node
    pub async fn utilization(&self, machine: &Machine) -> Result<CpuUtilization, CollectorError> {
        let allocatable_cores = allocatable_cores(machine)?;

        let usage_cores = tokio::time::timeout(self.timeout, self.source.cpu_usage_cores(machine))
            .await
            .map_err(|_| CollectorError::Timeout {
                node: machine.name.clone(),
                timeout: self.timeout,
            })??;

        Ok(CpuUtilization {
            usage_cores,
            allocatable_cores,
            fraction: usage_cores / allocatable_cores,
        })
    }

    /// Utilization of every node, in input order; the first failure aborts
    pub async fn collect(
        &self,
        machines: &[Machine],
    ) -> Result<Vec<CpuUtilization>, CollectorError> {
        let start = Instant::now();
        let mut result = Vec::with_capacity(machines.len());

        for machine in machines {
            let utilization = self.utilization(machine).await?;
            debug!(
                node = %machine.name,
                source = self.source.name(),
                usage_cores = utilization.usage_cores,
                allocatable_cores = utilization.allocatable_cores,
                utilization = utilization.fraction,
                "Collected CPU utilization"
            );
            result.push(utilization);
        }

        debug!(
            nodes = machines.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Utilization collection finished"
        );
        Ok(result)
    }
}

fn allocatable_cores(machine: &Machine) -> Result<f64, CollectorError> {
    let raw = machine
        .allocatable_cpu
        .as_deref()
        .ok_or_else(|| CollectorError::MissingAllocatable {
            node: machine.name.clone(),
        })?;

    match parse_cpu_quantity(raw) {
        Some(cores) if cores > 0.0 => Ok(cores),
        Some(_) => Err(CollectorError::MissingAllocatable {
            node: machine.name.clone(),
        }),
        None => Err(CollectorError::MalformedQuantity {
            node: machine.name.clone(),
            field: "allocatable cpu",
            value: raw.to_string(),
        }),
    }
}
