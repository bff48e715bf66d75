//! Metrics sources that need no API server round trip

use super::{async_trait, parse_cpu_quantity, CollectorError, MetricsSource};
use crate::models::Machine;
use std::collections::HashMap;
use std::time::Duration;

/// Node annotation carrying current CPU usage as a quantity
pub const CPU_USAGE_ANNOTATION: &str = "cpu-usage";

/// Reads CPU usage from the `cpu-usage` node annotation
///
/// Useful on clusters without metrics-server, where an external agent
/// publishes usage next to the renewable telemetry.
#[derive(Debug, Clone, Default)]
pub struct AnnotationSource;

#[async_trait]
impl MetricsSource for AnnotationSource {
    async fn cpu_usage_cores(&self, machine: &Machine) -> Result<f64, CollectorError> {
        let raw = machine
            .annotation(CPU_USAGE_ANNOTATION)
            .ok_or_else(|| CollectorError::MissingUsage {
                node: machine.name.clone(),
            })?;

        parse_cpu_quantity(raw).ok_or_else(|| CollectorError::MalformedQuantity {
            node: machine.name.clone(),
            field: "cpu usage",
            value: raw.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "annotation"
    }
}

/// Fixed usage snapshot, keyed by node name
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    usage: HashMap<String, f64>,
    latency: Option<Duration>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_usage(mut self, node: impl Into<String>, cores: f64) -> Self {
        self.usage.insert(node.into(), cores);
        self
    }

    /// Delay every answer, to exercise timeouts
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl MetricsSource for StaticSource {
    async fn cpu_usage_cores(&self, machine: &Machine) -> Result<f64, CollectorError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.usage
            .get(&machine.name)
            .copied()
            .ok_or_else(|| CollectorError::Unavailable {
                node: machine.name.clone(),
                message: "node not present in snapshot".to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
