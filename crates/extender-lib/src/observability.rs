//! Observability infrastructure for the extender
//!
//! Provides:
//! - Prometheus metrics (endpoint latency, metrics-source latency, degraded telemetry, errors)
//! - Structured JSON logging with tracing

use crate::telemetry::TelemetryIssue;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Endpoint labels
pub mod endpoints {
    pub const FILTER: &str = "filter";
    pub const PRIORITIZE: &str = "prioritize";
}

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ExtenderMetricsInner> = OnceLock::new();

struct ExtenderMetricsInner {
    filter_latency_seconds: Histogram,
    prioritize_latency_seconds: Histogram,
    metrics_fetch_latency_seconds: Histogram,
    requests_total: IntCounterVec,
    decode_errors_total: IntCounterVec,
    telemetry_degraded_total: IntCounter,
    metrics_fetch_errors_total: IntCounter,
    nodes_filtered_out_total: IntCounter,
    config_info: GaugeVec,
}

impl ExtenderMetricsInner {
    fn new() -> Self {
        Self {
            filter_latency_seconds: register_histogram!(
                "green_extender_filter_latency_seconds",
                "Time spent answering filter calls",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register filter_latency_seconds"),

            prioritize_latency_seconds: register_histogram!(
                "green_extender_prioritize_latency_seconds",
                "Time spent answering prioritize calls",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prioritize_latency_seconds"),

            metrics_fetch_latency_seconds: register_histogram!(
                "green_extender_metrics_fetch_latency_seconds",
                "Time spent collecting node utilization for one request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register metrics_fetch_latency_seconds"),

            requests_total: register_int_counter_vec!(
                "green_extender_requests_total",
                "Extender calls received",
                &["endpoint"]
            )
            .expect("Failed to register requests_total"),

            decode_errors_total: register_int_counter_vec!(
                "green_extender_decode_errors_total",
                "Extender calls whose body could not be decoded",
                &["endpoint"]
            )
            .expect("Failed to register decode_errors_total"),

            telemetry_degraded_total: register_int_counter!(
                "green_extender_telemetry_degraded_total",
                "Nodes scored with degraded renewable telemetry"
            )
            .expect("Failed to register telemetry_degraded_total"),

            metrics_fetch_errors_total: register_int_counter!(
                "green_extender_metrics_fetch_errors_total",
                "Prioritize calls failed because utilization could not be collected"
            )
            .expect("Failed to register metrics_fetch_errors_total"),

            nodes_filtered_out_total: register_int_counter!(
                "green_extender_nodes_filtered_out_total",
                "Nodes rejected by the label filter"
            )
            .expect("Failed to register nodes_filtered_out_total"),

            config_info: register_gauge_vec!(
                "green_extender_config_info",
                "Scoring configuration of this process",
                &["bias", "decay", "windows"]
            )
            .expect("Failed to register config_info"),
        }
    }
}

/// Extender metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ExtenderMetrics {
    _private: (),
}

impl Default for ExtenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtenderMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ExtenderMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ExtenderMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_filter_latency(&self, duration_secs: f64) {
        self.inner().filter_latency_seconds.observe(duration_secs);
    }

    pub fn observe_prioritize_latency(&self, duration_secs: f64) {
        self.inner().prioritize_latency_seconds.observe(duration_secs);
    }

    pub fn observe_metrics_fetch_latency(&self, duration_secs: f64) {
        self.inner().metrics_fetch_latency_seconds.observe(duration_secs);
    }

    pub fn inc_requests(&self, endpoint: &str) {
        self.inner().requests_total.with_label_values(&[endpoint]).inc();
    }

    pub fn inc_decode_errors(&self, endpoint: &str) {
        self.inner()
            .decode_errors_total
            .with_label_values(&[endpoint])
            .inc();
    }

    pub fn inc_telemetry_degraded(&self, nodes: u64) {
        self.inner().telemetry_degraded_total.inc_by(nodes);
    }

    pub fn inc_metrics_fetch_errors(&self) {
        self.inner().metrics_fetch_errors_total.inc();
    }

    pub fn inc_nodes_filtered_out(&self, nodes: u64) {
        self.inner().nodes_filtered_out_total.inc_by(nodes);
    }

    pub fn set_config_info(&self, bias: &str, decay: f64, windows: usize) {
        self.inner().config_info.reset();
        self.inner()
            .config_info
            .with_label_values(&[bias, &decay.to_string(), &windows.to_string()])
            .set(1.0);
    }
}

/// Structured logger for extender events
///
/// Consistent JSON-formatted records for scoring and filtering decisions.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, bias: &str, decay: f64, windows: usize) {
        info!(
            event = "extender_started",
            instance = %self.instance,
            version = %version,
            bias = %bias,
            decay = decay,
            windows = windows,
            "Green scheduler extender started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "extender_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Green scheduler extender shutting down"
        );
    }

    pub fn log_telemetry_degraded(&self, node: &str, issues: &[TelemetryIssue]) {
        let details = issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        warn!(
            event = "telemetry_degraded",
            instance = %self.instance,
            node = %node,
            details = %details,
            "Renewable telemetry degraded, scoring with defaults"
        );
    }

    /// Wattage figures are expected pre-rounded for readability
    pub fn log_node_excess(
        &self,
        node: &str,
        rated_power_watts: f64,
        utilization: f64,
        consumption_watts: f64,
        excess_watts: &[f64],
    ) {
        debug!(
            event = "node_excess",
            instance = %self.instance,
            node = %node,
            rated_power_watts = rated_power_watts,
            utilization_percent = (utilization * 1000.0).round() / 10.0,
            consumption_watts = consumption_watts,
            excess_watts = ?excess_watts,
            "Computed renewable excess"
        );
    }

    pub fn log_node_scored(
        &self,
        namespace: &str,
        pod_name: &str,
        node: &str,
        window_scores: &[f64],
        aggregate: f64,
        score: i64,
    ) {
        info!(
            event = "node_scored",
            instance = %self.instance,
            namespace = %namespace,
            pod_name = %pod_name,
            node = %node,
            window_scores = ?window_scores,
            aggregate = aggregate,
            score = score,
            "Node scored"
        );
    }

    pub fn log_filter_decision(&self, pod_name: &str, node: &str, passed: bool, reason: &str) {
        if passed {
            debug!(
                event = "filter_decision",
                instance = %self.instance,
                pod_name = %pod_name,
                node = %node,
                passed = true,
                "Node carries the required label"
            );
        } else {
            info!(
                event = "filter_decision",
                instance = %self.instance,
                pod_name = %pod_name,
                node = %node,
                passed = false,
                reason = %reason,
                "Node rejected by label filter"
            );
        }
    }

    pub fn log_metrics_fetch_failed(&self, pod_name: &str, node: &str, error: &str) {
        warn!(
            event = "metrics_fetch_failed",
            instance = %self.instance,
            pod_name = %pod_name,
            node = %node,
            error = %error,
            "Could not collect utilization, failing prioritize call"
        );
    }
}
