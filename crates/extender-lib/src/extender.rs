//! Scheduler extender protocol handling
//!
//! Decodes filter and prioritize calls, runs the label predicate or the
//! scoring pipeline, and builds the wire responses. Transport concerns
//! (status codes, content types) stay with the HTTP layer.

use crate::collector::CollectorError;
use crate::filter::LabelFilter;
use crate::models::{
    ExtenderArgs, ExtenderFilterResult, HostPriority, HostPriorityList, Machine, NodeList,
    Workload,
};
use crate::observability::{endpoints, ExtenderMetrics, StructuredLogger};
use crate::scoring::ScoringEngine;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

/// Returned by filter when the scheduler only sends node names
pub const NODE_OBJECTS_REQUIRED: &str =
    "node objects are required to check labels; configure the extender with nodeCacheCapable: false";

/// Stateless handler for filter and prioritize calls
#[derive(Clone)]
pub struct Extender {
    engine: ScoringEngine,
    filter: LabelFilter,
    logger: StructuredLogger,
    metrics: ExtenderMetrics,
}

impl Extender {
    pub fn new(
        engine: ScoringEngine,
        filter: LabelFilter,
        logger: StructuredLogger,
        metrics: ExtenderMetrics,
    ) -> Self {
        Self {
            engine,
            filter,
            logger,
            metrics,
        }
    }

    /// Filter a raw request body; never fails
    pub fn filter_body(&self, body: &[u8]) -> ExtenderFilterResult {
        self.metrics.inc_requests(endpoints::FILTER);
        match serde_json::from_slice::<ExtenderArgs>(body) {
            Ok(args) => self.filter(args),
            Err(e) => {
                warn!(error = %e, "Could not decode filter request");
                self.metrics.inc_decode_errors(endpoints::FILTER);
                ExtenderFilterResult::from_error(e.to_string())
            }
        }
    }

    /// Partition candidate nodes by the required label
    pub fn filter(&self, args: ExtenderArgs) -> ExtenderFilterResult {
        let start = Instant::now();
        let workload = Workload::from_pod(args.pod.as_ref());
        info!(pod = %workload.name, namespace = %workload.namespace, "Checking node predicates");

        let Some(nodes) = args.nodes else {
            let result = match args.node_names {
                Some(_) => ExtenderFilterResult::from_error(NODE_OBJECTS_REQUIRED),
                None => ExtenderFilterResult::default(),
            };
            self.metrics
                .observe_filter_latency(start.elapsed().as_secs_f64());
            return result;
        };

        let mut passed = Vec::with_capacity(nodes.items.len());
        let mut failed_nodes = BTreeMap::new();

        for node in nodes.items {
            let machine = Machine::from(&node);
            match self.filter.check(&machine) {
                Ok(()) => {
                    self.logger
                        .log_filter_decision(&workload.name, &machine.name, true, "");
                    passed.push(node);
                }
                Err(reason) => {
                    self.logger
                        .log_filter_decision(&workload.name, &machine.name, false, &reason);
                    failed_nodes.insert(machine.name, reason);
                }
            }
        }

        self.metrics.inc_nodes_filtered_out(failed_nodes.len() as u64);
        self.metrics
            .observe_filter_latency(start.elapsed().as_secs_f64());

        ExtenderFilterResult {
            nodes: Some(NodeList::new(passed)),
            failed_nodes,
            ..Default::default()
        }
    }

    /// Prioritize a raw request body
    ///
    /// An undecodable body yields an empty list; only a metrics-source
    /// failure is reported as an error.
    pub async fn prioritize_body(&self, body: &[u8]) -> Result<HostPriorityList, CollectorError> {
        self.metrics.inc_requests(endpoints::PRIORITIZE);
        match serde_json::from_slice::<ExtenderArgs>(body) {
            Ok(args) => self.prioritize(args).await,
            Err(e) => {
                warn!(error = %e, "Could not decode prioritize request");
                self.metrics.inc_decode_errors(endpoints::PRIORITIZE);
                Ok(HostPriorityList::new())
            }
        }
    }

    /// Score candidate nodes, keeping the request's node order
    pub async fn prioritize(&self, args: ExtenderArgs) -> Result<HostPriorityList, CollectorError> {
        let start = Instant::now();
        let workload = Workload::from_pod(args.pod.as_ref());
        info!(pod = %workload.name, namespace = %workload.namespace, "Calculating node priorities");

        let Some(nodes) = args.nodes else {
            // Names alone carry no telemetry; every node ties at zero
            let list = args
                .node_names
                .unwrap_or_default()
                .into_iter()
                .map(|host| HostPriority { host, score: 0 })
                .collect();
            self.metrics
                .observe_prioritize_latency(start.elapsed().as_secs_f64());
            return Ok(list);
        };

        let machines: Vec<Machine> = nodes.items.iter().map(Machine::from).collect();
        let result = self.engine.score(&workload, &machines).await;
        self.metrics
            .observe_prioritize_latency(start.elapsed().as_secs_f64());

        match result {
            Ok(scores) => Ok(scores.into_iter().map(HostPriority::from).collect()),
            Err(e) => {
                self.metrics.inc_metrics_fetch_errors();
                self.logger
                    .log_metrics_fetch_failed(&workload.name, e.node(), &e.to_string());
                Err(e)
            }
        }
    }
}
