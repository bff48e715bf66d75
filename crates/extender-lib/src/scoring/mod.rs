//! Renewable-aware node scoring
//!
//! Pipeline per request, with no state carried between requests:
//! telemetry extraction → utilization collection → excess per window →
//! per-window normalization across nodes → decay-weighted aggregation →
//! final normalization into integer scores.

mod excess;
mod normalize;
mod weighting;

#[cfg(test)]
mod tests;

pub use excess::{consumption_watts, renewable_excess, round_to_two_decimals};
pub use normalize::{normalize_final, normalize_windows};
pub use weighting::{decay_weights, WeightCurve};

use crate::collector::{CollectorError, UtilizationCollector};
use crate::config::{ScoringConfig, MAX_SCORE};
use crate::models::{Machine, MachineScore, Workload};
use crate::observability::{ExtenderMetrics, StructuredLogger};
use crate::telemetry::{NodeTelemetry, TelemetryExtractor};
use std::time::Instant;
use tracing::info;

/// Intermediate values of one scoring pass, kept for logs and tests
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    /// `excess[node][window]` in watts
    pub excess: Vec<Vec<f64>>,
    /// `window_scores[node][window]` in `[0, MAX_SCORE]`
    pub window_scores: Vec<Vec<f64>>,
    pub aggregates: Vec<f64>,
    pub scores: Vec<i64>,
}

/// Pure part of the pipeline: telemetry + utilization snapshot → scores
///
/// `telemetry` and `utilization` are parallel slices, one entry per node.
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    window_count: usize,
    weights: WeightCurve,
}

impl ScoreCalculator {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            window_count: config.window_count(),
            weights: WeightCurve::new(config.decay(), config.window_count(), config.bias()),
        }
    }

    pub fn weights(&self) -> &WeightCurve {
        &self.weights
    }

    pub fn calculate(&self, telemetry: &[NodeTelemetry], utilization: &[f64]) -> ScoreBreakdown {
        debug_assert_eq!(telemetry.len(), utilization.len());

        let excess: Vec<Vec<f64>> = telemetry
            .iter()
            .zip(utilization)
            .map(|(t, &u)| renewable_excess(t, u))
            .collect();

        let window_scores = normalize_windows(&excess, self.window_count, MAX_SCORE);

        let aggregates: Vec<f64> = window_scores
            .iter()
            .map(|scores| self.weights.aggregate(scores))
            .collect();

        let scores = normalize_final(&aggregates, MAX_SCORE);

        ScoreBreakdown {
            excess,
            window_scores,
            aggregates,
            scores,
        }
    }
}

/// Full scoring pipeline including the metrics source round trip
#[derive(Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
    extractor: TelemetryExtractor,
    collector: UtilizationCollector,
    calculator: ScoreCalculator,
    logger: StructuredLogger,
    metrics: ExtenderMetrics,
}

impl ScoringEngine {
    pub fn new(
        config: ScoringConfig,
        collector: UtilizationCollector,
        logger: StructuredLogger,
        metrics: ExtenderMetrics,
    ) -> Self {
        Self {
            extractor: TelemetryExtractor::from_config(&config),
            calculator: ScoreCalculator::new(&config),
            config,
            collector,
            logger,
            metrics,
        }
    }

    /// Score every machine, in input order
    ///
    /// Fails only when utilization cannot be collected for some node.
    pub async fn score(
        &self,
        workload: &Workload,
        machines: &[Machine],
    ) -> Result<Vec<MachineScore>, CollectorError> {
        if machines.is_empty() {
            return Ok(Vec::new());
        }

        let telemetry: Vec<NodeTelemetry> =
            machines.iter().map(|m| self.extractor.extract(m)).collect();
        let mut degraded = 0;
        for (machine, t) in machines.iter().zip(&telemetry) {
            if t.is_degraded() {
                degraded += 1;
                self.logger.log_telemetry_degraded(&machine.name, &t.issues);
            }
        }
        self.metrics.inc_telemetry_degraded(degraded);

        let fetch_start = Instant::now();
        let collected = self.collector.collect(machines).await;
        self.metrics
            .observe_metrics_fetch_latency(fetch_start.elapsed().as_secs_f64());
        let utilization: Vec<f64> = collected?.into_iter().map(|u| u.fraction).collect();

        let breakdown = self.calculator.calculate(&telemetry, &utilization);

        for (i, machine) in machines.iter().enumerate() {
            self.logger.log_node_excess(
                &machine.name,
                telemetry[i].rated_power_watts,
                utilization[i],
                round_to_two_decimals(consumption_watts(
                    telemetry[i].rated_power_watts,
                    utilization[i],
                )),
                &breakdown.excess[i]
                    .iter()
                    .map(|e| round_to_two_decimals(*e))
                    .collect::<Vec<_>>(),
            );
            self.logger.log_node_scored(
                &workload.namespace,
                &workload.name,
                &machine.name,
                &breakdown.window_scores[i],
                breakdown.aggregates[i],
                breakdown.scores[i],
            );
        }

        info!(
            pod = %workload.name,
            namespace = %workload.namespace,
            nodes = machines.len(),
            bias = %self.config.bias(),
            "Scored candidate nodes"
        );

        Ok(machines
            .iter()
            .zip(breakdown.scores)
            .map(|(machine, score)| MachineScore {
                name: machine.name.clone(),
                score,
            })
            .collect())
    }
}
