//! Pipeline-level tests for scoring
//!
//! Cover the end-to-end properties of the scorer: bounded integer output,
//! determinism, degraded-node handling and bias behaviour.

#[cfg(test)]
mod pipeline_tests {
    use crate::collector::{CollectorError, StaticSource, UtilizationCollector};
    use crate::config::{BiasMode, ScoringConfig};
    use crate::models::{Machine, Workload};
    use crate::observability::{ExtenderMetrics, StructuredLogger};
    use crate::scoring::{ScoreCalculator, ScoringEngine};
    use crate::telemetry::{
        NodeTelemetry, TelemetryExtractor, RATED_POWER_ANNOTATION, RENEWABLES_ANNOTATION,
    };
    use std::sync::Arc;

    fn config(bias: BiasMode, windows: usize) -> ScoringConfig {
        ScoringConfig::new(bias, 0.75, windows, 10_000.0).unwrap()
    }

    fn telemetry(shares: &[f64], rated_power_watts: f64) -> NodeTelemetry {
        NodeTelemetry {
            shares: shares.to_vec(),
            rated_power_watts,
            issues: Vec::new(),
        }
    }

    /// Deterministic pseudo-random stream so the property tests need no RNG crate
    fn lcg(seed: &mut u64) -> f64 {
        *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((*seed >> 11) as f64) / ((1u64 << 53) as f64)
    }

    #[test]
    fn test_two_node_single_window_example() {
        let calculator = ScoreCalculator::new(&config(BiasMode::FavorPresent, 1));
        // excess A = 0.8 * 10 = 8 W, B = 0.2 * 10 = 2 W
        let nodes = [telemetry(&[0.8], 10.0), telemetry(&[0.2], 10.0)];

        let breakdown = calculator.calculate(&nodes, &[0.0, 0.0]);

        assert_eq!(breakdown.excess, vec![vec![8.0], vec![2.0]]);
        assert_eq!(breakdown.window_scores, vec![vec![10.0], vec![2.5]]);
        assert_eq!(calculator.weights().weights(), &[4.0]);
        assert_eq!(breakdown.aggregates, vec![40.0, 10.0]);
        // 10 * 10 / 40 = 2.5 rounds half away from zero
        assert_eq!(breakdown.scores, vec![10, 3]);
    }

    #[test]
    fn test_scores_always_bounded_integers() {
        let mut seed = 42;
        for windows in [1, 2, 5, 13] {
            for bias in [BiasMode::FavorPresent, BiasMode::FavorFuture] {
                let calculator = ScoreCalculator::new(&config(bias, windows));
                for nodes in 1..8 {
                    let telemetry: Vec<NodeTelemetry> = (0..nodes)
                        .map(|_| {
                            let shares: Vec<f64> = (0..windows).map(|_| lcg(&mut seed)).collect();
                            telemetry(&shares, 500.0 + lcg(&mut seed) * 20_000.0)
                        })
                        .collect();
                    let utilization: Vec<f64> =
                        (0..nodes).map(|_| lcg(&mut seed) * 1.3).collect();

                    let breakdown = calculator.calculate(&telemetry, &utilization);

                    assert_eq!(breakdown.scores.len(), nodes);
                    assert!(breakdown.scores.iter().all(|s| (0..=10).contains(s)));
                    for series in &breakdown.window_scores {
                        assert_eq!(series.len(), windows);
                        assert!(series.iter().all(|v| (0.0..=10.0).contains(v)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_zero_aggregates_yield_uniform_minimum() {
        let calculator = ScoreCalculator::new(&config(BiasMode::FavorPresent, 3));
        let nodes = vec![telemetry(&[0.0, 0.0, 0.0], 1000.0); 4];

        let breakdown = calculator.calculate(&nodes, &[0.0; 4]);

        assert_eq!(breakdown.aggregates, vec![0.0; 4]);
        assert_eq!(breakdown.scores, vec![0; 4]);
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let calculator = ScoreCalculator::new(&config(BiasMode::FavorFuture, 5));
        let nodes = vec![
            telemetry(&[0.1, 0.4, 0.3, 0.9, 0.2], 8000.0),
            telemetry(&[0.7, 0.1, 0.6, 0.2, 0.5], 12000.0),
            telemetry(&[0.3, 0.3, 0.3, 0.3, 0.3], 10000.0),
        ];
        let utilization = [0.42, 0.13, 0.77];

        let first = calculator.calculate(&nodes, &utilization);
        let second = calculator.calculate(&nodes, &utilization);

        assert_eq!(first, second);
        for (a, b) in first.aggregates.iter().zip(&second.aggregates) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_missing_annotation_does_not_reorder_others() {
        let calculator = ScoreCalculator::new(&config(BiasMode::FavorPresent, 2));
        let extractor = TelemetryExtractor::new(2, 1000.0);

        let x = Machine::new("x").with_annotation(RENEWABLES_ANNOTATION, "0.9;0.5");
        let y = Machine::new("y").with_annotation(RENEWABLES_ANNOTATION, "0.3;0.7");
        let z = Machine::new("z");

        let without: Vec<NodeTelemetry> = [&x, &y].iter().map(|m| extractor.extract(m)).collect();
        let with: Vec<NodeTelemetry> = [&x, &y, &z].iter().map(|m| extractor.extract(m)).collect();

        let before = calculator.calculate(&without, &[0.1, 0.1]);
        let after = calculator.calculate(&with, &[0.1, 0.1, 0.1]);

        assert_eq!(
            before.scores[0].cmp(&before.scores[1]),
            after.scores[0].cmp(&after.scores[1])
        );
        // The degraded node sits at the bottom of every window
        assert_eq!(after.window_scores[2], vec![0.0, 0.0]);
        assert!(after.scores[2] <= after.scores[0]);
        assert!(after.scores[2] <= after.scores[1]);
    }

    #[test]
    fn test_out_of_range_share_cannot_poison_other_nodes() {
        let calculator = ScoreCalculator::new(&config(BiasMode::FavorPresent, 1));
        let extractor = TelemetryExtractor::new(1, 10_000.0);
        let nodes: Vec<NodeTelemetry> = [
            Machine::new("bogus").with_annotation(RENEWABLES_ANNOTATION, "1e306"),
            Machine::new("good").with_annotation(RENEWABLES_ANNOTATION, "0.5"),
        ]
        .iter()
        .map(|m| extractor.extract(m))
        .collect();

        let breakdown = calculator.calculate(&nodes, &[0.1, 0.1]);

        // bogus share reads as 0: -1000 W against 4000 W
        assert_eq!(breakdown.excess, vec![vec![-1000.0], vec![4000.0]]);
        assert!(breakdown.window_scores.iter().flatten().all(|v| v.is_finite()));
        assert_eq!(breakdown.window_scores, vec![vec![0.0], vec![10.0]]);
        assert_eq!(breakdown.scores, vec![0, 10]);
    }

    #[test]
    fn test_bias_mirrors_monotonic_profiles() {
        // A's excess rises over the horizon, B's falls
        let nodes = [telemetry(&[0.0, 1.0], 10.0), telemetry(&[1.0, 0.0], 10.0)];

        let present = ScoreCalculator::new(&config(BiasMode::FavorPresent, 2))
            .calculate(&nodes, &[0.0, 0.0]);
        let future = ScoreCalculator::new(&config(BiasMode::FavorFuture, 2))
            .calculate(&nodes, &[0.0, 0.0]);

        assert_eq!(present.scores, vec![8, 10]);
        assert_eq!(future.scores, vec![10, 8]);
    }

    #[test]
    fn test_bias_need_not_mirror_general_profiles() {
        // Non-monotonic profiles: both modes may prefer the same node
        let nodes = [
            telemetry(&[0.9, 0.1, 0.9], 10.0),
            telemetry(&[0.2, 0.8, 0.3], 10.0),
        ];

        let present = ScoreCalculator::new(&config(BiasMode::FavorPresent, 3))
            .calculate(&nodes, &[0.0, 0.0]);
        let future = ScoreCalculator::new(&config(BiasMode::FavorFuture, 3))
            .calculate(&nodes, &[0.0, 0.0]);

        assert_eq!(present.scores[0], 10);
        assert_eq!(future.scores[0], 10);
    }

    fn engine(source: StaticSource, windows: usize) -> ScoringEngine {
        ScoringEngine::new(
            config(BiasMode::FavorPresent, windows),
            UtilizationCollector::new(Arc::new(source)),
            StructuredLogger::new("test"),
            ExtenderMetrics::new(),
        )
    }

    fn machine(name: &str, renewables: &str) -> Machine {
        Machine::new(name)
            .with_annotation(RENEWABLES_ANNOTATION, renewables)
            .with_annotation(RATED_POWER_ANNOTATION, "1000")
            .with_allocatable_cpu("4")
    }

    #[tokio::test]
    async fn test_engine_scores_in_input_order() {
        let source = StaticSource::new()
            .with_usage("sunny", 0.4)
            .with_usage("cloudy", 0.4)
            .with_usage("night", 0.4);
        let engine = engine(source, 2);
        let machines = vec![
            machine("cloudy", "0.4;0.4"),
            machine("sunny", "0.9;0.8"),
            machine("night", "0.0;0.1"),
        ];

        let scores = engine
            .score(&Workload::default(), &machines)
            .await
            .unwrap();

        let names: Vec<&str> = scores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["cloudy", "sunny", "night"]);
        assert_eq!(scores[1].score, 10);
        assert!(scores[0].score > scores[2].score);
    }

    #[tokio::test]
    async fn test_engine_fails_when_metrics_missing() {
        let source = StaticSource::new().with_usage("a", 0.5);
        let engine = engine(source, 1);
        let machines = vec![machine("a", "0.5"), machine("b", "0.5")];

        let err = engine
            .score(&Workload::default(), &machines)
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_engine_with_no_candidates() {
        let engine = engine(StaticSource::new(), 1);
        let scores = engine.score(&Workload::default(), &[]).await.unwrap();
        assert!(scores.is_empty());
    }
}
