//! Temporal decay weighting
//!
//! Weights follow `decay^i / (1 - decay)` for window `i`. The curve is
//! ordered according to the bias mode and applied as a plain weighted sum:
//! weights are not rescaled to sum to one, so windows near the favored end
//! dominate super-linearly.

use crate::config::BiasMode;

/// Raw decay curve, `weight[i] = decay^i / (1 - decay)` for `i` in `0..count`
pub fn decay_weights(decay: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| decay.powi(i as i32) / (1.0 - decay))
        .collect()
}

/// Decay weights ordered for a bias mode
#[derive(Debug, Clone, PartialEq)]
pub struct WeightCurve {
    weights: Vec<f64>,
}

impl WeightCurve {
    pub fn new(decay: f64, count: usize, bias: BiasMode) -> Self {
        let mut weights = decay_weights(decay, count);
        match bias {
            BiasMode::FavorPresent => weights.sort_by(|a, b| b.total_cmp(a)),
            BiasMode::FavorFuture => weights.sort_by(|a, b| a.total_cmp(b)),
        }
        Self { weights }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weighted sum of one node's per-window scores
    pub fn aggregate(&self, window_scores: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(window_scores)
            .map(|(weight, score)| weight * score)
            .sum()
    }
}
