//! Cross-node normalization
//!
//! Both stages clamp the observed range with a floor (`highest >= 1`,
//! `lowest <= 0`) so that all-equal, all-zero or all-negative inputs never
//! divide by zero.

use super::excess::round_to_two_decimals;

/// Rescale each window's excess across nodes into `[0, max_score]`
///
/// `excess[node][window]`; windows are normalized independently, so values
/// are comparable across nodes for one window but not across windows.
pub fn normalize_windows(excess: &[Vec<f64>], window_count: usize, max_score: f64) -> Vec<Vec<f64>> {
    let mut normalized = vec![Vec::with_capacity(window_count); excess.len()];

    for window in 0..window_count {
        let values = excess.iter().map(|series| series[window]);
        let highest = values.clone().fold(1.0_f64, f64::max);
        let lowest = values.fold(0.0_f64, f64::min);
        let range = highest - lowest;

        for (node, series) in excess.iter().enumerate() {
            let score = (series[window] - lowest) / range * max_score;
            normalized[node].push(round_to_two_decimals(score));
        }
    }

    normalized
}

/// Rescale aggregate values into integer scores in `[0, max_score]`
///
/// Equal aggregates map to equal scores; no tie-breaking.
pub fn normalize_final(aggregates: &[f64], max_score: f64) -> Vec<i64> {
    let highest = aggregates.iter().copied().fold(1.0_f64, f64::max);

    aggregates
        .iter()
        .map(|aggregate| (aggregate * max_score / highest).round().clamp(0.0, max_score) as i64)
        .collect()
}
