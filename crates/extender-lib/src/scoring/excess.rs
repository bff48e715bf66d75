//! Renewable power excess per window

use crate::telemetry::NodeTelemetry;

/// Round to two decimal places
pub fn round_to_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Estimated current draw of a node in watts
pub fn consumption_watts(rated_power_watts: f64, utilization: f64) -> f64 {
    rated_power_watts * utilization
}

/// Renewable supply minus current consumption, one value per window
///
/// Deficits stay negative; the window normalizer needs the full spread.
pub fn renewable_excess(telemetry: &NodeTelemetry, utilization: f64) -> Vec<f64> {
    let consumption = consumption_watts(telemetry.rated_power_watts, utilization);
    telemetry
        .shares
        .iter()
        .map(|share| share * telemetry.rated_power_watts - consumption)
        .collect()
}
