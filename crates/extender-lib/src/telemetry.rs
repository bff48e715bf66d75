//! Renewable telemetry extraction from node annotations
//!
//! Reads the renewable-share series and nominal power of a node. Nothing
//! here fails: a missing or malformed annotation degrades to a neutral
//! value and is reported through [`TelemetryIssue`].

use crate::config::{ScoringConfig, MAX_RATED_POWER_WATTS};
use crate::models::Machine;
use std::fmt;
use tracing::debug;

/// Semicolon-delimited renewable shares, one per window
pub const RENEWABLES_ANNOTATION: &str = "renewables";

/// Nominal node power in watts
pub const RATED_POWER_ANNOTATION: &str = "rated-power";

pub const SHARE_DELIMITER: char = ';';

/// A parsed value together with whether the fallback was used
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub degraded: bool,
}

impl<T> Parsed<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            degraded: false,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            degraded: true,
        }
    }
}

/// Parse a finite float, falling back to `default` on absence or garbage
pub fn parse_or_default(raw: Option<&str>, default: f64) -> Parsed<f64> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Parsed::ok(v),
            _ => Parsed::fallback(default),
        },
        None => Parsed::fallback(default),
    }
}

/// Why a node's telemetry was degraded
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryIssue {
    MissingShares,
    MalformedShare { index: usize, token: String },
    WindowMismatch { expected: usize, found: usize },
    MissingRatedPower,
    MalformedRatedPower(String),
}

impl fmt::Display for TelemetryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryIssue::MissingShares => write!(f, "no renewable shares annotated"),
            TelemetryIssue::MalformedShare { index, token } => {
                write!(f, "share {} ('{}') is not a fraction in [0, 1]", index, token)
            }
            TelemetryIssue::WindowMismatch { expected, found } => {
                write!(f, "expected {} shares, found {}", expected, found)
            }
            TelemetryIssue::MissingRatedPower => write!(f, "no rated power annotated"),
            TelemetryIssue::MalformedRatedPower(raw) => {
                write!(f, "rated power '{}' is not a positive wattage up to 1 GW", raw)
            }
        }
    }
}

/// Per-node telemetry ready for excess calculation
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTelemetry {
    /// Renewable shares as fractions, exactly one per configured window
    pub shares: Vec<f64>,
    pub rated_power_watts: f64,
    pub issues: Vec<TelemetryIssue>,
}

impl NodeTelemetry {
    /// True when any annotation was present but unusable, or shares were absent
    ///
    /// A missing rated power alone is the normal case and does not count.
    pub fn is_degraded(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| *issue != TelemetryIssue::MissingRatedPower)
    }
}

/// Reads telemetry annotations for the configured window count
#[derive(Debug, Clone)]
pub struct TelemetryExtractor {
    window_count: usize,
    default_rated_power_watts: f64,
}

impl TelemetryExtractor {
    pub fn new(window_count: usize, default_rated_power_watts: f64) -> Self {
        Self {
            window_count,
            default_rated_power_watts,
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(config.window_count(), config.default_rated_power_watts())
    }

    pub fn extract(&self, machine: &Machine) -> NodeTelemetry {
        let mut issues = Vec::new();
        let shares = self.parse_shares(machine.annotation(RENEWABLES_ANNOTATION), &mut issues);
        let rated_power_watts =
            self.parse_rated_power(machine.annotation(RATED_POWER_ANNOTATION), &mut issues);

        for issue in &issues {
            debug!(node = %machine.name, issue = %issue, "Telemetry fallback applied");
        }
        debug!(node = %machine.name, shares = ?shares, rated_power_watts, "Parsed renewable shares");

        NodeTelemetry {
            shares,
            rated_power_watts,
            issues,
        }
    }

    fn zeros(&self) -> Vec<f64> {
        vec![0.0; self.window_count]
    }

    fn parse_shares(&self, raw: Option<&str>, issues: &mut Vec<TelemetryIssue>) -> Vec<f64> {
        // Tolerate a single trailing delimiter ("0.4;0.6;")
        let raw = raw
            .map(|s| s.trim())
            .map(|s| s.strip_suffix(SHARE_DELIMITER).unwrap_or(s))
            .filter(|s| !s.trim().is_empty());

        let Some(raw) = raw else {
            issues.push(TelemetryIssue::MissingShares);
            return self.zeros();
        };

        let tokens: Vec<&str> = raw.split(SHARE_DELIMITER).collect();
        if tokens.len() != self.window_count {
            issues.push(TelemetryIssue::WindowMismatch {
                expected: self.window_count,
                found: tokens.len(),
            });
            return self.zeros();
        }

        tokens
            .iter()
            .enumerate()
            .map(|(index, token)| {
                let parsed = parse_or_default(Some(token), 0.0);
                if parsed.degraded || !(0.0..=1.0).contains(&parsed.value) {
                    issues.push(TelemetryIssue::MalformedShare {
                        index,
                        token: token.trim().to_string(),
                    });
                    return 0.0;
                }
                parsed.value
            })
            .collect()
    }

    fn parse_rated_power(&self, raw: Option<&str>, issues: &mut Vec<TelemetryIssue>) -> f64 {
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            issues.push(TelemetryIssue::MissingRatedPower);
            return self.default_rated_power_watts;
        };

        let parsed = parse_or_default(Some(raw), self.default_rated_power_watts);
        if parsed.degraded || parsed.value <= 0.0 || parsed.value > MAX_RATED_POWER_WATTS {
            issues.push(TelemetryIssue::MalformedRatedPower(raw.trim().to_string()));
            return self.default_rated_power_watts;
        }
        parsed.value
    }
}
