//! Scoring configuration
//!
//! Built once at startup and shared read-only by every request. All
//! validation happens in [`ScoringConfig::new`], so a running extender never
//! sees an invalid decay constant or an empty window set.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound of the score range handed back to the scheduler
pub const MAX_SCORE: f64 = 10.0;

/// Nominal power assumed for nodes without a `rated-power` annotation
pub const DEFAULT_RATED_POWER_WATTS: f64 = 10_000.0;

/// Largest nominal power accepted from configuration or annotations (1 GW)
pub const MAX_RATED_POWER_WATTS: f64 = 1e9;

pub const DEFAULT_DECAY: f64 = 0.75;

/// Errors raised while building the process configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("decay constant must lie strictly between 0 and 1, got {0}")]
    InvalidDecay(f64),

    #[error("unknown bias mode '{0}', expected 'present' or 'future'")]
    UnknownBias(String),

    #[error("unknown window profile '{0}', expected one of current, s, m, l, xl")]
    UnknownWindowProfile(String),

    #[error("window count must be at least 1, got {0}")]
    InvalidWindowCount(usize),

    #[error("default rated power must be positive and at most 1 GW, got {0} W")]
    InvalidRatedPower(f64),

    #[error("required label key must not be empty")]
    EmptyLabelKey,
}

/// Which end of the forecast horizon dominates the aggregate score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BiasMode {
    /// Nearest window gets the largest weight
    #[default]
    FavorPresent,
    /// Farthest window gets the largest weight
    FavorFuture,
}

impl FromStr for BiasMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "present" | "favor-present" | "favor_present" => Ok(BiasMode::FavorPresent),
            "future" | "favor-future" | "favor_future" => Ok(BiasMode::FavorFuture),
            other => Err(ConfigError::UnknownBias(other.to_string())),
        }
    }
}

impl fmt::Display for BiasMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasMode::FavorPresent => write!(f, "present"),
            BiasMode::FavorFuture => write!(f, "future"),
        }
    }
}

/// Named forecast horizons
///
/// Each profile fixes how many renewable-share samples a node annotation
/// must carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowProfile {
    /// Current share only
    #[default]
    Current,
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl WindowProfile {
    pub fn window_count(&self) -> usize {
        match self {
            WindowProfile::Current => 1,
            WindowProfile::Small => 2,
            WindowProfile::Medium => 5,
            WindowProfile::Large => 13,
            WindowProfile::ExtraLarge => 25,
        }
    }
}

impl FromStr for WindowProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "current" => Ok(WindowProfile::Current),
            "s" => Ok(WindowProfile::Small),
            "m" => Ok(WindowProfile::Medium),
            "l" => Ok(WindowProfile::Large),
            "xl" => Ok(WindowProfile::ExtraLarge),
            other => Err(ConfigError::UnknownWindowProfile(other.to_string())),
        }
    }
}

/// Validated, immutable scoring parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    bias: BiasMode,
    decay: f64,
    window_count: usize,
    default_rated_power_watts: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            bias: BiasMode::default(),
            decay: DEFAULT_DECAY,
            window_count: WindowProfile::default().window_count(),
            default_rated_power_watts: DEFAULT_RATED_POWER_WATTS,
        }
    }
}

impl ScoringConfig {
    pub fn new(
        bias: BiasMode,
        decay: f64,
        window_count: usize,
        default_rated_power_watts: f64,
    ) -> Result<Self, ConfigError> {
        // NaN fails both comparisons and is rejected here too
        if !(decay > 0.0 && decay < 1.0) {
            return Err(ConfigError::InvalidDecay(decay));
        }
        if window_count == 0 {
            return Err(ConfigError::InvalidWindowCount(window_count));
        }
        if !(default_rated_power_watts > 0.0 && default_rated_power_watts <= MAX_RATED_POWER_WATTS)
        {
            return Err(ConfigError::InvalidRatedPower(default_rated_power_watts));
        }

        Ok(Self {
            bias,
            decay,
            window_count,
            default_rated_power_watts,
        })
    }

    pub fn bias(&self) -> BiasMode {
        self.bias
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn window_count(&self) -> usize {
        self.window_count
    }

    pub fn default_rated_power_watts(&self) -> f64 {
        self.default_rated_power_watts
    }
}
