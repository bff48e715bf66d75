//! Extender configuration

use anyhow::{bail, Context, Result};
use config::Environment;
use extender_lib::collector::DEFAULT_METRICS_TIMEOUT;
use extender_lib::config::{DEFAULT_DECAY, DEFAULT_RATED_POWER_WATTS};
use extender_lib::filter::{DEFAULT_LABEL_KEY, DEFAULT_LABEL_VALUE};
use extender_lib::{BiasMode, LabelFilter, ScoringConfig, WindowProfile};
use serde::Deserialize;
use std::time::Duration;

/// Where node CPU usage is read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricsBackend {
    #[default]
    MetricsServer,
    Annotation,
}

/// Extender configuration, read from `EXTENDER_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct ExtenderConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance")]
    pub instance: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bias")]
    pub bias: String,

    #[serde(default = "default_decay")]
    pub decay: f64,

    #[serde(default)]
    pub window_profile: String,

    /// Overrides `window_profile` when set
    #[serde(default)]
    pub window_count: Option<usize>,

    #[serde(default = "default_rated_power")]
    pub default_rated_power_watts: f64,

    #[serde(default = "default_metrics_timeout")]
    pub metrics_timeout_secs: u64,

    #[serde(default = "default_label_key")]
    pub required_label: String,

    #[serde(default = "default_label_value")]
    pub required_label_value: String,

    #[serde(default)]
    pub metrics_backend: MetricsBackend,
}

fn default_instance() -> String {
    std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "green-extender".to_string())
}

fn default_port() -> u16 {
    8080
}

fn default_bias() -> String {
    BiasMode::default().to_string()
}

fn default_decay() -> f64 {
    DEFAULT_DECAY
}

fn default_rated_power() -> f64 {
    DEFAULT_RATED_POWER_WATTS
}

fn default_metrics_timeout() -> u64 {
    DEFAULT_METRICS_TIMEOUT.as_secs()
}

fn default_label_key() -> String {
    DEFAULT_LABEL_KEY.to_string()
}

fn default_label_value() -> String {
    DEFAULT_LABEL_VALUE.to_string()
}

impl ExtenderConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_environment(Environment::with_prefix("EXTENDER"))
    }

    pub fn from_environment(environment: Environment) -> Result<Self> {
        let config = config::Config::builder()
            // Values stay strings until deserialized so labels keep their exact text
            .add_source(environment)
            .build()
            .context("Failed to read extender configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Invalid extender configuration")?;

        if config.metrics_timeout_secs == 0 {
            bail!("EXTENDER_METRICS_TIMEOUT_SECS must be at least 1");
        }
        Ok(config)
    }

    /// Validated scoring parameters
    pub fn scoring(&self) -> Result<ScoringConfig> {
        let bias: BiasMode = self.bias.parse()?;
        let window_count = match self.window_count {
            Some(count) => count,
            None => self.window_profile.parse::<WindowProfile>()?.window_count(),
        };
        Ok(ScoringConfig::new(
            bias,
            self.decay,
            window_count,
            self.default_rated_power_watts,
        )?)
    }

    pub fn label_filter(&self) -> Result<LabelFilter> {
        Ok(LabelFilter::new(
            self.required_label.clone(),
            self.required_label_value.clone(),
        )?)
    }

    pub fn metrics_timeout(&self) -> Duration {
        Duration::from_secs(self.metrics_timeout_secs)
    }
}
