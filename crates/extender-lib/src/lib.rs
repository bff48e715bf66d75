//! Renewable-aware scheduling extender library
//!
//! This crate provides the core functionality for:
//! - Reading renewable telemetry from node annotations
//! - Collecting node CPU utilization from a metrics source
//! - Scoring nodes by expected renewable excess
//! - Label-based node filtering
//! - Health checks and observability

pub mod collector;
pub mod config;
pub mod extender;
pub mod filter;
pub mod health;
pub mod models;
pub mod observability;
pub mod scoring;
pub mod telemetry;

pub use config::{BiasMode, ConfigError, ScoringConfig, WindowProfile};
pub use extender::Extender;
pub use filter::LabelFilter;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ExtenderMetrics, StructuredLogger};
pub use scoring::{ScoreCalculator, ScoringEngine};
