//! green-extender - renewable-aware kube-scheduler extender
//!
//! Serves the scheduler's filter and prioritize webhooks, ranking nodes by
//! how much renewable power they are expected to have to spare.

use anyhow::Result;
use extender_lib::{
    collector::{AnnotationSource, MetricsServerSource, MetricsSource, UtilizationCollector},
    health::{components, HealthRegistry},
    observability::{ExtenderMetrics, StructuredLogger},
    Extender, ScoringEngine,
};
use green_extender::{
    api,
    config::{ExtenderConfig, MetricsBackend},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXTENDER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting green-extender");

    let config = ExtenderConfig::load()?;
    let scoring = config.scoring()?;
    let label_filter = config.label_filter()?;

    let source: Arc<dyn MetricsSource> = match config.metrics_backend {
        MetricsBackend::MetricsServer => Arc::new(MetricsServerSource::try_default().await?),
        MetricsBackend::Annotation => Arc::new(AnnotationSource),
    };
    let collector = UtilizationCollector::new(source).with_timeout(config.metrics_timeout());
    info!(
        backend = collector.source_name(),
        timeout_secs = config.metrics_timeout_secs,
        required_label = %label_filter.key(),
        "Metrics source configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::METRICS_SOURCE).await;

    let metrics = ExtenderMetrics::new();
    let bias = scoring.bias().to_string();
    metrics.set_config_info(&bias, scoring.decay(), scoring.window_count());

    let logger = StructuredLogger::new(&config.instance);
    logger.log_startup(
        EXTENDER_VERSION,
        &bias,
        scoring.decay(),
        scoring.window_count(),
    );

    let engine = ScoringEngine::new(scoring, collector, logger.clone(), metrics.clone());
    let extender = Extender::new(engine, label_filter, logger.clone(), metrics);
    let app_state = Arc::new(api::AppState::new(extender, health_registry.clone()));

    health_registry.set_ready(true).await;

    let server = tokio::spawn(api::serve(config.port, app_state));

    tokio::select! {
        result = server => {
            logger.log_shutdown("server exited");
            result??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
