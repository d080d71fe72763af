//! Adoptima server - marketing budget allocation optimizer
//!
//! Loads a trained revenue model once at startup and serves optimization
//! requests over HTTP.

use adoptima_server::{api, config::ServerConfig};
use anyhow::{Context, Result};
use optimizer_lib::{
    health::{components, HealthRegistry},
    observability::{OptimizerMetrics, StructuredLogger},
    predictor::load_model,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting adoptima-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        model_path = %config.model_path.display(),
        model_kind = config.model_kind.as_str(),
        "Server configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL).await;
    health_registry.register(components::OPTIMIZER).await;

    let model = load_model(&config.model_source()).with_context(|| {
        format!("failed to load model from {}", config.model_path.display())
    })?;
    let model_version = model.predictor.model_version().to_string();

    let metrics = OptimizerMetrics::new();
    metrics.set_model_version(&model_version, model.kind.as_str());

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(SERVER_VERSION, &model_version);

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        logger.clone(),
        model,
        config.optimize_timeout(),
    ));

    // Model is in memory; accept traffic
    health_registry.set_ready(true).await;

    api::serve(config.port, app_state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
