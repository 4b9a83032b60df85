//! Housing price predictor - web form and JSON API over a compressed regression model
//!
//! Artifacts are re-read from disk on every submission, so replacing the
//! model file takes effect without a restart.

use anyhow::Result;
use housing_predictor::{api, config::ServiceConfig};
use predictor_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    PredictionService,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting housing-predictor");

    let config = ServiceConfig::load()?;
    let paths = config.artifact_paths();
    info!(
        instance = %config.instance_name,
        model = %paths.model.display(),
        scaler = ?paths.scaler,
        checksum_pinned = paths.options.expected_sha256.is_some(),
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ESTIMATOR).await;
    health_registry.register(components::SCALER).await;

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    let service = PredictionService::new(paths);

    // Probe the estimator once so a broken deployment shows up in logs and /healthz
    let probe_service = service.clone();
    let model_path = service.paths().model.display().to_string();
    match tokio::task::spawn_blocking(move || probe_service.describe_model()).await {
        Ok(probe) => {
            health_registry.record_probe(&probe).await;
            match &probe {
                Ok(summary) => {
                    logger.log_probe(&model_path, Ok(summary.kind.as_str()));
                    metrics.set_model_info(&summary.kind, summary.sha256.as_deref().unwrap_or(""));
                }
                Err(e) => {
                    logger.log_probe(&model_path, Err(e.to_string().as_str()));
                    metrics.inc_artifact_load_error(components::ESTIMATOR, e.kind());
                }
            }
        }
        Err(e) => error!(error = %e, "Estimator probe did not complete"),
    }

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        logger.clone(),
        service,
        config.title.clone(),
    ));

    // Ready even when the estimator is missing; each submission reports its own diagnostic
    health_registry.set_ready(true).await;
    logger.log_startup(SERVICE_VERSION, config.api_port);

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server exited"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    logger.log_shutdown("API server failed");
                    return Err(e);
                }
                Err(e) => {
                    error!(error = %e, "API server task panicked");
                    logger.log_shutdown("API server task panicked");
                    return Err(e.into());
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
