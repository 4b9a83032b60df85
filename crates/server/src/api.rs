//! HTTP API: the prediction form, the JSON API, health checks and Prometheus metrics

use crate::page::{self, Notice};
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use predictor_lib::{
    error::PredictionError, field_by_key, predictor::InputCollector, Diagnostic, FeatureVector,
    HealthRegistry, ModelSummary, Outcome, PredictionService, ScalerStatus,
    ServiceMetrics, StructuredLogger, Submission, FEATURES,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub service: PredictionService,
    pub title: String,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
        service: PredictionService,
        title: impl Into<String>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            logger,
            service,
            title: title.into(),
        }
    }

    /// Run one submission off the async runtime and record it
    pub async fn submit(&self, features: FeatureVector) -> Submission {
        let service = self.service.clone();
        let submission = match tokio::task::spawn_blocking(move || service.submit(&features)).await
        {
            Ok(submission) => submission,
            Err(e) => {
                error!(error = %e, "Prediction task did not complete");
                Submission {
                    outcome: Outcome::Failure(Diagnostic::PredictionFailure(
                        PredictionError::Inference(format!("prediction task failed: {e}")),
                    )),
                    scaler: ScalerStatus::NotLoaded,
                    elapsed: Duration::ZERO,
                }
            }
        };

        self.metrics.observe_submission(&submission);
        self.logger.log_submission(&submission);
        self.health_registry.record_submission(&submission).await;
        submission
    }

    fn reject(&self, reason: &str) {
        self.metrics.inc_rejected_inputs();
        self.logger.log_rejected_input(reason);
    }
}

/// JSON response for `/api/v1/predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// `success` or `error`
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    pub scaled: bool,
    pub scaler: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSummary>,
}

impl PredictResponse {
    fn from_submission(submission: &Submission) -> (StatusCode, Self) {
        let scaler = submission.scaler.label().to_string();
        match &submission.outcome {
            Outcome::Success(quote) => (
                StatusCode::OK,
                Self {
                    status: "success".to_string(),
                    message: quote.message.clone(),
                    price: Some(quote.price),
                    formatted: Some(quote.formatted.clone()),
                    scaled: quote.scaled,
                    scaler,
                    error_kind: None,
                    model: Some(quote.model.clone()),
                },
            ),
            Outcome::Failure(diagnostic) => {
                let code = match diagnostic {
                    Diagnostic::ArtifactUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    Diagnostic::PredictionFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (code, Self::error(diagnostic.message(), diagnostic.kind(), scaler))
            }
        }
    }

    fn error(message: String, kind: &str, scaler: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            price: None,
            formatted: None,
            scaled: false,
            scaler,
            error_kind: Some(kind.to_string()),
            model: None,
        }
    }
}

/// Error body for non-prediction endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// The empty form, prefilled with defaults
async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(page::render(&state.title, &FeatureVector::defaults(), None))
}

/// Form submission: always re-renders the page with exactly one output region
async fn predict_form(
    State(state): State<Arc<AppState>>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Html<String> {
    let Form(fields) = match form {
        Ok(form) => form,
        Err(rejection) => {
            let message = format!("Invalid input: {}", rejection.body_text());
            state.reject(&message);
            return Html(page::render(
                &state.title,
                &FeatureVector::defaults(),
                Some(Notice::Error(&message)),
            ));
        }
    };

    let features = match state.service.collector().collect(&fields) {
        Ok(features) => features,
        Err(e) => {
            state.reject(&e.to_string());
            // Echo what can be echoed; the rejected field falls back to its default
            let shown = lenient_echo(state.service.collector(), &fields);
            return Html(page::render(
                &state.title,
                &shown,
                Some(Notice::Error(&format!("Invalid input: {e}"))),
            ));
        }
    };

    let submission = state.submit(features).await;
    let html = match &submission.outcome {
        Outcome::Success(quote) => page::render(
            &state.title,
            &features,
            Some(Notice::Success {
                message: &quote.message,
                model: &quote.model,
            }),
        ),
        Outcome::Failure(diagnostic) => page::render(
            &state.title,
            &features,
            Some(Notice::Error(&diagnostic.message())),
        ),
    };
    Html(html)
}

/// Collect each field on its own, skipping the ones that fail
fn lenient_echo(collector: &InputCollector, fields: &HashMap<String, String>) -> FeatureVector {
    let mut shown = FeatureVector::defaults();
    for (key, value) in fields {
        if let Ok(single) = collector.collect([(key, value)]) {
            if let Some(field) = field_by_key(key) {
                shown.0[field.index] = single.get(field);
            }
        }
    }
    shown
}

/// JSON prediction; missing keys take their defaults
async fn predict_json(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<HashMap<String, serde_json::Value>>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return invalid_input(&state, format!("Invalid input: {}", rejection.body_text()));
        }
    };

    let pairs = body.iter().map(|(key, value)| {
        let text = match value {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (key.as_str(), text)
    });

    let features = match state.service.collector().collect(pairs) {
        Ok(features) => features,
        Err(e) => return invalid_input(&state, format!("Invalid input: {e}")),
    };

    let submission = state.submit(features).await;
    let (code, body) = PredictResponse::from_submission(&submission);
    (code, Json(body)).into_response()
}

/// 400 with the prediction response shape, for bodies refused before prediction
fn invalid_input(state: &AppState, message: String) -> Response {
    state.reject(&message);
    let body = PredictResponse::error(
        message,
        "invalid_input",
        ScalerStatus::NotLoaded.label().to_string(),
    );
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// The feature schema
async fn features() -> impl IntoResponse {
    Json(&FEATURES[..])
}

/// Load the estimator fresh and describe it
async fn model(State(state): State<Arc<AppState>>) -> Response {
    let service = state.service.clone();
    match tokio::task::spawn_blocking(move || service.describe_model()).await {
        Ok(Ok(summary)) => (StatusCode::OK, Json(summary)).into_response(),
        Ok(Err(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: format!("Error loading the model: {e}"),
                kind: e.kind().to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
                kind: "task".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Health check response - 200 while the process is serving; degraded artifacts are reported in the body
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.health_registry.health().await))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/v1/predict", post(predict_json))
        .route("/api/v1/features", get(features))
        .route("/api/v1/model", get(model))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
