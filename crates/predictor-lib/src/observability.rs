//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, artifact load failures, model info)
//! - Structured JSON logging with tracing

use crate::predictor::{Outcome, ScalerStatus, Submission};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for submission latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    submission_latency_seconds: Histogram,
    predictions: IntCounterVec,
    artifact_load_errors: IntCounterVec,
    unscaled_submissions: IntCounter,
    rejected_inputs: IntCounter,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            submission_latency_seconds: register_histogram!(
                "housing_predictor_submission_latency_seconds",
                "Time spent loading artifacts and predicting one submission",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register submission_latency_seconds"),

            predictions: register_int_counter_vec!(
                "housing_predictor_predictions_total",
                "Submissions by outcome (success, artifact_unavailable, prediction_failure)",
                &["outcome"]
            )
            .expect("Failed to register predictions_total"),

            artifact_load_errors: register_int_counter_vec!(
                "housing_predictor_artifact_load_errors_total",
                "Artifact load failures by artifact and error kind",
                &["artifact", "kind"]
            )
            .expect("Failed to register artifact_load_errors_total"),

            unscaled_submissions: register_int_counter!(
                "housing_predictor_unscaled_submissions_total",
                "Submissions predicted on raw inputs because no scaler was available"
            )
            .expect("Failed to register unscaled_submissions_total"),

            rejected_inputs: register_int_counter!(
                "housing_predictor_rejected_inputs_total",
                "Submissions refused by the input collector"
            )
            .expect("Failed to register rejected_inputs_total"),

            model_info: register_gauge_vec!(
                "housing_predictor_model_info",
                "Information about the most recently loaded estimator",
                &["kind", "sha256"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    /// Record everything observable about a finished submission
    pub fn observe_submission(&self, submission: &Submission) {
        let inner = self.inner();
        inner
            .submission_latency_seconds
            .observe(submission.elapsed.as_secs_f64());

        match &submission.outcome {
            Outcome::Success(quote) => {
                inner.predictions.with_label_values(&["success"]).inc();
                self.set_model_info(&quote.model.kind, quote.model.sha256.as_deref().unwrap_or(""));
            }
            Outcome::Failure(diagnostic) => {
                inner
                    .predictions
                    .with_label_values(&[diagnostic.kind()])
                    .inc();
                if let crate::predictor::Diagnostic::ArtifactUnavailable(e) = diagnostic {
                    self.inc_artifact_load_error("estimator", e.kind());
                }
            }
        }

        match &submission.scaler {
            ScalerStatus::Absent => inner.unscaled_submissions.inc(),
            ScalerStatus::Unreadable(_) => {
                inner.unscaled_submissions.inc();
                self.inc_artifact_load_error("scaler", "unreadable");
            }
            ScalerStatus::Applied(_) | ScalerStatus::NotLoaded => {}
        }
    }

    pub fn inc_artifact_load_error(&self, artifact: &str, kind: &str) {
        self.inner()
            .artifact_load_errors
            .with_label_values(&[artifact, kind])
            .inc();
    }

    pub fn inc_rejected_inputs(&self) {
        self.inner().rejected_inputs.inc();
    }

    /// Replace the model info series with the given estimator
    pub fn set_model_info(&self, kind: &str, sha256: &str) {
        let gauge = &self.inner().model_info;
        gauge.reset();
        gauge.with_label_values(&[kind, sha256]).set(1.0);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log the outcome of one submission
    pub fn log_submission(&self, submission: &Submission) {
        let elapsed_us = submission.elapsed.as_micros() as u64;
        match &submission.outcome {
            Outcome::Success(quote) => {
                info!(
                    event = "prediction_generated",
                    instance = %self.instance,
                    price = quote.price,
                    formatted = %quote.formatted,
                    scaled = quote.scaled,
                    model_kind = %quote.model.kind,
                    elapsed_us = elapsed_us,
                    "Generated price prediction"
                );
            }
            Outcome::Failure(diagnostic) => {
                warn!(
                    event = "prediction_failed",
                    instance = %self.instance,
                    kind = diagnostic.kind(),
                    diagnostic = %diagnostic.message(),
                    elapsed_us = elapsed_us,
                    "Submission failed"
                );
            }
        }
    }

    /// Log a submission refused before prediction
    pub fn log_rejected_input(&self, reason: &str) {
        info!(
            event = "input_rejected",
            instance = %self.instance,
            reason = %reason,
            "Submission refused by input collector"
        );
    }

    /// Log the startup artifact probe
    pub fn log_probe(&self, model_path: &str, result: Result<&str, &str>) {
        match result {
            Ok(kind) => info!(
                event = "estimator_probe",
                instance = %self.instance,
                path = %model_path,
                model_kind = %kind,
                "Estimator artifact is loadable"
            ),
            Err(error) => warn!(
                event = "estimator_probe",
                instance = %self.instance,
                path = %model_path,
                error = %error,
                "Estimator artifact is unavailable; submissions will report an error until it is fixed"
            ),
        }
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            port = port,
            "Housing price predictor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Housing price predictor shutting down"
        );
    }
}
