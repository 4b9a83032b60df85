//! Prediction service facade
//!
//! One submission is a single linear pass: load the estimator, load the
//! optional scaler, predict, format. Artifacts are re-read from disk on
//! every call and nothing is retained between submissions.

mod inference;
mod input;
mod output;

pub use inference::predict;
pub use input::InputCollector;
pub use output::{format_currency, success_message, CURRENCY_SYMBOL};

use crate::artifact::{
    load_estimator, load_scaler, LoadOptions, Regressor, Scaler, DEFAULT_MODEL_PATH,
    DEFAULT_SCALER_PATH,
};
use crate::error::{ArtifactError, PredictionError};
use crate::models::{FeatureVector, ModelSummary};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Where the artifacts live and how to load them
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    /// `None` disables scaling entirely
    pub scaler: Option<PathBuf>,
    pub options: LoadOptions,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler: Some(PathBuf::from(DEFAULT_SCALER_PATH)),
            options: LoadOptions::default(),
        }
    }
}

/// What happened to the scaler during a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ScalerStatus {
    /// The estimator failed to load, so the scaler was never read
    NotLoaded,
    /// No scaler file (or none configured); raw inputs were used
    Absent,
    /// The scaler file exists but could not be loaded; raw inputs were used
    Unreadable(String),
    /// The scaler was applied
    Applied(String),
}

impl ScalerStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, ScalerStatus::Applied(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScalerStatus::NotLoaded => "not_loaded",
            ScalerStatus::Absent => "absent",
            ScalerStatus::Unreadable(_) => "unreadable",
            ScalerStatus::Applied(_) => "applied",
        }
    }
}

/// A successful prediction
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub price: f64,
    /// Currency string, e.g. `$24,531.20`
    pub formatted: String,
    pub message: String,
    pub scaled: bool,
    pub model: ModelSummary,
    /// The vector as submitted to the pipeline, before coercion
    pub features: FeatureVector,
}

/// A failed submission, converted to user-facing text
#[derive(Debug)]
pub enum Diagnostic {
    ArtifactUnavailable(ArtifactError),
    PredictionFailure(PredictionError),
}

impl Diagnostic {
    pub fn message(&self) -> String {
        match self {
            Diagnostic::ArtifactUnavailable(e) => format!("Error loading the model: {e}"),
            Diagnostic::PredictionFailure(e) => format!("Error making the prediction: {e}"),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::ArtifactUnavailable(_) => "artifact_unavailable",
            Diagnostic::PredictionFailure(_) => "prediction_failure",
        }
    }
}

/// Exactly one of success or failure
#[derive(Debug)]
pub enum Outcome {
    Success(Quote),
    Failure(Diagnostic),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// Result of one submission
#[derive(Debug)]
pub struct Submission {
    pub outcome: Outcome,
    pub scaler: ScalerStatus,
    pub elapsed: Duration,
}

/// Loads artifacts and produces predictions, one submission at a time
#[derive(Debug, Clone, Default)]
pub struct PredictionService {
    paths: ArtifactPaths,
    collector: InputCollector,
}

impl PredictionService {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            collector: InputCollector::new(),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn collector(&self) -> &InputCollector {
        &self.collector
    }

    /// Load the artifacts fresh and predict a price for `features`
    pub fn submit(&self, features: &FeatureVector) -> Submission {
        let start = Instant::now();

        let estimator = match load_estimator(&self.paths.model, &self.paths.options) {
            Ok(estimator) => estimator,
            Err(e) => {
                warn!(path = %self.paths.model.display(), error = %e, "Estimator unavailable");
                return Submission {
                    outcome: Outcome::Failure(Diagnostic::ArtifactUnavailable(e)),
                    scaler: ScalerStatus::NotLoaded,
                    elapsed: start.elapsed(),
                };
            }
        };

        let (scaler, status) = self.load_scaler();

        let outcome = match predict(features, &estimator, scaler.as_ref()) {
            Ok(price) => {
                let formatted = format_currency(price);
                debug!(price, formatted = %formatted, "Prediction completed");
                Outcome::Success(Quote {
                    price,
                    message: success_message(&formatted),
                    formatted,
                    scaled: status.is_applied(),
                    model: estimator.summary(),
                    features: *features,
                })
            }
            Err(e) => {
                warn!(error = %e, "Prediction failed");
                Outcome::Failure(Diagnostic::PredictionFailure(e))
            }
        };

        Submission {
            outcome,
            scaler: status,
            elapsed: start.elapsed(),
        }
    }

    /// Load the estimator fresh and describe it
    pub fn describe_model(&self) -> Result<ModelSummary, ArtifactError> {
        load_estimator(&self.paths.model, &self.paths.options).map(|e| e.summary())
    }

    fn load_scaler(&self) -> (Option<Scaler>, ScalerStatus) {
        let Some(path) = &self.paths.scaler else {
            return (None, ScalerStatus::Absent);
        };

        // The checksum pin applies to the estimator only
        let options = LoadOptions {
            expected_sha256: None,
            ..self.paths.options.clone()
        };

        match load_scaler(path, &options) {
            Ok(Some(scaler)) => {
                let kind = scaler.kind().to_string();
                (Some(scaler), ScalerStatus::Applied(kind))
            }
            Ok(None) => (None, ScalerStatus::Absent),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Scaler unreadable, predicting on raw inputs");
                (None, ScalerStatus::Unreadable(e.to_string()))
            }
        }
    }
}
