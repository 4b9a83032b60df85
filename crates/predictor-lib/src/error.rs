//! Error types for artifact loading, input collection and prediction

use std::path::PathBuf;
use thiserror::Error;

/// The estimator (or scaler) file could not be turned into a usable artifact.
///
/// Every variant is an "artifact unavailable" condition: prediction does not
/// proceed when the estimator fails to load.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decompress {}: {source}", path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported or corrupt artifact {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("artifact {} exceeds {limit} bytes once decompressed", path.display())]
    TooLarge { path: PathBuf, limit: u64 },
}

impl ArtifactError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArtifactError::NotFound(_))
    }

    /// Short machine-readable label, used for metrics and JSON responses
    pub fn kind(&self) -> &'static str {
        match self {
            ArtifactError::NotFound(_) => "not_found",
            ArtifactError::Io { .. } => "io",
            ArtifactError::Decompress { .. } => "decompress",
            ArtifactError::Format { .. } => "format",
            ArtifactError::ChecksumMismatch { .. } => "checksum_mismatch",
            ArtifactError::TooLarge { .. } => "too_large",
        }
    }
}

/// Reshape, scaling or inference failed
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("{stage} expects {expected} features, got {actual}")]
    Shape {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model returned a non-finite value ({0})")]
    NonFinite(f64),
}

/// A submitted value was refused before reaching the predictor
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{field}: '{value}' is not a finite number")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field}: {value} is below the minimum of {min}")]
    BelowMinimum {
        field: &'static str,
        value: f64,
        min: f64,
    },

    #[error("{field}: {value} must be 0 or 1")]
    NotBinary { field: &'static str, value: f64 },
}
