//! Library for housing price prediction
//!
//! This crate provides the core functionality for:
//! - Loading compressed estimator and scaler artifacts
//! - Collecting and validating the thirteen input features
//! - Running a prediction and formatting it as currency
//! - Health checks and observability

pub mod artifact;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use error::{ArtifactError, InputError, PredictionError};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{
    ArtifactPaths, Diagnostic, Outcome, PredictionService, Quote, ScalerStatus, Submission,
};
