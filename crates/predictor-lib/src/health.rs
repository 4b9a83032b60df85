//! Health check infrastructure for the prediction service
//!
//! Artifacts are re-read on every submission, so health reflects what the
//! most recent load saw. A missing or broken estimator degrades the service
//! but never takes it out of rotation: the next submission may succeed.

use crate::error::ArtifactError;
use crate::models::ModelSummary;
use crate::predictor::{Diagnostic, Outcome, ScalerStatus, Submission};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Last load succeeded
    Healthy,
    /// Last load failed; submissions report a diagnostic until the file is fixed
    Degraded,
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const ESTIMATOR: &str = "estimator";
    pub const SCALER: &str = "scaler";
}

/// Health registry shared by the HTTP handlers
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Record the result of the startup probe of the estimator
    pub async fn record_probe(&self, probe: &Result<ModelSummary, ArtifactError>) {
        match probe {
            Ok(_) => self.set_healthy(components::ESTIMATOR).await,
            Err(e) => self.set_degraded(components::ESTIMATOR, e.to_string()).await,
        }
    }

    /// Record the artifact side of a finished submission
    pub async fn record_submission(&self, submission: &Submission) {
        match &submission.outcome {
            Outcome::Failure(Diagnostic::ArtifactUnavailable(e)) => {
                self.set_degraded(components::ESTIMATOR, e.to_string()).await;
            }
            _ => self.set_healthy(components::ESTIMATOR).await,
        }

        match &submission.scaler {
            ScalerStatus::Unreadable(reason) => {
                self.set_degraded(components::SCALER, reason.clone()).await;
            }
            ScalerStatus::Absent | ScalerStatus::Applied(_) => {
                self.set_healthy(components::SCALER).await;
            }
            ScalerStatus::NotLoaded => {}
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = if components
            .values()
            .any(|c| c.status == ComponentStatus::Degraded)
        {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        };
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        if *self.ready.read().await {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            }
        }
    }
}
