//! Service configuration

use anyhow::{Context, Result};
use predictor_lib::artifact::{
    LoadOptions, DEFAULT_MAX_ARTIFACT_BYTES, DEFAULT_MODEL_PATH, DEFAULT_SCALER_PATH,
};
use predictor_lib::ArtifactPaths;
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for the form, JSON API and health/metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Estimator artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Scaler artifact; an empty value disables scaling
    #[serde(default = "default_scaler_path")]
    pub scaler_path: String,

    /// Expected SHA-256 of the compressed estimator file
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Maximum decompressed artifact size in bytes
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,

    /// Page title
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

fn default_scaler_path() -> String {
    DEFAULT_SCALER_PATH.to_string()
}

fn default_max_artifact_bytes() -> u64 {
    DEFAULT_MAX_ARTIFACT_BYTES
}

fn default_title() -> String {
    "Boston Housing Price Prediction".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            model_path: default_model_path(),
            scaler_path: default_scaler_path(),
            model_sha256: None,
            max_artifact_bytes: default_max_artifact_bytes(),
            title: default_title(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional `predictor.toml` and `PREDICTOR_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("predictor").required(false))
            .add_source(config::Environment::with_prefix("PREDICTOR"))
            .build()
            .context("Failed to read configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Artifact locations and load options for the prediction service
    pub fn artifact_paths(&self) -> ArtifactPaths {
        let scaler = self.scaler_path.trim();
        ArtifactPaths {
            model: self.model_path.clone(),
            scaler: (!scaler.is_empty()).then(|| PathBuf::from(scaler)),
            options: LoadOptions {
                expected_sha256: self
                    .model_sha256
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                max_bytes: self.max_artifact_bytes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = ServiceConfig::from_config(config::Config::default()).unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.model_path, PathBuf::from("model_trained_regressor.pkl.gz"));

        let paths = config.artifact_paths();
        assert_eq!(paths.scaler, Some(PathBuf::from("scaler.pkl.gz")));
        assert!(paths.options.expected_sha256.is_none());
    }

    #[test]
    fn test_overrides() {
        let source = config::Config::builder()
            .set_override("api_port", 9090)
            .unwrap()
            .set_override("model_path", "/models/boston.onnx.gz")
            .unwrap()
            .set_override("scaler_path", "")
            .unwrap()
            .set_override("model_sha256", " abcd ")
            .unwrap()
            .build()
            .unwrap();

        let config = ServiceConfig::from_config(source).unwrap();
        assert_eq!(config.api_port, 9090);

        let paths = config.artifact_paths();
        assert_eq!(paths.model, PathBuf::from("/models/boston.onnx.gz"));
        assert!(paths.scaler.is_none());
        assert_eq!(paths.options.expected_sha256.as_deref(), Some("abcd"));
    }
}
