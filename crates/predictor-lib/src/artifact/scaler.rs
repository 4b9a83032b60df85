//! Feature scalers fitted alongside the estimator

use crate::error::PredictionError;
use crate::models::{FeatureVector, NUM_FEATURES};
use serde::{Deserialize, Serialize};

/// A fitted per-column transform applied before prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    pub fn kind(&self) -> &'static str {
        match self {
            Scaler::Standard { .. } => "standard",
            Scaler::MinMax { .. } => "min_max",
        }
    }

    /// Transform a vector column by column
    pub fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PredictionError> {
        let (offsets, scale) = match self {
            Scaler::Standard { mean, scale } => (mean, scale),
            Scaler::MinMax { min, scale } => (min, scale),
        };
        for len in [offsets.len(), scale.len()] {
            if len != NUM_FEATURES {
                return Err(PredictionError::Shape {
                    stage: "scaler",
                    expected: len,
                    actual: NUM_FEATURES,
                });
            }
        }

        let mut out = *features;
        for (i, x) in out.0.iter_mut().enumerate() {
            *x = match self {
                // Zero-variance columns are left unscaled
                Scaler::Standard { .. } if scale[i] == 0.0 => *x - offsets[i],
                Scaler::Standard { .. } => (*x - offsets[i]) / scale[i],
                Scaler::MinMax { .. } => *x * scale[i] + offsets[i],
            };
        }
        Ok(out)
    }
}
