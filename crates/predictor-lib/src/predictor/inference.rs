//! The prediction pipeline: coerce, scale, reshape, predict

use crate::artifact::{Regressor, Scaler};
use crate::error::PredictionError;
use crate::models::FeatureVector;

/// Run one prediction.
///
/// CHAS and RAD are truncated to integers first, then the scaler (when
/// present) is applied, then the single row is handed to the estimator.
pub fn predict(
    features: &FeatureVector,
    estimator: &dyn Regressor,
    scaler: Option<&Scaler>,
) -> Result<f64, PredictionError> {
    let coerced = features.coerced();

    let row = match scaler {
        Some(scaler) => scaler.transform(&coerced)?,
        None => coerced,
    };

    let value = estimator.predict(row.values())?;
    if !value.is_finite() {
        return Err(PredictionError::NonFinite(value));
    }
    Ok(value)
}
