//! Input collection
//!
//! Turns named, string-typed submissions (form fields, JSON keys, CLI flags)
//! into a `FeatureVector`, applying declared defaults and per-field floors.

use crate::error::InputError;
use crate::models::{field_by_key, Constraint, FeatureField, FeatureVector};
use tracing::debug;

/// Collects the thirteen fields of a submission
#[derive(Debug, Clone, Copy, Default)]
pub struct InputCollector;

impl InputCollector {
    pub fn new() -> Self {
        Self
    }

    /// Build a vector from `(key, value)` pairs.
    ///
    /// Missing or blank fields take their default; unknown keys are ignored.
    pub fn collect<I, K, V>(&self, pairs: I) -> Result<FeatureVector, InputError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut vector = FeatureVector::defaults();
        for (key, value) in pairs {
            let Some(field) = field_by_key(key.as_ref()) else {
                debug!(key = key.as_ref(), "Ignoring unknown input field");
                continue;
            };
            let raw = value.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let parsed = raw.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                InputError::NotNumeric {
                    field: field.key,
                    value: raw.to_string(),
                }
            })?;
            vector.0[field.index] = Self::check(field, parsed)?;
        }
        Ok(vector)
    }

    /// Build a vector from already-numeric values, keyed like `collect`
    pub fn collect_numbers<I, K>(&self, pairs: I) -> Result<FeatureVector, InputError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut vector = FeatureVector::defaults();
        for (key, value) in pairs {
            let Some(field) = field_by_key(key.as_ref()) else {
                continue;
            };
            if !value.is_finite() {
                return Err(InputError::NotNumeric {
                    field: field.key,
                    value: value.to_string(),
                });
            }
            vector.0[field.index] = Self::check(field, value)?;
        }
        Ok(vector)
    }

    fn check(field: &FeatureField, value: f64) -> Result<f64, InputError> {
        match field.constraint {
            Constraint::Minimum { min } if value < min => Err(InputError::BelowMinimum {
                field: field.key,
                value,
                min,
            }),
            Constraint::Minimum { .. } => Ok(value),
            Constraint::Binary => {
                // Negative fractions would truncate to -0.0, so the sign is checked first
                if value >= 0.0 && (value.trunc() == 0.0 || value.trunc() == 1.0) {
                    Ok(value)
                } else {
                    Err(InputError::NotBinary {
                        field: field.key,
                        value,
                    })
                }
            }
        }
    }
}
