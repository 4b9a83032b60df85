//! Core data models for the housing price predictor

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of features expected by every estimator artifact
pub const NUM_FEATURES: usize = 13;

/// Index of the Charles River adjacency flag
pub const CHAS_INDEX: usize = 3;

/// Index of the highway accessibility index
pub const RAD_INDEX: usize = 8;

/// Columns truncated to integers before scaling and prediction
pub const INTEGER_COLUMNS: [usize; 2] = [CHAS_INDEX, RAD_INDEX];

/// How a field's value is constrained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// Any number at or above the floor
    Minimum { min: f64 },
    /// 0 or 1 after truncation
    Binary,
}

/// Semantic type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Float,
    Integer,
}

/// Declaration of one input field
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeatureField {
    /// Position in the feature vector
    pub index: usize,
    /// Form / JSON key
    pub key: &'static str,
    /// Short column name the model was trained with
    pub column: &'static str,
    /// Human-readable label
    pub label: &'static str,
    pub kind: FieldKind,
    pub default: f64,
    pub constraint: Constraint,
}

impl FeatureField {
    const fn float(index: usize, key: &'static str, column: &'static str, label: &'static str, default: f64) -> Self {
        Self {
            index,
            key,
            column,
            label,
            kind: FieldKind::Float,
            default,
            constraint: Constraint::Minimum { min: 0.0 },
        }
    }

    /// Step used by the HTML number input; floats take any precision
    pub fn step(&self) -> &'static str {
        match self.kind {
            FieldKind::Integer => "1",
            FieldKind::Float => "any",
        }
    }
}

/// The thirteen fields, in the order the estimator was fitted with
pub static FEATURES: [FeatureField; NUM_FEATURES] = [
    FeatureField::float(0, "crim", "CRIM", "Per-capita crime rate", 0.1),
    FeatureField::float(1, "zn", "ZN", "Residential land proportion", 25.0),
    FeatureField::float(2, "indus", "INDUS", "Non-retail business acres proportion", 5.0),
    FeatureField {
        index: CHAS_INDEX,
        key: "chas",
        column: "CHAS",
        label: "Charles River adjacency",
        kind: FieldKind::Integer,
        default: 0.0,
        constraint: Constraint::Binary,
    },
    FeatureField::float(4, "nox", "NOX", "Nitrogen oxide concentration", 0.5),
    FeatureField::float(5, "rm", "RM", "Average rooms per dwelling", 6.0),
    FeatureField::float(6, "age", "AGE", "Pre-1940 unit proportion", 60.0),
    FeatureField::float(7, "dis", "DIS", "Weighted distance to employment centers", 3.0),
    FeatureField {
        index: RAD_INDEX,
        key: "rad",
        column: "RAD",
        label: "Highway accessibility index",
        kind: FieldKind::Integer,
        default: 1.0,
        constraint: Constraint::Minimum { min: 0.0 },
    },
    FeatureField::float(9, "tax", "TAX", "Property tax rate", 300.0),
    FeatureField::float(10, "ptratio", "PTRATIO", "Pupil-teacher ratio", 15.0),
    FeatureField::float(11, "b", "B", "Demographic composition index", 400.0),
    FeatureField::float(12, "lstat", "LSTAT", "Lower-status population percentage", 10.0),
];

/// Look up a field by its key (case-insensitive, also accepts the column name)
pub fn field_by_key(key: &str) -> Option<&'static FeatureField> {
    FEATURES
        .iter()
        .find(|f| f.key.eq_ignore_ascii_case(key) || f.column.eq_ignore_ascii_case(key))
}

/// Ordered feature vector for one housing record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; NUM_FEATURES]);

impl FeatureVector {
    pub fn from_values(values: [f64; NUM_FEATURES]) -> Self {
        Self(values)
    }

    /// Vector made of every field's declared default
    pub fn defaults() -> Self {
        let mut values = [0.0; NUM_FEATURES];
        for field in &FEATURES {
            values[field.index] = field.default;
        }
        Self(values)
    }

    pub fn values(&self) -> &[f64; NUM_FEATURES] {
        &self.0
    }

    pub fn get(&self, field: &FeatureField) -> f64 {
        self.0[field.index]
    }

    /// Truncate CHAS and RAD toward zero; every other column is left untouched
    pub fn coerce_integer_columns(&mut self) {
        for idx in INTEGER_COLUMNS {
            self.0[idx] = self.0[idx].trunc();
        }
    }

    /// Copy with integer columns truncated
    pub fn coerced(mut self) -> Self {
        self.coerce_integer_columns();
        self
    }

    /// Values keyed by field key, for display and JSON echo
    pub fn to_named(&self) -> BTreeMap<&'static str, f64> {
        FEATURES.iter().map(|f| (f.key, self.0[f.index])).collect()
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Description of a loaded estimator, including its fitted hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ModelSummary {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
            sha256: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_table_is_ordered() {
        for (i, field) in FEATURES.iter().enumerate() {
            assert_eq!(field.index, i, "field {} out of order", field.key);
        }
    }

    #[test]
    fn test_defaults_vector() {
        let v = FeatureVector::defaults();
        assert_eq!(
            v.values(),
            &[0.1, 25.0, 5.0, 0.0, 0.5, 6.0, 60.0, 3.0, 1.0, 300.0, 15.0, 400.0, 10.0]
        );
    }

    #[test]
    fn test_coercion_only_touches_integer_columns() {
        let mut v = FeatureVector::defaults();
        v.0[CHAS_INDEX] = 1.9;
        v.0[RAD_INDEX] = 4.7;
        v.0[5] = 6.575;
        v.coerce_integer_columns();

        assert_eq!(v.0[CHAS_INDEX], 1.0);
        assert_eq!(v.0[RAD_INDEX], 4.0);
        assert_eq!(v.0[5], 6.575);
        assert_eq!(v.0[0], 0.1);
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(field_by_key("lstat").map(|f| f.index), Some(12));
        assert_eq!(field_by_key("PTRATIO").map(|f| f.index), Some(10));
        assert!(field_by_key("price").is_none());
    }

    #[test]
    fn test_model_summary_params() {
        let summary = ModelSummary::new("linear").with_param("fit_intercept", true);
        assert_eq!(summary.params["fit_intercept"], "true");
    }
}
