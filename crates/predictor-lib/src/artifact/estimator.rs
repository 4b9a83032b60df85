//! JSON-encoded estimators and the prediction trait

use crate::error::PredictionError;
use crate::models::ModelSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trait for estimator implementations
pub trait Regressor: Send + Sync {
    /// Predict a single row, in the feature order the model was fitted with
    fn predict(&self, row: &[f64]) -> Result<f64, PredictionError>;

    /// Kind and fitted hyperparameters, for display
    fn summary(&self) -> ModelSummary;
}

/// Estimator document, tagged by `kind`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum EstimatorDocument {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

impl EstimatorDocument {
    pub(crate) fn into_regressor(self) -> Result<Box<dyn Regressor>, String> {
        match self {
            EstimatorDocument::Linear(model) => Ok(Box::new(model)),
            EstimatorDocument::TreeEnsemble(model) => {
                model.validate()?;
                Ok(Box::new(model))
            }
        }
    }
}

fn summarize(kind: &str, params: &BTreeMap<String, serde_json::Value>) -> ModelSummary {
    params
        .iter()
        .fold(ModelSummary::new(kind), |summary, (name, value)| match value {
            serde_json::Value::String(s) => summary.with_param(name, s),
            other => summary.with_param(name, other),
        })
}

/// Linear regression: `intercept + coefficients · row`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl Regressor for LinearModel {
    fn predict(&self, row: &[f64]) -> Result<f64, PredictionError> {
        if row.len() != self.coefficients.len() {
            return Err(PredictionError::Shape {
                stage: "estimator",
                expected: self.coefficients.len(),
                actual: row.len(),
            });
        }
        let dot: f64 = self.coefficients.iter().zip(row).map(|(c, x)| c * x).sum();
        Ok(self.intercept + dot)
    }

    fn summary(&self) -> ModelSummary {
        summarize("linear", &self.params)
    }
}

/// How per-tree outputs are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Random forest style average
    #[default]
    Mean,
    /// Gradient boosting style sum
    Sum,
}

/// One node of a decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// `row[feature] <= threshold` goes left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A decision tree stored as a flat node list rooted at index 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn evaluate(&self, row: &[f64]) -> Result<f64, PredictionError> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = row.get(*feature).ok_or(PredictionError::Shape {
                        stage: "estimator",
                        expected: feature + 1,
                        actual: row.len(),
                    })?;
                    idx = if *x <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(PredictionError::Inference(format!(
                        "tree references missing node {idx}"
                    )))
                }
            }
        }
        Err(PredictionError::Inference("tree traversal did not reach a leaf".to_string()))
    }
}

/// Ensemble of decision trees (random forest or gradient boosting)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub trees: Vec<Tree>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

fn default_learning_rate() -> f64 {
    1.0
}

impl TreeEnsemble {
    /// Reject ensembles whose structure cannot be traversed
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("tree ensemble has no trees".to_string());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for node in &tree.nodes {
                if let TreeNode::Split { left, right, .. } = node {
                    let len = tree.nodes.len();
                    if *left >= len || *right >= len {
                        return Err(format!("tree {t} has a child index outside 0..{len}"));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Regressor for TreeEnsemble {
    fn predict(&self, row: &[f64]) -> Result<f64, PredictionError> {
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(row)?;
        }
        let combined = match self.aggregation {
            Aggregation::Mean => total / self.trees.len().max(1) as f64,
            Aggregation::Sum => total,
        };
        Ok(self.base_score + self.learning_rate * combined)
    }

    fn summary(&self) -> ModelSummary {
        summarize("tree_ensemble", &self.params)
            .with_param("n_trees", self.trees.len())
            .with_param(
                "aggregation",
                match self.aggregation {
                    Aggregation::Mean => "mean",
                    Aggregation::Sum => "sum",
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
        }
    }

    #[test]
    fn test_linear_prediction() {
        let model = LinearModel {
            coefficients: vec![2.0, -1.0],
            intercept: 0.5,
            params: BTreeMap::new(),
        };
        assert_eq!(model.predict(&[3.0, 1.0]).unwrap(), 5.5);
    }

    #[test]
    fn test_linear_shape_mismatch() {
        let model = LinearModel {
            coefficients: vec![1.0; 12],
            intercept: 0.0,
            params: BTreeMap::new(),
        };
        let err = model.predict(&[0.0; 13]).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::Shape {
                expected: 12,
                actual: 13,
                ..
            }
        ));
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = TreeEnsemble {
            trees: vec![stump(5, 6.5, 20.0, 30.0), stump(12, 10.0, 28.0, 18.0)],
            aggregation: Aggregation::Mean,
            base_score: 0.0,
            learning_rate: 1.0,
            params: BTreeMap::new(),
        };
        forest.validate().unwrap();

        let mut row = [0.0; 13];
        row[5] = 7.0;
        row[12] = 5.0;
        assert_eq!(forest.predict(&row).unwrap(), 29.0);
    }

    #[test]
    fn test_boosting_sums_with_learning_rate() {
        let boosted = TreeEnsemble {
            trees: vec![stump(0, 1.0, 1.0, -1.0), stump(0, 1.0, 3.0, -3.0)],
            aggregation: Aggregation::Sum,
            base_score: 22.5,
            learning_rate: 0.5,
            params: BTreeMap::new(),
        };
        assert_eq!(boosted.predict(&[0.5]).unwrap(), 24.5);
    }

    #[test]
    fn test_split_on_missing_feature() {
        let forest = TreeEnsemble {
            trees: vec![stump(20, 0.0, 1.0, 2.0)],
            aggregation: Aggregation::Mean,
            base_score: 0.0,
            learning_rate: 1.0,
            params: BTreeMap::new(),
        };
        assert!(matches!(
            forest.predict(&[0.0; 13]),
            Err(PredictionError::Shape { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_dangling_children() {
        let forest = TreeEnsemble {
            trees: vec![Tree {
                nodes: vec![TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 7,
                }],
            }],
            aggregation: Aggregation::Mean,
            base_score: 0.0,
            learning_rate: 1.0,
            params: BTreeMap::new(),
        };
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_cyclic_tree_does_not_loop() {
        let tree = Tree {
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(matches!(
            tree.evaluate(&[1.0]),
            Err(PredictionError::Inference(_))
        ));
    }

    #[test]
    fn test_document_parsing() {
        let doc: EstimatorDocument = serde_json::from_value(serde_json::json!({
            "kind": "tree_ensemble",
            "aggregation": "sum",
            "base_score": 1.0,
            "trees": [{ "nodes": [
                { "feature": 0, "threshold": 0.5, "left": 1, "right": 2 },
                { "value": 10.0 },
                { "value": 20.0 }
            ]}],
            "params": { "n_estimators": 1, "criterion": "squared_error" }
        }))
        .unwrap();

        let model = doc.into_regressor().unwrap();
        assert_eq!(model.predict(&[0.0]).unwrap(), 11.0);

        let summary = model.summary();
        assert_eq!(summary.kind, "tree_ensemble");
        assert_eq!(summary.params["criterion"], "squared_error");
        assert_eq!(summary.params["n_estimators"], "1");
        assert_eq!(summary.params["aggregation"], "sum");
    }
}
