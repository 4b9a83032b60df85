//! ONNX inference using tract
//!
//! Estimators exported to ONNX (for example with skl2onnx) take a single
//! `[1, 13]` f32 input and produce the prediction as their first output value.

use super::Regressor;
use crate::error::PredictionError;
use crate::models::{ModelSummary, NUM_FEATURES};
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based estimator
pub struct OnnxRegressor {
    model: TractModel,
    node_count: usize,
}

impl OnnxRegressor {
    /// Parse and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self> {
        let optimized = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?;
        let node_count = optimized.nodes().len();
        let model = optimized
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model, node_count })
    }

    /// Convert a row to the `[1, 13]` input tensor
    fn row_to_tensor(row: &[f64]) -> Result<Tensor, PredictionError> {
        if row.len() != NUM_FEATURES {
            return Err(PredictionError::Shape {
                stage: "estimator",
                expected: NUM_FEATURES,
                actual: row.len(),
            });
        }
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)
            .map(Tensor::from)
            .map_err(|e| PredictionError::Inference(e.to_string()))
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, row: &[f64]) -> Result<f64, PredictionError> {
        let start = Instant::now();
        let input = Self::row_to_tensor(row)?;

        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PredictionError::Inference(format!("{e:#}")))?;
        let output = result
            .first()
            .ok_or_else(|| PredictionError::Inference("no output from model".to_string()))?;

        let values = output
            .cast_to::<f64>()
            .map_err(|e| PredictionError::Inference(format!("{e:#}")))?;
        let value = values
            .as_slice::<f64>()
            .map_err(|e| PredictionError::Inference(format!("{e:#}")))?
            .first()
            .copied()
            .ok_or_else(|| PredictionError::Inference("model output is empty".to_string()))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(value)
    }

    fn summary(&self) -> ModelSummary {
        ModelSummary::new("onnx").with_param("nodes", self.node_count)
    }
}

/// Hand-built ONNX graphs for tests
#[cfg(test)]
pub(crate) mod test_graphs {
    use prost::Message;
    use tract_onnx::pb::{
        tensor_proto::DataType,
        tensor_shape_proto::{dimension, Dimension},
        type_proto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorProto,
        TensorShapeProto, TypeProto, ValueInfoProto,
    };

    fn f32_value(name: &str, dims: &[i64]) -> ValueInfoProto {
        let dim = dims
            .iter()
            .map(|d| Dimension {
                value: Some(dimension::Value::DimValue(*d)),
                ..Default::default()
            })
            .collect();
        ValueInfoProto {
            name: name.to_string(),
            r#type: Some(TypeProto {
                value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                    elem_type: DataType::Float as i32,
                    shape: Some(TensorShapeProto { dim }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn f32_initializer(name: &str, dims: &[i64], values: Vec<f32>) -> TensorProto {
        TensorProto {
            name: name.to_string(),
            dims: dims.to_vec(),
            data_type: DataType::Float as i32,
            float_data: values,
            ..Default::default()
        }
    }

    fn node(op_type: &str, inputs: &[&str], output: &str) -> NodeProto {
        NodeProto {
            op_type: op_type.to_string(),
            input: inputs.iter().map(|i| i.to_string()).collect(),
            output: vec![output.to_string()],
            name: output.to_string(),
            ..Default::default()
        }
    }

    /// `y = x . [1, 2, ..., 13] + 2` over a `[1, 13]` input
    pub(crate) fn weighted_sum() -> Vec<u8> {
        let weights = (1..=13).map(|w| w as f32).collect();
        let graph = GraphProto {
            name: "weighted_sum".to_string(),
            node: vec![node("MatMul", &["x", "w"], "xw"), node("Add", &["xw", "b"], "y")],
            initializer: vec![
                f32_initializer("w", &[13, 1], weights),
                f32_initializer("b", &[1], vec![2.0]),
            ],
            input: vec![f32_value("x", &[1, 13])],
            output: vec![f32_value("y", &[1, 1])],
            ..Default::default()
        };
        ModelProto {
            ir_version: 8,
            opset_import: vec![OperatorSetIdProto {
                domain: String::new(),
                version: 13,
            }],
            producer_name: "predictor-lib-tests".to_string(),
            graph: Some(graph),
            ..Default::default()
        }
        .encode_to_vec()
    }
}
