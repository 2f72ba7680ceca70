//! Classifier backed by an exported ONNX graph, run with tract.

use crate::error::ModelError;
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::path::Path;
use tract_onnx::prelude::*;

use super::logistic::sigmoid;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// What the graph's first output holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnnxOutput {
    #[default]
    Probability,
    Logit,
}

pub struct OnnxClassifier {
    plan: OnnxPlan,
    width: usize,
    output: OnnxOutput,
}

fn onnx_err(e: impl std::fmt::Display) -> ModelError {
    ModelError::Onnx(e.to_string())
}

impl OnnxClassifier {
    /// Loads and optimizes the graph for a single `[1, width]` f32 input row.
    pub fn load(path: &Path, width: usize, output: OnnxOutput) -> Result<Self, ModelError> {
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, width)),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ModelError::Onnx(format!("{}: {}", path.display(), e)))?;

        log::debug!("Loaded ONNX classifier from {} ({} inputs)", path.display(), width);
        Ok(Self {
            plan,
            width,
            output,
        })
    }

    pub fn predict_proba(&self, features: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if features.ncols() != self.width {
            return Err(ModelError::Onnx(format!(
                "expected {} features, got {}",
                self.width,
                features.ncols()
            )));
        }

        let mut scores = Vec::with_capacity(features.nrows());
        for row in features.rows() {
            let input: Vec<f32> = row.iter().map(|&x| x as f32).collect();
            let tensor = Tensor::from_shape(&[1, self.width], &input).map_err(onnx_err)?;
            let outputs = self.plan.run(tvec!(tensor.into())).map_err(onnx_err)?;

            let view = outputs[0].to_array_view::<f32>().map_err(onnx_err)?;
            let values: Vec<f32> = view.iter().copied().collect();
            // Two columns are class probabilities; the positive class is the second.
            let raw = match values.as_slice() {
                [single] => *single as f64,
                [_, positive] => *positive as f64,
                other => {
                    return Err(ModelError::Onnx(format!(
                        "expected 1 or 2 output values per row, got {}",
                        other.len()
                    )))
                }
            };

            scores.push(match self.output {
                OnnxOutput::Probability => raw.clamp(0.0, 1.0),
                OnnxOutput::Logit => sigmoid(raw),
            });
        }

        Ok(Array1::from(scores))
    }
}
