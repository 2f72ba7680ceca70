//! The fitted churn estimator.
//!
//! A model artifact is a JSON pipeline: column transformers that encode a
//! [`CustomerRecord`] into features, followed by a binary classifier. The
//! classifier is either stored inline as logistic regression weights or
//! points at an ONNX graph next to the artifact.
//!
//! ```json
//! {
//!   "features": [
//!     {
//!       "kind": "one_hot",
//!       "column": "Contract",
//!       "categories": ["Month-to-month", "One year", "Two year"]
//!     },
//!     {"kind": "numeric", "column": "tenure", "mean": 32.37, "scale": 24.56}
//!   ],
//!   "classifier": {
//!     "kind": "logistic",
//!     "coefficients": [0.61, -0.12, -0.73, -0.88],
//!     "intercept": -1.02
//!   }
//! }
//! ```

mod encoder;
mod logistic;
mod onnx;

pub use encoder::{ColumnTransform, FeatureEncoder, HandleUnknown};
pub use logistic::LogisticRegression;
pub use onnx::{OnnxClassifier, OnnxOutput};

use crate::error::ModelError;
use crate::models::CustomerRecord;
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Cutoff a fitted classifier applies when asked for a label directly.
pub const DEFAULT_DECISION_BOUNDARY: f64 = 0.5;

/// A fitted binary classifier over customer records.
pub trait Estimator: Send + Sync {
    /// Positive-class (churn) probability per record, in input order.
    fn predict_proba(&self, records: &[CustomerRecord]) -> Result<Vec<f64>, ModelError>;

    /// Class label per record using the estimator's own decision rule.
    fn predict(&self, records: &[CustomerRecord]) -> Result<Vec<u8>, ModelError> {
        Ok(self
            .predict_proba(records)?
            .into_iter()
            .map(|p| u8::from(p > DEFAULT_DECISION_BOUNDARY))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierSpec {
    Logistic(LogisticRegression),
    Onnx {
        path: String,
        #[serde(default)]
        output: OnnxOutput,
    },
}

#[derive(Debug, Deserialize)]
struct PipelineSpec {
    features: FeatureEncoder,
    classifier: ClassifierSpec,
}

enum Classifier {
    Logistic(LogisticRegression),
    Onnx(OnnxClassifier),
}

impl Classifier {
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        match self {
            Classifier::Logistic(model) => Ok(model.predict_proba(features)),
            Classifier::Onnx(model) => model.predict_proba(features),
        }
    }
}

/// Feature encoder plus classifier, loaded from a JSON artifact.
pub struct Pipeline {
    encoder: FeatureEncoder,
    classifier: Classifier,
}

impl Pipeline {
    pub fn logistic(
        encoder: FeatureEncoder,
        model: LogisticRegression,
    ) -> Result<Self, ModelError> {
        encoder.check_columns()?;
        if model.coefficients.len() != encoder.width() {
            return Err(ModelError::InvalidArtifact(format!(
                "classifier has {} coefficients but features produce {} columns",
                model.coefficients.len(),
                encoder.width()
            )));
        }
        Ok(Self {
            encoder,
            classifier: Classifier::Logistic(model),
        })
    }

    /// Reads a pipeline artifact. ONNX paths resolve relative to the artifact.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let spec: PipelineSpec = serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        match spec.classifier {
            ClassifierSpec::Logistic(model) => Self::logistic(spec.features, model),
            ClassifierSpec::Onnx {
                path: graph,
                output,
            } => {
                spec.features.check_columns()?;
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                let model = OnnxClassifier::load(&base.join(graph), spec.features.width(), output)?;
                Ok(Self {
                    encoder: spec.features,
                    classifier: Classifier::Onnx(model),
                })
            }
        }
    }

    pub fn width(&self) -> usize {
        self.encoder.width()
    }
}

impl Estimator for Pipeline {
    fn predict_proba(&self, records: &[CustomerRecord]) -> Result<Vec<f64>, ModelError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let features = self.encoder.encode(records)?;
        Ok(self.classifier.predict_proba(&features)?.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::sample_record;

    pub(crate) const ARTIFACT: &str = r#"{
        "features": [
            {
                "kind": "one_hot",
                "column": "Contract",
                "categories": ["Month-to-month", "One year", "Two year"]
            },
            {"kind": "numeric", "column": "tenure", "mean": 32.0, "scale": 24.0},
            {"kind": "numeric", "column": "MonthlyCharges", "mean": 64.0, "scale": 30.0}
        ],
        "classifier": {
            "kind": "logistic",
            "coefficients": [0.8, -0.4, -1.2, -0.9, 0.5],
            "intercept": -0.6
        }
    }"#;

    fn write_artifact(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_logistic_pipeline_and_scores() {
        let (_dir, path) = write_artifact(ARTIFACT);
        let pipeline = Pipeline::load(&path).unwrap();
        assert_eq!(pipeline.width(), 5);

        let mut loyal = sample_record();
        loyal.contract = "Two year".into();
        loyal.tenure = 72;

        let proba = pipeline.predict_proba(&[sample_record(), loyal]).unwrap();
        assert_eq!(proba.len(), 2);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(proba[0] > proba[1]);
    }

    #[test]
    fn default_rule_is_strictly_above_half() {
        let encoder = FeatureEncoder::new(vec![ColumnTransform::Numeric {
            column: "tenure".into(),
            mean: 1.0,
            scale: 1.0,
        }]);
        let pipeline = Pipeline::logistic(
            encoder,
            LogisticRegression {
                coefficients: vec![1.0],
                intercept: 0.0,
            },
        )
        .unwrap();

        // tenure 1 encodes to 0, which scores exactly 0.5.
        assert_eq!(pipeline.predict_proba(&[sample_record()]).unwrap(), vec![0.5]);
        assert_eq!(pipeline.predict(&[sample_record()]).unwrap(), vec![0]);
    }

    #[test]
    fn rejects_coefficient_count_mismatch() {
        let (_dir, path) = write_artifact(
            r#"{
                "features": [{"kind": "numeric", "column": "tenure"}],
                "classifier": {"kind": "logistic", "coefficients": [1.0, 2.0], "intercept": 0.0}
            }"#,
        );
        assert!(matches!(
            Pipeline::load(&path),
            Err(ModelError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Pipeline::load(&dir.path().join("nope.json")),
            Err(ModelError::Io { .. })
        ));

        let (_dir, path) = write_artifact("{ not json");
        assert!(matches!(Pipeline::load(&path), Err(ModelError::Parse { .. })));
    }

    #[test]
    fn onnx_classifier_resolves_relative_to_artifact() {
        let (_dir, path) = write_artifact(
            r#"{
                "features": [{"kind": "numeric", "column": "tenure"}],
                "classifier": {"kind": "onnx", "path": "missing.onnx", "output": "logit"}
            }"#,
        );
        let err = Pipeline::load(&path).err().unwrap();
        assert!(matches!(err, ModelError::Onnx(ref msg) if msg.contains("missing.onnx")));
    }

    /// Pipeline over `testdata/<graph>`, which scores `2 * x0 - x1 + 0.5` on
    /// `x0 = tenure - 1` and `x1 = (MonthlyCharges - 20) / 10`.
    fn onnx_pipeline(graph: &str, output: &str) -> (tempfile::TempDir, Pipeline) {
        let graph = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(graph);
        let artifact = serde_json::json!({
            "features": [
                {"kind": "numeric", "column": "tenure", "mean": 1.0, "scale": 1.0},
                {"kind": "numeric", "column": "MonthlyCharges", "mean": 20.0, "scale": 10.0}
            ],
            "classifier": {"kind": "onnx", "path": graph, "output": output}
        });
        let (dir, path) = write_artifact(&artifact.to_string());
        let pipeline = Pipeline::load(&path).unwrap();
        (dir, pipeline)
    }

    fn onnx_batch() -> Vec<CustomerRecord> {
        let mut heavy = sample_record();
        heavy.tenure = 3;
        heavy.monthly_charges = 30.0;
        vec![sample_record(), heavy]
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn onnx_logit_output_goes_through_sigmoid() {
        let (_dir, pipeline) = onnx_pipeline("logit.onnx", "logit");
        assert_eq!(pipeline.width(), 2);

        let proba = pipeline.predict_proba(&onnx_batch()).unwrap();
        assert_close(&proba, &[logistic::sigmoid(0.5), logistic::sigmoid(3.5)]);
        assert_eq!(pipeline.predict(&onnx_batch()).unwrap(), vec![1, 1]);
    }

    #[test]
    fn onnx_probability_output_is_used_directly() {
        let (_dir, pipeline) = onnx_pipeline("probability.onnx", "probability");
        let proba = pipeline.predict_proba(&onnx_batch()).unwrap();
        assert_close(&proba, &[logistic::sigmoid(0.5), logistic::sigmoid(3.5)]);
    }

    #[test]
    fn onnx_two_column_output_takes_positive_class() {
        let (_dir, pipeline) = onnx_pipeline("two_class.onnx", "probability");
        let proba = pipeline.predict_proba(&onnx_batch()).unwrap();
        assert_close(&proba, &[logistic::sigmoid(0.5), logistic::sigmoid(3.5)]);
    }

    #[test]
    fn onnx_logit_output_read_as_probability_is_clamped() {
        // The raw logit 3.5 is outside [0, 1].
        let (_dir, pipeline) = onnx_pipeline("logit.onnx", "probability");
        let proba = pipeline.predict_proba(&onnx_batch()).unwrap();
        assert_close(&proba, &[0.5, 1.0]);
    }

    #[test]
    fn empty_batch_skips_encoding() {
        let (_dir, path) = write_artifact(ARTIFACT);
        let pipeline = Pipeline::load(&path).unwrap();
        assert!(pipeline.predict_proba(&[]).unwrap().is_empty());
    }
}
