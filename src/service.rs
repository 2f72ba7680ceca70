//! Model wrapper shared by every request handler.

use crate::error::ModelError;
use crate::estimator::{Estimator, Pipeline};
use crate::models::{CustomerRecord, PredictionResult};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::Path;

const GENDERS: &[&str] = &["Male", "Female"];
const YES_NO: &[&str] = &["Yes", "No"];
const MULTIPLE_LINES: &[&str] = &["No phone service", "No", "Yes"];
const INTERNET_SERVICE: &[&str] = &["DSL", "Fiber optic", "No"];
const INTERNET_ADDON: &[&str] = &["Yes", "No", "No internet service"];
const CONTRACT: &[&str] = &["Month-to-month", "One year", "Two year"];
const PAYMENT_METHOD: &[&str] = &[
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

pub const TENURE_RANGE: (i64, i64) = (1, 72);
pub const MONTHLY_CHARGES_RANGE: (f64, f64) = (18.25, 118.75);
const TOTAL_CHARGES_NOISE: f64 = 10.0;

#[derive(Deserialize)]
struct ThresholdFile {
    threshold: f64,
}

/// One loaded estimator plus its decision threshold. Read-only after load.
pub struct ModelService {
    model: Box<dyn Estimator>,
    threshold: f64,
}

impl ModelService {
    pub fn new(model: Box<dyn Estimator>, threshold: f64) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ModelError::InvalidArtifact(format!(
                "threshold {threshold} is outside [0, 1]"
            )));
        }
        Ok(Self { model, threshold })
    }

    /// Loads the pipeline artifact and the `{"threshold": ...}` metadata file.
    pub fn load(model_path: &Path, meta_path: &Path) -> Result<Self, ModelError> {
        let model = Pipeline::load(model_path)?;
        log::debug!("Pipeline encodes {} features", model.width());
        let raw = fs::read_to_string(meta_path).map_err(|source| ModelError::Io {
            path: meta_path.display().to_string(),
            source,
        })?;
        let meta: ThresholdFile = serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
            path: meta_path.display().to_string(),
            source,
        })?;
        Self::new(Box::new(model), meta.threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores records and labels them with the estimator's own decision rule.
    pub fn predict(&self, records: &[CustomerRecord]) -> Result<Vec<PredictionResult>, ModelError> {
        let probability = self.model.predict_proba(records)?;
        let prediction = self.model.predict(records)?;

        Ok(probability
            .into_iter()
            .zip(prediction)
            .map(|(probability, prediction)| PredictionResult {
                probability,
                prediction,
            })
            .collect())
    }

    /// Scores records and labels them against `threshold`, or the loaded
    /// default when none is given.
    pub fn predict_with_threshold(
        &self,
        records: &[CustomerRecord],
        threshold: Option<f64>,
    ) -> Result<Vec<PredictionResult>, ModelError> {
        let cutoff = threshold.unwrap_or(self.threshold);
        let probability = self.model.predict_proba(records)?;

        Ok(probability
            .into_iter()
            .map(|probability| PredictionResult {
                probability,
                prediction: u8::from(probability >= cutoff),
            })
            .collect())
    }

    /// Synthetic customers for exercising the predict endpoint.
    pub fn generate_random(&self, n: usize) -> Vec<CustomerRecord> {
        generate_random_with(&mut rand::thread_rng(), n)
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, values: &[&str]) -> String {
    values.choose(rng).copied().unwrap_or_default().to_string()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn generate_random_with<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<CustomerRecord> {
    (0..n)
        .map(|_| {
            let tenure = rng.gen_range(TENURE_RANGE.0..=TENURE_RANGE.1);
            let monthly =
                round2(rng.gen_range(MONTHLY_CHARGES_RANGE.0..=MONTHLY_CHARGES_RANGE.1));
            let noise = rng.gen_range(-TOTAL_CHARGES_NOISE..=TOTAL_CHARGES_NOISE);
            let total = round2(monthly * tenure as f64 + noise);

            CustomerRecord {
                gender: pick(rng, GENDERS),
                senior_citizen: rng.gen_range(0..=1),
                partner: pick(rng, YES_NO),
                dependents: pick(rng, YES_NO),
                tenure,
                phone_service: pick(rng, YES_NO),
                multiple_lines: pick(rng, MULTIPLE_LINES),
                internet_service: pick(rng, INTERNET_SERVICE),
                online_security: pick(rng, INTERNET_ADDON),
                online_backup: pick(rng, INTERNET_ADDON),
                device_protection: pick(rng, INTERNET_ADDON),
                tech_support: pick(rng, INTERNET_ADDON),
                streaming_tv: pick(rng, INTERNET_ADDON),
                streaming_movies: pick(rng, INTERNET_ADDON),
                contract: pick(rng, CONTRACT),
                paperless_billing: pick(rng, YES_NO),
                payment_method: pick(rng, PAYMENT_METHOD),
                monthly_charges: monthly,
                total_charges: total,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::estimator::tests::ARTIFACT;
    use crate::models::sample_record;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Fixed probabilities, cycled over the batch.
    pub(crate) struct StubEstimator(pub Vec<f64>);

    impl Estimator for StubEstimator {
        fn predict_proba(&self, records: &[CustomerRecord]) -> Result<Vec<f64>, ModelError> {
            Ok((0..records.len())
                .map(|i| self.0[i % self.0.len()])
                .collect())
        }
    }

    struct FailingEstimator;

    impl Estimator for FailingEstimator {
        fn predict_proba(&self, _records: &[CustomerRecord]) -> Result<Vec<f64>, ModelError> {
            Err(ModelError::UnknownCategory {
                column: "Contract".into(),
                value: "Weekly".into(),
            })
        }
    }

    fn service(proba: Vec<f64>, threshold: f64) -> ModelService {
        ModelService::new(Box::new(StubEstimator(proba)), threshold).unwrap()
    }

    #[test]
    fn threshold_controls_prediction_and_keeps_order() {
        let svc = service(vec![0.1, 0.3, 0.29, 0.9], 0.3);
        let records = vec![sample_record(); 4];

        let results = svc.predict_with_threshold(&records, None).unwrap();
        let probability: Vec<_> = results.iter().map(|r| r.probability).collect();
        let prediction: Vec<_> = results.iter().map(|r| r.prediction).collect();
        assert_eq!(probability, vec![0.1, 0.3, 0.29, 0.9]);
        assert_eq!(prediction, vec![0, 1, 0, 1]);

        let overridden = svc.predict_with_threshold(&records, Some(0.95)).unwrap();
        assert!(overridden.iter().all(|r| r.prediction == 0));
    }

    #[test]
    fn no_override_matches_explicit_default() {
        let svc = service(vec![0.12, 0.48, 0.77], 0.48);
        let records = vec![sample_record(); 3];
        assert_eq!(
            svc.predict_with_threshold(&records, None).unwrap(),
            svc.predict_with_threshold(&records, Some(svc.threshold())).unwrap()
        );
    }

    #[test]
    fn unthresholded_predict_uses_estimator_rule() {
        let svc = service(vec![0.4, 0.5, 0.6], 0.3);
        let results = svc.predict(&vec![sample_record(); 3]).unwrap();
        let prediction: Vec<_> = results.iter().map(|r| r.prediction).collect();
        assert_eq!(prediction, vec![0, 0, 1]);
    }

    #[test]
    fn estimator_errors_propagate() {
        let svc = ModelService::new(Box::new(FailingEstimator), 0.5).unwrap();
        assert!(matches!(
            svc.predict_with_threshold(&[sample_record()], None),
            Err(ModelError::UnknownCategory { .. })
        ));
        assert!(svc.predict(&[sample_record()]).is_err());
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        assert!(ModelService::new(Box::new(StubEstimator(vec![0.5])), 1.2).is_err());
        assert!(ModelService::new(Box::new(StubEstimator(vec![0.5])), -0.1).is_err());
    }

    #[test]
    fn loads_artifact_and_threshold_files() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("pipeline.json");
        let meta_path = dir.path().join("decision_threshold.json");
        fs::write(&model_path, ARTIFACT).unwrap();
        fs::write(&meta_path, r#"{"threshold": 0.35}"#).unwrap();

        let svc = ModelService::load(&model_path, &meta_path).unwrap();
        assert_eq!(svc.threshold(), 0.35);

        let results = svc.predict_with_threshold(&[sample_record()], None).unwrap();
        assert_eq!(results.len(), 1);
        assert!((0.0..=1.0).contains(&results[0].probability));
        assert_eq!(results[0].prediction, u8::from(results[0].probability >= 0.35));
    }

    #[test]
    fn bundled_artifact_scores_generated_customers() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");
        let svc = ModelService::load(
            &root.join("churn_pipeline.json"),
            &root.join("decision_threshold.json"),
        )
        .unwrap();

        let records = generate_random_with(&mut StdRng::seed_from_u64(11), 10);
        let results = svc.predict_with_threshold(&records, None).unwrap();
        assert_eq!(results.len(), 10);
        for r in &results {
            assert!((0.0..=1.0).contains(&r.probability));
            assert_eq!(r.prediction, u8::from(r.probability >= svc.threshold()));
        }
    }

    #[test]
    fn missing_threshold_key_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("pipeline.json");
        let meta_path = dir.path().join("decision_threshold.json");
        fs::write(&model_path, ARTIFACT).unwrap();
        fs::write(&meta_path, r#"{"cutoff": 0.35}"#).unwrap();

        assert!(matches!(
            ModelService::load(&model_path, &meta_path),
            Err(ModelError::Parse { .. })
        ));
    }

    #[test]
    fn random_records_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..=10 {
            let records = generate_random_with(&mut rng, n);
            assert_eq!(records.len(), n);
            for r in &records {
                assert!((1..=72).contains(&r.tenure));
                assert!((18.25..=118.75).contains(&r.monthly_charges));
                assert_eq!(round2(r.monthly_charges), r.monthly_charges);
                assert!((r.total_charges - r.monthly_charges * r.tenure as f64).abs() <= 10.01);
                assert!((0..=1).contains(&r.senior_citizen));
                let checks = [
                    (GENDERS, &r.gender),
                    (YES_NO, &r.partner),
                    (YES_NO, &r.dependents),
                    (YES_NO, &r.phone_service),
                    (MULTIPLE_LINES, &r.multiple_lines),
                    (INTERNET_SERVICE, &r.internet_service),
                    (INTERNET_ADDON, &r.online_security),
                    (INTERNET_ADDON, &r.online_backup),
                    (INTERNET_ADDON, &r.device_protection),
                    (INTERNET_ADDON, &r.tech_support),
                    (INTERNET_ADDON, &r.streaming_tv),
                    (INTERNET_ADDON, &r.streaming_movies),
                    (CONTRACT, &r.contract),
                    (YES_NO, &r.paperless_billing),
                    (PAYMENT_METHOD, &r.payment_method),
                ];
                for (allowed, value) in checks {
                    assert!(allowed.contains(&value.as_str()), "{value:?} not in {allowed:?}");
                }
            }
        }
    }

    #[test]
    fn random_records_pass_schema_validation() {
        let records = service(vec![0.5], 0.5).generate_random(5);
        let body = serde_json::to_value(&records).unwrap();
        let parsed = crate::schema::validate_batch(&body).unwrap();
        assert_eq!(parsed.len(), records.len());
        for (parsed, original) in parsed.iter().zip(&records) {
            assert_eq!(parsed.tenure, original.tenure);
            assert_eq!(parsed.payment_method, original.payment_method);
            assert!((parsed.total_charges - original.total_charges).abs() < 1e-9);
        }
    }
}
