use ndarray::{Array1, Array2};
use serde::Deserialize;

/// Fitted binary logistic regression over encoded features.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    /// Positive-class probability for each row.
    pub fn predict_proba(&self, features: &Array2<f64>) -> Array1<f64> {
        let weights = Array1::from(self.coefficients.clone());
        features.dot(&weights).mapv(|z| sigmoid(z + self.intercept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(!sigmoid(-800.0).is_nan());
    }

    #[test]
    fn scores_each_row() {
        let model = LogisticRegression {
            coefficients: vec![2.0, -1.0],
            intercept: 0.0,
        };
        let proba = model.predict_proba(&array![[0.0, 0.0], [1.0, 2.0], [3.0, 0.0]]);
        assert_eq!(proba.len(), 3);
        assert_eq!(proba[0], 0.5);
        assert_eq!(proba[1], 0.5);
        assert!((proba[2] - sigmoid(6.0)).abs() < 1e-12);
    }
}
