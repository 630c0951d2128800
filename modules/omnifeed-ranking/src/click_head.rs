use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::linalg::{augment_intercept, logistic_regression_fit, sigmoid};

/// Logistic regression over scaled features predicting engagement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHead {
    weights: Array1<f64>,
}

impl ClickHead {
    /// Trains on scaled feature rows against a 0/1 engagement label. Returns
    /// `None` if there are no examples or every label is identical — a
    /// degenerate fit the caller should treat as "no click signal yet".
    pub fn train(features: &[Vec<f64>], labels: &[f64]) -> Option<Self> {
        if features.is_empty() || features.len() != labels.len() {
            return None;
        }
        if labels.windows(2).all(|pair| pair[0] == pair[1]) {
            return None;
        }

        let x = augment_intercept(features);
        let y = Array1::from_vec(labels.to_vec());
        let weights = logistic_regression_fit(&x, &y, 1.0);
        Some(Self { weights })
    }

    pub fn predict(&self, scaled_features: &[f64]) -> f64 {
        let mut z = self.weights[0];
        for (&w, &f) in self.weights.iter().skip(1).zip(scaled_features) {
            z += w * f;
        }
        sigmoid(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_head_when_labels_are_identical() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![1.0, 1.0, 1.0];
        assert!(ClickHead::train(&features, &labels).is_none());
    }

    #[test]
    fn predicts_higher_probability_for_positive_examples() {
        let features = vec![vec![-3.0], vec![-2.0], vec![2.0], vec![3.0]];
        let labels = vec![0.0, 0.0, 1.0, 1.0];
        let head = ClickHead::train(&features, &labels).unwrap();
        assert!(head.predict(&[3.0]) > head.predict(&[-3.0]));
    }
}
