use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::linalg::{augment_intercept, solve_linear_system};

/// Ridge regression (L2 penalty, intercept unregularized) over scaled
/// features predicting `reward_score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardHead {
    weights: Array1<f64>,
}

impl RewardHead {
    pub fn train(features: &[Vec<f64>], labels: &[f64], l2: f64) -> Option<Self> {
        if features.is_empty() || features.len() != labels.len() {
            return None;
        }

        let x = augment_intercept(features);
        let y = Array1::from_vec(labels.to_vec());
        let d = x.ncols();

        let mut gram = x.t().dot(&x);
        for i in 1..d {
            gram[[i, i]] += l2;
        }
        let xty = x.t().dot(&y);

        let weights = solve_linear_system(&gram, &xty)?;
        Some(Self { weights })
    }

    pub fn predict(&self, scaled_features: &[f64]) -> f64 {
        let mut sum = self.weights[0];
        for (&w, &f) in self.weights.iter().skip(1).zip(scaled_features) {
            sum += w * f;
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_a_linear_relationship() {
        let features = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![1.0, 3.0, 5.0, 7.0]; // y = 2x + 1
        let head = RewardHead::train(&features, &labels, 0.001).unwrap();
        assert!((head.predict(&[4.0]) - 9.0).abs() < 0.1);
    }

    #[test]
    fn l2_penalty_shrinks_weights_toward_zero() {
        let features = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![1.0, 3.0, 5.0, 7.0];
        let light = RewardHead::train(&features, &labels, 0.001).unwrap();
        let heavy = RewardHead::train(&features, &labels, 1000.0).unwrap();
        assert!(heavy.predict(&[4.0]).abs() < light.predict(&[4.0]).abs());
    }
}
