use serde::{Deserialize, Serialize};

/// Per-feature mean/std scaler, std floored at `0.01` to keep near-constant
/// columns from blowing up the OOD guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(matrix: &[Vec<f64>]) -> Option<Self> {
        let n = matrix.len();
        if n == 0 {
            return None;
        }
        let d = matrix[0].len();

        let mut mean = vec![0.0; d];
        for row in matrix {
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in mean.iter_mut() {
            *m /= n as f64;
        }

        let mut variance = vec![0.0; d];
        for row in matrix {
            for ((v, &x), &m) in variance.iter_mut().zip(row).zip(mean.iter()) {
                *v += (x - m) * (x - m);
            }
        }
        let std = variance
            .into_iter()
            .map(|v| (v / n as f64).sqrt().max(0.01))
            .collect();

        Some(Self { mean, std })
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter())
            .zip(self.std.iter())
            .map(|((&x, &m), &s)| (x - m) / s)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_std_on_constant_column() {
        let matrix = vec![vec![5.0, 1.0], vec![5.0, 2.0], vec![5.0, 3.0]];
        let scaler = StandardScaler::fit(&matrix).unwrap();
        assert_eq!(scaler.std[0], 0.01);
        assert!(scaler.std[1] > 0.01);
    }

    #[test]
    fn transform_centers_and_scales() {
        let matrix = vec![vec![0.0], vec![10.0]];
        let scaler = StandardScaler::fit(&matrix).unwrap();
        let scaled = scaler.transform(&[5.0]);
        assert!((scaled[0]).abs() < 1e-9);
    }
}
