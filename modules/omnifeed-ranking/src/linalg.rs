use ndarray::{s, Array1, Array2};

/// Prepend a column of ones so a fit intercept falls out of the same linear
/// solve as the feature weights (`weights[0]` is always the intercept).
pub fn augment_intercept(x: &[Vec<f64>]) -> Array2<f64> {
    let n = x.len();
    let d = x.first().map(|r| r.len()).unwrap_or(0);
    let mut out = Array2::<f64>::ones((n, d + 1));
    for (i, row) in x.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            out[[i, j + 1]] = v;
        }
    }
    out
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Solve `a x = b` via Gaussian elimination with partial pivoting. Returns
/// `None` if `a` is singular to working precision.
pub fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    aug.slice_mut(s![.., ..n]).assign(a);
    aug.column_mut(n).assign(b);

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            if aug[[row, col]].abs() > pivot_val {
                pivot_val = aug[[row, col]].abs();
                pivot_row = row;
            }
        }
        if pivot_val < 1e-10 {
            return None;
        }
        if pivot_row != col {
            for k in 0..=n {
                aug.swap([col, k], [pivot_row, k]);
            }
        }

        let pivot = aug[[col, col]];
        for k in col..=n {
            aug[[col, k]] /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                aug[[row, k]] -= factor * aug[[col, k]];
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// Batch gradient descent on the logistic loss with L2 weight decay (the
/// intercept, `weights[0]`, is not regularized). `x` already has an
/// intercept column from `augment_intercept`.
pub fn logistic_regression_fit(x: &Array2<f64>, y: &Array1<f64>, l2: f64) -> Array1<f64> {
    let n = x.nrows() as f64;
    let d = x.ncols();
    let mut weights = Array1::<f64>::zeros(d);
    let learning_rate = 0.1;

    for _ in 0..500 {
        let z = x.dot(&weights);
        let preds = z.mapv(sigmoid);
        let errors = &preds - y;
        let mut grad = x.t().dot(&errors) / n;
        for i in 1..d {
            grad[i] += l2 * weights[i] / n;
        }
        weights = &weights - &(grad * learning_rate);
    }

    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_linear_system_recovers_known_solution() {
        let a = Array2::from_shape_vec((2, 2), vec![2.0, 1.0, 1.0, 3.0]).unwrap();
        let b = Array1::from_vec(vec![5.0, 10.0]);
        let x = solve_linear_system(&a, &b).unwrap();
        // 2x + y = 5, x + 3y = 10 -> x = 1, y = 3
        assert!((x[0] - 1.0).abs() < 1e-6);
        assert!((x[1] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn solve_linear_system_detects_singular_matrix() {
        let a = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 2.0, 4.0]).unwrap();
        let b = Array1::from_vec(vec![1.0, 2.0]);
        assert!(solve_linear_system(&a, &b).is_none());
    }

    #[test]
    fn logistic_regression_separates_linearly_separable_data() {
        let x = augment_intercept(&[vec![-2.0], vec![-1.0], vec![1.0], vec![2.0]]);
        let y = Array1::from_vec(vec![0.0, 0.0, 1.0, 1.0]);
        let weights = logistic_regression_fit(&x, &y, 0.01);
        assert!(weights[1] > 0.0);
    }
}
