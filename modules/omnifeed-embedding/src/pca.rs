use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A learned linear projection to at most `n_components` dimensions, fit by
/// principal component analysis over a set of observed vectors.
///
/// Computed via the "dual" trick: when the sample count `n` is smaller than
/// the feature dimension `d` (the common case — a handful of training
/// examples against a 1536-wide text embedding), eigen-decomposing the
/// `n x n` Gram matrix is far cheaper than the `d x d` covariance matrix, and
/// the principal directions in feature space are recovered from the Gram
/// matrix's eigenvectors by `v_i = Xᵀu_i / sqrt(λ_i)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaProjection {
    mean: Array1<f64>,
    /// Each row is one principal direction (length == input dim), ordered by
    /// decreasing eigenvalue.
    components: Array2<f64>,
}

impl PcaProjection {
    /// Rank (number of components actually fit). May be less than the
    /// requested `n_components` if there were too few samples or the data
    /// had lower intrinsic rank.
    pub fn rank(&self) -> usize {
        self.components.nrows()
    }

    pub fn input_dim(&self) -> usize {
        self.mean.len()
    }

    /// Project `vector` onto the learned components, right-padding with
    /// zeros up to `output_dim` if `rank() < output_dim`.
    pub fn transform(&self, vector: &[f32], output_dim: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; output_dim];
        if vector.len() != self.input_dim() {
            return out;
        }
        let centered: Array1<f64> = Array1::from_iter(
            vector
                .iter()
                .zip(self.mean.iter())
                .map(|(&x, &m)| x as f64 - m),
        );
        let limit = self.rank().min(output_dim);
        for (i, component) in self.components.rows().into_iter().take(limit).enumerate() {
            out[i] = component.dot(&centered) as f32;
        }
        out
    }

    /// Fit a projection to at most `n_components` dimensions over `vectors`.
    /// Returns `None` if there are fewer than 2 samples or an empty input
    /// dimension (PCA is undefined on a single point).
    pub fn fit(vectors: &[Vec<f32>], n_components: usize) -> Option<Self> {
        let n = vectors.len();
        if n < 2 || n_components == 0 {
            return None;
        }
        let d = vectors[0].len();
        if d == 0 || vectors.iter().any(|v| v.len() != d) {
            return None;
        }

        let mut mean = Array1::<f64>::zeros(d);
        for v in vectors {
            for (m, &x) in mean.iter_mut().zip(v.iter()) {
                *m += x as f64;
            }
        }
        mean.mapv_inplace(|x| x / n as f64);

        // Centered data matrix X, n rows x d columns.
        let mut x = Array2::<f64>::zeros((n, d));
        for (i, v) in vectors.iter().enumerate() {
            for (j, &val) in v.iter().enumerate() {
                x[[i, j]] = val as f64 - mean[j];
            }
        }

        // Gram matrix G = X X^T, n x n.
        let gram = x.dot(&x.t());

        let k = n_components.min(n - 1).min(d);
        if k == 0 {
            return None;
        }

        let eigenpairs = top_eigenpairs(&gram, k);
        if eigenpairs.is_empty() {
            return None;
        }

        let mut components = Array2::<f64>::zeros((eigenpairs.len(), d));
        for (row, (eigenvalue, u)) in eigenpairs.iter().enumerate() {
            // v = X^T u / sqrt(eigenvalue), then re-normalize defensively.
            let v = x.t().dot(u);
            let scale = eigenvalue.max(1e-12).sqrt();
            let mut v = v / scale;
            let norm = v.dot(&v).sqrt();
            if norm > 1e-12 {
                v /= norm;
            }
            components.row_mut(row).assign(&v);
        }

        Some(Self { mean, components })
    }
}

/// Top-`k` eigenvalue/eigenvector pairs of a symmetric matrix via power
/// iteration with deflation. Adequate for the small `n x n` Gram matrices
/// this module builds (n bounded by the training batch size).
fn top_eigenpairs(symmetric: &Array2<f64>, k: usize) -> Vec<(f64, Array1<f64>)> {
    let n = symmetric.nrows();
    let mut deflated = symmetric.clone();
    let mut pairs = Vec::with_capacity(k);

    for _ in 0..k {
        let mut v = Array1::<f64>::from_elem(n, 1.0 / (n as f64).sqrt());
        let mut eigenvalue = 0.0;
        for _ in 0..200 {
            let next = deflated.dot(&v);
            let norm = next.dot(&next).sqrt();
            if norm < 1e-12 {
                break;
            }
            let next = next / norm;
            eigenvalue = next.dot(&deflated.dot(&next));
            if (&next - &v).dot(&(&next - &v)).sqrt() < 1e-10 {
                v = next;
                break;
            }
            v = next;
        }

        if eigenvalue <= 1e-10 {
            break;
        }
        pairs.push((eigenvalue, v.clone()));

        // Deflate: remove this component's contribution before the next iteration.
        let outer = {
            let vv = v.view().insert_axis(ndarray::Axis(1));
            vv.dot(&vv.t()) * eigenvalue
        };
        deflated -= &outer;
    }

    pairs
}
