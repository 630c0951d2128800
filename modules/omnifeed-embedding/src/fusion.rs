use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pca::PcaProjection;

/// Learned per-type projection + weighted aggregation to a fixed dimension.
/// Accepts an open-ended set of embedding type tags at both fit and
/// transform time; unknown tags are silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingFusion {
    output_dim: usize,
    projections: HashMap<String, PcaProjection>,
    weights: HashMap<String, f64>,
}

impl EmbeddingFusion {
    pub fn new(output_dim: usize) -> Self {
        Self {
            output_dim,
            projections: HashMap::new(),
            weights: HashMap::new(),
        }
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn is_fitted(&self) -> bool {
        !self.projections.is_empty()
    }

    /// Fit a per-type PCA projection from observed vectors, and per-type
    /// importance weights proportional to observation frequency.
    ///
    /// `examples` is one map per training content: type tag -> embedding
    /// vector (only the types present on that content).
    pub fn fit(&mut self, examples: &[HashMap<String, Vec<f32>>]) {
        let mut vectors_by_type: HashMap<String, Vec<Vec<f32>>> = HashMap::new();
        for example in examples {
            for (kind, vector) in example {
                vectors_by_type
                    .entry(kind.clone())
                    .or_default()
                    .push(vector.clone());
            }
        }

        let total_observations: usize = vectors_by_type.values().map(|v| v.len()).sum();
        if total_observations == 0 {
            return;
        }

        let mut projections = HashMap::new();
        let mut weights = HashMap::new();
        for (kind, vectors) in &vectors_by_type {
            if let Some(projection) = PcaProjection::fit(vectors, self.output_dim) {
                projections.insert(kind.clone(), projection);
            }
            weights.insert(kind.clone(), vectors.len() as f64 / total_observations as f64);
        }

        // Only weight the types that actually produced a projection.
        weights.retain(|kind, _| projections.contains_key(kind));
        let weight_sum: f64 = weights.values().sum();
        if weight_sum > 0.0 {
            for w in weights.values_mut() {
                *w /= weight_sum;
            }
        }

        self.projections = projections;
        self.weights = weights;
    }

    /// Fuse the given per-type embeddings into one `output_dim` vector.
    pub fn transform(&self, embeddings_by_type: &HashMap<String, Vec<f32>>) -> Vec<f32> {
        if !self.is_fitted() {
            return embeddings_by_type
                .values()
                .next()
                .map(|v| right_pad_or_truncate(v, self.output_dim))
                .unwrap_or_else(|| vec![0.0; self.output_dim]);
        }

        let mut present_weight = 0.0;
        let mut contributions: Vec<(f64, Vec<f32>)> = Vec::new();
        for (kind, vector) in embeddings_by_type {
            let (Some(projection), Some(&weight)) =
                (self.projections.get(kind), self.weights.get(kind))
            else {
                continue;
            };
            present_weight += weight;
            contributions.push((weight, projection.transform(vector, self.output_dim)));
        }

        if contributions.is_empty() || present_weight <= 0.0 {
            return vec![0.0; self.output_dim];
        }

        let mut fused = vec![0.0f32; self.output_dim];
        for (weight, projected) in contributions {
            let renormalized = (weight / present_weight) as f32;
            for (f, p) in fused.iter_mut().zip(projected.iter()) {
                *f += renormalized * p;
            }
        }
        fused
    }
}

fn right_pad_or_truncate(vector: &[f32], output_dim: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; output_dim];
    let n = vector.len().min(output_dim);
    out[..n].copy_from_slice(&vector[..n]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(pairs: &[(&str, Vec<f32>)]) -> HashMap<String, Vec<f32>> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn unfitted_fusion_returns_first_vector_padded() {
        let fusion = EmbeddingFusion::new(4);
        let embeddings = example(&[("text", vec![1.0, 2.0])]);
        let out = fusion.transform(&embeddings);
        assert_eq!(out, vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn unfitted_fusion_with_no_embeddings_returns_zero_vector() {
        let fusion = EmbeddingFusion::new(4);
        let out = fusion.transform(&HashMap::new());
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn unknown_type_at_transform_is_ignored_after_fitting() {
        let mut fusion = EmbeddingFusion::new(2);
        let examples: Vec<_> = (0..5)
            .map(|i| example(&[("text", vec![i as f32, (i * 2) as f32])]))
            .collect();
        fusion.fit(&examples);
        assert!(fusion.is_fitted());

        let out = fusion.transform(&example(&[("unknown_tag", vec![9.0, 9.0])]));
        assert_eq!(out, vec![0.0; 2]);
    }

    #[test]
    fn transform_weights_multiple_present_types() {
        let mut fusion = EmbeddingFusion::new(2);
        let examples: Vec<_> = (0..6)
            .map(|i| {
                example(&[
                    ("text", vec![i as f32, (i * 2) as f32]),
                    ("audio", vec![(i * 3) as f32, (i * 4) as f32, (i * 5) as f32]),
                ])
            })
            .collect();
        fusion.fit(&examples);
        assert!(fusion.is_fitted());

        let out = fusion.transform(&example(&[
            ("text", vec![1.0, 2.0]),
            ("audio", vec![3.0, 4.0, 5.0]),
        ]));
        assert_eq!(out.len(), 2);
    }
}
