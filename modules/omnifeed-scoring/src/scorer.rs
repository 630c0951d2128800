use anyhow::Result;
use chrono::Utc;
use omnifeed_retriever::handlers::source_wrapper::build_source_uri;
use omnifeed_retriever::RetrieverScore;
use omnifeed_store::Store;
use std::sync::Arc;

/// EMA smoothing factor for retriever score updates.
pub const EMA_ALPHA: f64 = 0.3;
/// Sample size at which `confidence` reaches roughly 0.97.
pub const MIN_CONFIDENCE_SAMPLES: u32 = 5;

/// `confidence(n) = 1 - exp(-0.7 * n / MIN_CONFIDENCE_SAMPLES)`, clipped to `[0,1]`.
/// `confidence(0) = 0`.
pub fn confidence(sample_size: u32, min_confidence_samples: u32) -> f64 {
    if sample_size == 0 {
        return 0.0;
    }
    let n = sample_size as f64;
    let k = min_confidence_samples.max(1) as f64;
    (1.0 - (-0.7 * n / k).exp()).clamp(0.0, 1.0)
}

/// Propagates ratings up the retriever DAG and serves the explore/exploit
/// selector its scored candidate pool.
pub struct RetrieverScorer {
    store: Arc<dyn Store>,
    ema_alpha: f64,
    min_confidence_samples: u32,
}

impl RetrieverScorer {
    pub fn new(store: Arc<dyn Store>, ema_alpha: f64, min_confidence_samples: u32) -> Self {
        Self {
            store,
            ema_alpha,
            min_confidence_samples,
        }
    }

    /// Update `retriever_id`'s score with `rating`, then walk `parent_id` up
    /// the chain applying the same update to each ancestor. Returns the ids
    /// of every retriever updated, root-most last.
    pub async fn record_rating(&self, retriever_id: &str, rating: f64) -> Result<Vec<String>> {
        let mut updated = Vec::new();
        let mut current_id = Some(retriever_id.to_string());

        while let Some(id) = current_id {
            let retriever = match self.store.get_retriever(&id).await? {
                Some(r) => r,
                None => break,
            };

            let new_score = match retriever.score {
                None => RetrieverScore {
                    value: rating,
                    confidence: confidence(1, self.min_confidence_samples),
                    sample_size: 1,
                    last_updated: Utc::now(),
                },
                Some(prev) => {
                    let value = self.ema_alpha * rating + (1.0 - self.ema_alpha) * prev.value;
                    let sample_size = prev.sample_size + 1;
                    RetrieverScore {
                        value,
                        confidence: confidence(sample_size, self.min_confidence_samples),
                        sample_size,
                        last_updated: Utc::now(),
                    }
                }
            };

            self.store.update_retriever_score(&id, new_score).await?;
            updated.push(id);
            current_id = retriever.parent_id;
        }

        Ok(updated)
    }

    /// Resolve feedback addressed to a legacy `source_id` to a retriever id,
    /// trying (a) direct retriever id, (b) the `source:{source_type}:{uri}`
    /// wrapper URI, (c) a retriever whose URI equals the source's own URI.
    /// Falls through to a no-op (empty result) if nothing matches.
    pub async fn record_rating_via_source(
        &self,
        source_or_retriever_id: &str,
        rating: f64,
    ) -> Result<Vec<String>> {
        if self
            .store
            .get_retriever(source_or_retriever_id)
            .await?
            .is_some()
        {
            return self.record_rating(source_or_retriever_id, rating).await;
        }

        let source = match self.store.get_source(source_or_retriever_id).await? {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };

        let wrapper_uri = build_source_uri(&source.source_type, &source.uri);
        if let Some(retriever) = self.store.get_retriever_by_uri(&wrapper_uri).await? {
            return self.record_rating(&retriever.id, rating).await;
        }

        if let Some(retriever) = self.store.get_retriever_by_uri(&source.uri).await? {
            return self.record_rating(&retriever.id, rating).await;
        }

        Ok(Vec::new())
    }

    /// Recompute every retriever-with-scored-children's score as the
    /// sample-size-weighted average of its children's values; confidence
    /// uses the sum of child sample sizes. Leaves retrievers with no scored
    /// children untouched.
    pub async fn propagate_all(&self) -> Result<usize> {
        let retrievers = self.store.list_retrievers(true).await?;
        let mut updated = 0;

        for parent in &retrievers {
            let children = self.store.children_of(&parent.id).await?;
            let scored: Vec<_> = children.iter().filter_map(|c| c.score.map(|s| (c, s))).collect();
            if scored.is_empty() {
                continue;
            }

            let total_samples: u32 = scored.iter().map(|(_, s)| s.sample_size).sum();
            if total_samples == 0 {
                continue;
            }

            let weighted_value: f64 = scored
                .iter()
                .map(|(_, s)| s.value * s.sample_size as f64)
                .sum::<f64>()
                / total_samples as f64;

            let new_score = RetrieverScore {
                value: weighted_value,
                confidence: confidence(total_samples, self.min_confidence_samples),
                sample_size: total_samples,
                last_updated: Utc::now(),
            };
            self.store.update_retriever_score(&parent.id, new_score).await?;
            updated += 1;
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnifeed_retriever::{Retriever, RetrieverKind};
    use omnifeed_store::InMemoryStore;

    fn scorer() -> (RetrieverScorer, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let scorer = RetrieverScorer::new(store.clone(), EMA_ALPHA, MIN_CONFIDENCE_SAMPLES);
        (scorer, store)
    }

    #[test]
    fn confidence_zero_samples_is_zero() {
        assert_eq!(confidence(0, MIN_CONFIDENCE_SAMPLES), 0.0);
    }

    #[test]
    fn confidence_increases_with_samples_and_clips_to_one() {
        let c1 = confidence(1, MIN_CONFIDENCE_SAMPLES);
        let c5 = confidence(5, MIN_CONFIDENCE_SAMPLES);
        let c100 = confidence(100, MIN_CONFIDENCE_SAMPLES);
        assert!(c1 > 0.0 && c1 < c5);
        assert!(c5 < c100);
        assert!(c100 <= 1.0);
    }

    #[tokio::test]
    async fn first_rating_seeds_value_and_sample_size_one() {
        let (scorer, store) = scorer();
        let r = Retriever::new("r1", "Test", RetrieverKind::Poll, "source", "source:rss:x");
        store.upsert_retriever(r).await.unwrap();

        let updated = scorer.record_rating("r1", 4.0).await.unwrap();
        assert_eq!(updated, vec!["r1".to_string()]);

        let r = store.get_retriever("r1").await.unwrap().unwrap();
        let score = r.score.unwrap();
        assert_eq!(score.value, 4.0);
        assert_eq!(score.sample_size, 1);
    }

    #[tokio::test]
    async fn subsequent_rating_applies_ema_and_walks_parent_chain() {
        let (scorer, store) = scorer();
        let mut parent = Retriever::new("p1", "Parent", RetrieverKind::Explore, "explore", "explore:all");
        parent.score = None;
        store.upsert_retriever(parent).await.unwrap();

        let mut child = Retriever::new("c1", "Child", RetrieverKind::Poll, "source", "source:rss:x");
        child.parent_id = Some("p1".to_string());
        store.upsert_retriever(child).await.unwrap();

        scorer.record_rating("c1", 4.0).await.unwrap();
        let updated = scorer.record_rating("c1", 2.0).await.unwrap();
        assert_eq!(updated, vec!["c1".to_string(), "p1".to_string()]);

        let c = store.get_retriever("c1").await.unwrap().unwrap();
        let score = c.score.unwrap();
        assert_eq!(score.value, EMA_ALPHA * 2.0 + (1.0 - EMA_ALPHA) * 4.0);
        assert_eq!(score.sample_size, 2);

        let p = store.get_retriever("p1").await.unwrap().unwrap();
        assert_eq!(p.score.unwrap().sample_size, 1);
    }

    #[tokio::test]
    async fn record_rating_via_source_falls_back_to_wrapper_uri() {
        let (scorer, store) = scorer();
        let r = Retriever::new(
            "r1",
            "Blog",
            RetrieverKind::Poll,
            "source",
            "source:rss:https://blog.example/feed",
        );
        store.upsert_retriever(r).await.unwrap();

        let source = store
            .add_source(omnifeed_common::SourceInfo {
                source_type: "rss".to_string(),
                uri: "https://blog.example/feed".to_string(),
                display_name: "Blog".to_string(),
                avatar_url: None,
                metadata: Default::default(),
            })
            .await
            .unwrap();

        let updated = scorer.record_rating_via_source(&source.id, 5.0).await.unwrap();
        assert_eq!(updated, vec!["r1".to_string()]);
    }

    #[tokio::test]
    async fn record_rating_via_source_no_match_is_noop() {
        let (scorer, _store) = scorer();
        let updated = scorer.record_rating_via_source("nonexistent", 5.0).await.unwrap();
        assert!(updated.is_empty());
    }
}
