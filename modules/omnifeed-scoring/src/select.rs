use omnifeed_retriever::Retriever;
use rand::rng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Result of a single `select_retrievers` call: disjoint exploit and explore picks.
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    pub exploit: Vec<Retriever>,
    pub explore: Vec<Retriever>,
}

impl SelectionResult {
    pub fn all(self) -> Vec<Retriever> {
        let mut out = self.exploit;
        out.extend(self.explore);
        out
    }
}

/// The explore/exploit scheduling policy. `candidates` should already
/// be filtered to enabled, pollable retrievers; this function does not touch
/// the store.
///
/// At least one explore slot is always reserved, even if `explore_ratio`
/// rounds to zero. Weighted sampling is without replacement.
pub fn select_retrievers(
    candidates: Vec<Retriever>,
    limit: usize,
    explore_ratio: f64,
    min_exploit_confidence: f64,
) -> SelectionResult {
    if limit == 0 || candidates.is_empty() {
        return SelectionResult::default();
    }

    let explore_count = ((limit as f64 * explore_ratio).floor() as usize).max(1).min(limit);
    let exploit_count = limit - explore_count;

    let mut exploit_pool: Vec<Retriever> = candidates
        .iter()
        .filter(|r| {
            r.score
                .map(|s| s.confidence >= min_exploit_confidence)
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    exploit_pool.sort_by(|a, b| {
        let av = a.score.map(|s| s.value).unwrap_or(0.0);
        let bv = b.score.map(|s| s.value).unwrap_or(0.0);
        bv.partial_cmp(&av).unwrap_or(std::cmp::Ordering::Equal)
    });
    exploit_pool.truncate(exploit_count.saturating_mul(2).max(exploit_count));

    let mut explore_pool: Vec<Retriever> = candidates
        .iter()
        .filter(|r| {
            r.score
                .map(|s| s.confidence < min_exploit_confidence)
                .unwrap_or(true)
        })
        .cloned()
        .collect();
    explore_pool.sort_by(|a, b| {
        match (a.score, b.score) {
            (None, None) => a.created_at.cmp(&b.created_at),
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(sa), Some(sb)) => sa
                .confidence
                .partial_cmp(&sb.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.created_at.cmp(&b.created_at)),
        }
    });
    explore_pool.truncate(explore_count.saturating_mul(2).max(explore_count));

    let exploit_pick = weighted_sample_without_replacement(exploit_pool, exploit_count);
    let mut rng = rng();
    let mut shuffled_explore = explore_pool;
    shuffled_explore.shuffle(&mut rng);
    shuffled_explore.truncate(explore_count);

    SelectionResult {
        exploit: exploit_pick,
        explore: shuffled_explore,
    }
}

/// Weighted sampling without replacement, weight `1 + score.value` (unscored
/// retrievers never reach this pool, so `score` is always `Some` here in
/// practice; a retriever somehow lacking one gets weight `1.0`).
fn weighted_sample_without_replacement(mut pool: Vec<Retriever>, count: usize) -> Vec<Retriever> {
    let mut rng = rng();
    let mut picked = Vec::with_capacity(count.min(pool.len()));

    while picked.len() < count && !pool.is_empty() {
        let weights: Vec<f64> = pool
            .iter()
            .map(|r| 1.0 + r.score.map(|s| s.value).unwrap_or(0.0))
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            picked.push(pool.remove(pool.len() - 1));
            continue;
        }
        let mut roll = rng.random_range(0.0..total);
        let mut idx = pool.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            if roll < *w {
                idx = i;
                break;
            }
            roll -= w;
        }
        picked.push(pool.remove(idx));
    }

    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use omnifeed_retriever::{RetrieverKind, RetrieverScore};

    fn retriever(id: &str, score: Option<RetrieverScore>) -> Retriever {
        let mut r = Retriever::new(id, id, RetrieverKind::Poll, "source", format!("source:rss:{id}"));
        r.score = score;
        r
    }

    #[test]
    fn always_reserves_at_least_one_explore_slot() {
        let candidates = vec![
            retriever(
                "a",
                Some(RetrieverScore {
                    value: 4.0,
                    confidence: 0.9,
                    sample_size: 10,
                    last_updated: Utc::now(),
                }),
            ),
            retriever("b", None),
        ];
        let result = select_retrievers(candidates, 5, 0.0, 0.3);
        assert!(!result.explore.is_empty());
    }

    #[test]
    fn empty_candidates_returns_empty_selection() {
        let result = select_retrievers(Vec::new(), 5, 0.3, 0.3);
        assert!(result.exploit.is_empty());
        assert!(result.explore.is_empty());
    }

    #[test]
    fn unscored_retrievers_land_in_explore_pool() {
        let candidates = vec![retriever("a", None), retriever("b", None)];
        let result = select_retrievers(candidates, 2, 0.5, 0.3);
        assert_eq!(result.explore.len() + result.exploit.len(), 2);
        assert!(result.exploit.is_empty());
    }

    #[test]
    fn low_confidence_scored_retriever_is_explore_not_exploit() {
        let low_conf = retriever(
            "a",
            Some(RetrieverScore {
                value: 4.0,
                confidence: 0.1,
                sample_size: 1,
                last_updated: Utc::now(),
            }),
        );
        let result = select_retrievers(vec![low_conf], 1, 0.5, 0.3);
        assert_eq!(result.explore.len(), 1);
        assert!(result.exploit.is_empty());
    }
}
