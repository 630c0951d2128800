use anyhow::Result;
use omnifeed_common::Content;
use omnifeed_ranking::{score_content, source_stats_for_content, ModelRegistry, ScoreResult};
use omnifeed_store::Store;

/// One scored feed entry.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub content: Content,
    pub score: ScoreResult,
}

/// The outcome of `get_feed`: items ordered by descending combined score.
#[derive(Debug, Clone, Default)]
pub struct FeedResult {
    pub items: Vec<FeedItem>,
}

/// Score every candidate against the registry's best model for `objective`,
/// falling back to the cold-start prior (`source.avg_reward` or `2.5`,
/// combined score equal to reward) when no model is trained for it at all
///. Returns the top `limit` by combined score.
pub async fn score_contents(
    models: &ModelRegistry,
    store: &dyn Store,
    candidates: Vec<Content>,
    objective: Option<&str>,
    limit: usize,
) -> Result<FeedResult> {
    let mut scored = Vec::with_capacity(candidates.len());
    for content in candidates {
        let score = match score_content(models, store, &content, objective).await? {
            Some(score) => score,
            None => {
                let stats = source_stats_for_content(store, &content.id).await?;
                ScoreResult {
                    click: 0.5,
                    reward: stats.avg_reward,
                    combined: stats.avg_reward,
                }
            }
        };
        scored.push(FeedItem { content, score });
    }

    scored.sort_by(|a, b| {
        b.score
            .combined
            .partial_cmp(&a.score.combined)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);

    Ok(FeedResult { items: scored })
}
