use std::collections::{HashMap, HashSet};

use anyhow::Result;
use omnifeed_common::{Content, CreatorStats, ExplicitFeedback, SourceStats};
use omnifeed_store::Store;
use tracing::info;

/// One labeled training row: a content that received at least one
/// engagement signal, with its first-seen explicit rating if any.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub content: Content,
    pub clicked: bool,
    pub reward_score: Option<f64>,
    pub selections: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingStats {
    pub example_count: usize,
    pub missing_embeddings: usize,
}

/// Build the training set: every content with at least one embedding and at
/// least one engagement signal (click-type event or explicit feedback),
/// paired with its label. Items with engagement but no embedding are
/// excluded from the matrix and tallied in `missing_embeddings`.
pub async fn collect_training_data(store: &dyn Store) -> Result<(Vec<TrainingExample>, TrainingStats)> {
    let embedded_contents = store.contents_with_embeddings().await?;
    let contents_by_id: HashMap<String, Content> =
        embedded_contents.into_iter().map(|c| (c.id.clone(), c)).collect();

    let events = store.all_feedback_events().await?;
    let clicked_ids: HashSet<String> = events
        .iter()
        .filter(|e| e.is_engagement())
        .map(|e| e.item_id.clone())
        .collect();

    let explicit = store.all_explicit_feedback().await?;
    let mut first_feedback: HashMap<String, &ExplicitFeedback> = HashMap::new();
    for feedback in &explicit {
        first_feedback.entry(feedback.item_id.clone()).or_insert(feedback);
    }

    let mut engaged_ids: HashSet<String> = clicked_ids.clone();
    engaged_ids.extend(first_feedback.keys().cloned());

    let mut examples = Vec::new();
    let mut missing_embeddings = 0;
    for item_id in &engaged_ids {
        match contents_by_id.get(item_id) {
            Some(content) => {
                let feedback = first_feedback.get(item_id);
                examples.push(TrainingExample {
                    content: content.clone(),
                    clicked: clicked_ids.contains(item_id),
                    reward_score: feedback.map(|f| f.reward_score),
                    selections: feedback.map(|f| f.selections.clone()).unwrap_or_default(),
                });
            }
            None => missing_embeddings += 1,
        }
    }

    let stats = TrainingStats {
        example_count: examples.len(),
        missing_embeddings,
    };
    info!(
        example_count = stats.example_count,
        missing_embeddings = stats.missing_embeddings,
        "collected training data"
    );
    Ok((examples, stats))
}

/// Thin pass-through to the store's cached (or on-demand) source stats,
/// kept as its own named operation
pub async fn compute_source_stats(store: &dyn Store, source_id: &str) -> Result<SourceStats> {
    store.source_stats(source_id).await
}

pub async fn compute_creator_stats(store: &dyn Store, creator_id: &str) -> Result<CreatorStats> {
    store.creator_stats(creator_id).await
}

/// Resolve the `SourceStats` a content's feature vector should use: the
/// stats of the source behind its primary encoding, or the `(2.5, 0, 0)`
/// default if the content has no encoding on record.
pub async fn source_stats_for_content(store: &dyn Store, content_id: &str) -> Result<SourceStats> {
    let encodings = store.encodings_for_content(content_id).await?;
    let source_id = encodings
        .iter()
        .find(|e| e.is_primary)
        .or_else(|| encodings.first())
        .map(|e| e.source_id.clone());

    match source_id {
        Some(id) => compute_source_stats(store, &id).await,
        None => Ok(SourceStats::default()),
    }
}
