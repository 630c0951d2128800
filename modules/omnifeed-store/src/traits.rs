use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use omnifeed_common::{
    Content, Creator, CreatorStats, Encoding, ExplicitFeedback, FeedbackEvent, Source, SourceInfo,
    SourceStats,
};
use omnifeed_retriever::Retriever;

/// Abstract persistence layer. The Store is the sole mutator of persistent
/// entities; every other component communicates through these methods.
///
/// Schema layout is delegated entirely to implementations; this trait only
/// requires that the upsert/uniqueness constraints hold:
/// `Retriever.uri` unique, `(Encoding.source_id, Encoding.external_id)`
/// unique, `Source.(source_type, uri)` unique.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Sources ---
    async fn add_source(&self, info: SourceInfo) -> Result<Source>;
    async fn list_sources(&self) -> Result<Vec<Source>>;
    async fn get_source(&self, source_id: &str) -> Result<Option<Source>>;
    async fn get_source_by_uri(&self, source_type: &str, uri: &str) -> Result<Option<Source>>;
    async fn update_source_poll_time(&self, source_id: &str, polled_at: DateTime<Utc>) -> Result<()>;
    async fn disable_source(&self, source_id: &str) -> Result<()>;
    async fn source_stats(&self, source_id: &str) -> Result<SourceStats>;

    // --- Retrievers ---
    async fn upsert_retriever(&self, retriever: Retriever) -> Result<Retriever>;
    async fn get_retriever(&self, id: &str) -> Result<Option<Retriever>>;
    async fn get_retriever_by_uri(&self, uri: &str) -> Result<Option<Retriever>>;
    async fn update_retriever_invoked(&self, id: &str, invoked_at: DateTime<Utc>) -> Result<()>;
    async fn update_retriever_score(
        &self,
        id: &str,
        score: omnifeed_retriever::RetrieverScore,
    ) -> Result<()>;
    async fn list_retrievers(&self, include_disabled: bool) -> Result<Vec<Retriever>>;
    async fn children_of(&self, parent_id: &str) -> Result<Vec<Retriever>>;
    async fn get_retrievers_needing_poll(&self, limit: usize) -> Result<Vec<Retriever>>;

    // --- Creators ---
    async fn find_creator_by_external_id(&self, key: &str, value: &str) -> Result<Option<Creator>>;
    async fn find_creator_by_normalized_name(&self, normalized: &str) -> Result<Option<Creator>>;
    async fn upsert_creator(&self, creator: Creator) -> Result<Creator>;
    async fn creator_stats(&self, creator_id: &str) -> Result<CreatorStats>;

    // --- Content / Encodings ---
    async fn upsert_content(&self, content: Content) -> Result<Content>;
    async fn get_content(&self, content_id: &str) -> Result<Option<Content>>;
    async fn get_encoding_by_external_id(
        &self,
        source_id: &str,
        external_id: &str,
    ) -> Result<Option<Encoding>>;
    async fn add_encoding(&self, encoding: Encoding) -> Result<Encoding>;
    /// Every encoding for a content, used to resolve a training example's
    /// source for the ranking feature vector.
    async fn encodings_for_content(&self, content_id: &str) -> Result<Vec<Encoding>>;
    async fn get_contents(
        &self,
        seen: Option<bool>,
        hidden: Option<bool>,
        source_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Content>>;
    async fn mark_seen(&self, content_id: &str, seen: bool) -> Result<()>;
    async fn mark_hidden(&self, content_id: &str, hidden: bool) -> Result<()>;
    async fn count_contents(
        &self,
        seen: Option<bool>,
        hidden: Option<bool>,
        source_id: Option<&str>,
    ) -> Result<u64>;

    // --- Feedback ---
    async fn add_feedback_event(&self, event: FeedbackEvent) -> Result<()>;
    async fn get_feedback_events(
        &self,
        item_id: Option<&str>,
        event_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FeedbackEvent>>;
    async fn add_explicit_feedback(&self, feedback: ExplicitFeedback) -> Result<()>;
    async fn get_explicit_feedback(&self, item_id: &str) -> Result<Vec<ExplicitFeedback>>;

    // --- Training data access ---
    /// All content with at least one embedding, for `collect_training_data`.
    async fn contents_with_embeddings(&self) -> Result<Vec<Content>>;
    async fn all_feedback_events(&self) -> Result<Vec<FeedbackEvent>>;
    async fn all_explicit_feedback(&self) -> Result<Vec<ExplicitFeedback>>;
}
