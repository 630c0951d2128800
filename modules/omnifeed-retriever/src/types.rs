use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a retriever behaves when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RetrieverKind {
    /// Periodically fetch content (RSS, YouTube channel).
    Poll,
    /// One-time expansion into sub-retrievers.
    Explore,
    /// Can return both content and sub-retrievers.
    Hybrid,
}

impl std::fmt::Display for RetrieverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrieverKind::Poll => write!(f, "poll"),
            RetrieverKind::Explore => write!(f, "explore"),
            RetrieverKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Type of result returned from a retriever invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Content,
    Retriever,
}

/// Quality score for a retriever, derived from feedback on its content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct RetrieverScore {
    pub value: f64,
    pub confidence: f64,
    pub sample_size: u32,
    pub last_updated: DateTime<Utc>,
}

/// A node in the discovery DAG: a source of content or sub-sources.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Retriever {
    pub id: String,
    pub display_name: String,
    pub kind: RetrieverKind,
    pub handler_type: String,
    /// Primary identifier / configuration. Unique across retrievers.
    pub uri: String,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
    pub poll_interval_seconds: i64,
    pub last_invoked_at: Option<DateTime<Utc>>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    pub score: Option<RetrieverScore>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Retriever {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: RetrieverKind,
        handler_type: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
            handler_type: handler_type.into(),
            uri: uri.into(),
            config: HashMap::new(),
            poll_interval_seconds: 3600,
            last_invoked_at: None,
            parent_id: None,
            depth: 0,
            is_enabled: true,
            score: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Context passed to retriever handlers during invocation.
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    /// How deep to recurse.
    pub max_depth: u32,
    /// Max results per invocation (orchestrator's selection limit, not a
    /// per-handler content cap).
    pub max_results: usize,
    pub include_disabled: bool,
    /// Fraction of `invoke_for_feed`'s selection from exploration.
    pub explore_ratio: f64,
    pub content_types: Option<Vec<String>>,
    pub topic: Option<String>,
    pub context_items: Option<Vec<HashMap<String, serde_json::Value>>>,
}

impl Default for RetrievalContext {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_results: 50,
            include_disabled: false,
            explore_ratio: 0.3,
            content_types: None,
            topic: None,
            context_items: None,
        }
    }
}

/// A single result from invoking a retriever: either content or another
/// retriever to explore further.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub result_type: ResultType,
    pub item: Option<IngestCandidate>,
    pub retriever: Option<Retriever>,
    pub rank: Option<usize>,
    pub source_score: Option<f64>,
    pub context: Option<String>,
}

impl RetrievalResult {
    pub fn from_item(item: IngestCandidate, rank: Option<usize>, context: Option<String>) -> Self {
        Self {
            result_type: ResultType::Content,
            item: Some(item),
            retriever: None,
            rank,
            source_score: None,
            context,
        }
    }

    pub fn from_retriever(retriever: Retriever, context: Option<String>) -> Self {
        let source_score = retriever.score.map(|s| s.value);
        Self {
            result_type: ResultType::Retriever,
            item: None,
            retriever: Some(retriever),
            rank: None,
            source_score,
            context,
        }
    }
}

/// A raw item as returned by an `Adapter::poll`, before ingestion normalizes it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawItem {
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub raw_metadata: HashMap<String, serde_json::Value>,
}

/// A `RawItem` tagged with the source context the ingestion pipeline needs
/// to resolve (or create) a `Source` row and stamp a primary `Encoding`:
/// `source_type` + `source_uri` identify the `Source`, `raw.external_id`
/// keys the `Encoding`. Produced by `SourceRetrieverHandler::invoke`; the
/// ingestion pipeline is the only place a `RawItem` becomes a `Content`
/// — handlers never construct `Content` themselves.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestCandidate {
    pub raw: RawItem,
    pub source_type: String,
    pub source_uri: String,
}

/// A suggestion surfaced by a search provider during exploratory discovery.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourceSuggestion {
    pub url: String,
    pub name: String,
    pub source_type: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub subscriber_count: Option<u64>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// The outcome of invoking one retriever (and, transitively, its recursed children).
#[derive(Debug, Clone, Default)]
pub struct InvocationResult {
    pub items: Vec<IngestCandidate>,
    pub new_retrievers: Vec<Retriever>,
    pub errors: Vec<String>,
}

impl InvocationResult {
    pub fn content_count(&self) -> usize {
        self.items.len()
    }

    pub fn merge(&mut self, other: InvocationResult) {
        self.items.extend(other.items);
        self.new_retrievers.extend(other.new_retrievers);
        self.errors.extend(other.errors);
    }
}
