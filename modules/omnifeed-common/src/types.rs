use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a short, URL-safe id. Used for entities that don't need a full UUID
/// in their external representation (encodings, feedback events).
pub fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Active,
    Paused,
    Error,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceStatus::Active => write!(f, "active"),
            SourceStatus::Paused => write!(f, "paused"),
            SourceStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Video,
    Audio,
    Article,
    Paper,
    Image,
    Thread,
    Book,
    Game,
    Show,
    Film,
    Podcast,
    Other,
}

impl ContentType {
    /// The fixed one-hot ordering used by the ranking feature vector.
    /// `Book`, `Game`, `Show`, `Film`, and `Podcast` fold into `Other` for
    /// ranking purposes — they were added to the content model after the
    /// one-hot encoding was fixed.
    pub const ONE_HOT_ORDER: [ContentType; 7] = [
        ContentType::Article,
        ContentType::Video,
        ContentType::Audio,
        ContentType::Paper,
        ContentType::Image,
        ContentType::Thread,
        ContentType::Other,
    ];

    pub fn one_hot_index(self) -> usize {
        Self::ONE_HOT_ORDER
            .iter()
            .position(|&t| t == self)
            .unwrap_or(Self::ONE_HOT_ORDER.len() - 1)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Article => "article",
            ContentType::Paper => "paper",
            ContentType::Image => "image",
            ContentType::Thread => "thread",
            ContentType::Book => "book",
            ContentType::Game => "game",
            ContentType::Show => "show",
            ContentType::Film => "film",
            ContentType::Podcast => "podcast",
            ContentType::Other => "other",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionType {
    OneShot,
    Replayable,
    Serialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CreatorType {
    Individual,
    Company,
    Group,
    AiAgent,
    Unknown,
}

impl Default for CreatorType {
    fn default() -> Self {
        CreatorType::Unknown
    }
}

/// Immutable identity of a pollable endpoint, as produced by an adapter's
/// `resolve`. A template consumed to construct a `Source` row.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourceInfo {
    pub source_type: String,
    pub uri: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Source {
    pub id: String,
    pub source_type: String,
    pub uri: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub poll_interval_seconds: i64,
    pub status: SourceStatus,
}

impl Source {
    pub fn from_info(id: impl Into<String>, info: SourceInfo, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            source_type: info.source_type,
            uri: info.uri,
            display_name: info.display_name,
            avatar_url: info.avatar_url,
            metadata: info.metadata,
            created_at,
            last_polled_at: None,
            poll_interval_seconds: 3600,
            status: SourceStatus::Active,
        }
    }

    pub fn to_info(&self) -> SourceInfo {
        SourceInfo {
            source_type: self.source_type.clone(),
            uri: self.uri.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Aggregated, cached statistics for a source, used as cold-start priors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct SourceStats {
    pub item_count: u64,
    pub avg_reward: f64,
    pub click_rate: f64,
    pub engagement_count: u64,
}

impl Default for SourceStats {
    fn default() -> Self {
        Self {
            item_count: 0,
            avg_reward: 2.5,
            click_rate: 0.0,
            engagement_count: 0,
        }
    }
}

/// An individual, company, or agent that creates content. Deduplicated
/// across sources using `external_ids` match or name normalization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Creator {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub creator_type: CreatorType,
    #[serde(default)]
    pub name_variants: Vec<String>,
    #[serde(default)]
    pub external_ids: HashMap<String, String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct CreatorStats {
    pub item_count: u64,
    pub avg_reward: f64,
    pub click_rate: f64,
}

impl Default for CreatorStats {
    fn default() -> Self {
        Self {
            item_count: 0,
            avg_reward: 2.5,
            click_rate: 0.0,
        }
    }
}

/// `(name, type, model, vector)`. `type` is an open string tag — the ranker
/// accepts arbitrary tags at runtime without schema changes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Embedding {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
    pub vector: Vec<f32>,
}

impl Embedding {
    pub const TEXT: &'static str = "text";
    pub const AUDIO: &'static str = "audio";
}

/// A piece of content, independent of how it was discovered.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Content {
    pub id: String,
    pub title: String,
    pub content_type: ContentType,
    pub published_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    #[serde(default)]
    pub creator_ids: Vec<String>,
    #[serde(default = "default_consumption_type")]
    pub consumption_type: ConsumptionType,
    #[serde(default)]
    pub canonical_ids: HashMap<String, String>,
    #[serde(default)]
    pub seen: bool,
    #[serde(default)]
    pub hidden: bool,
    pub series_id: Option<String>,
    pub series_position: Option<i32>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub embeddings: Vec<Embedding>,
}

fn default_consumption_type() -> ConsumptionType {
    ConsumptionType::OneShot
}

impl Content {
    pub fn embedding_of_type(&self, kind: &str) -> Option<&Embedding> {
        self.embeddings.iter().find(|e| e.kind == kind)
    }

    /// Replace the (at most one) embedding of `kind` with `embedding`, preserving order.
    pub fn set_embedding(&mut self, embedding: Embedding) {
        self.embeddings.retain(|e| e.kind != embedding.kind);
        self.embeddings.push(embedding);
    }
}

/// A specific accessor for a Content via some source/platform.
///
/// `source_type` is the adapter category ("rss", "youtube_channel"); `source_id`
/// is the specific `Source` row this encoding was discovered through. Uniqueness
/// is enforced on `(source_id, external_id)` — two sources of the same
/// `source_type` (two different RSS feeds) mint independent external ids.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Encoding {
    pub id: String,
    pub content_id: String,
    pub source_id: String,
    pub source_type: String,
    pub external_id: String,
    pub uri: String,
    pub media_type: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub discovered_at: DateTime<Utc>,
    pub is_primary: bool,
}

/// Implicit signal: `(id, item_id, timestamp, event_type, payload)`.
/// `event_type` is open; the set below counts as engagement for training.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackEvent {
    pub id: String,
    pub item_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
}

impl FeedbackEvent {
    pub const ENGAGEMENT_TYPES: [&'static str; 4] = [
        "click",
        "reading_complete",
        "watching_complete",
        "listening_complete",
    ];

    pub fn is_engagement(&self) -> bool {
        Self::ENGAGEMENT_TYPES.contains(&self.event_type.as_str())
    }
}

/// Explicit rating: `reward_score ∈ [0,5]` with open dimension selections.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExplicitFeedback {
    pub id: String,
    pub item_id: String,
    pub timestamp: DateTime<Utc>,
    pub reward_score: f64,
    #[serde(default)]
    pub selections: HashMap<String, Vec<String>>,
    pub notes: Option<String>,
    pub completion_pct: Option<f64>,
    #[serde(default)]
    pub is_checkpoint: bool,
}

impl ExplicitFeedback {
    pub const REWARD_TYPE_DIMENSION: &'static str = "reward_type";
    pub const OBJECTIVE_TYPES: [&'static str; 4] =
        ["entertainment", "curiosity", "foundational", "targeted"];

    /// Selected reward_type option ids, stripped of an optional `reward_type_`
    /// prefix some callers use (the original system accepts both forms).
    pub fn selected_objectives(&self) -> Vec<String> {
        self.selections
            .get(Self::REWARD_TYPE_DIMENSION)
            .into_iter()
            .flatten()
            .map(|s| {
                s.strip_prefix("reward_type_")
                    .unwrap_or(s.as_str())
                    .to_string()
            })
            .collect()
    }
}

/// Normalize a creator name for dedup comparison: lowercase, trim, collapse
/// internal whitespace.
///
/// ```
/// assert_eq!(omnifeed_common::normalize_name("  Jane   Doe "), "jane doe");
/// ```
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_index_folds_long_form_media_into_other() {
        assert_eq!(ContentType::Book.one_hot_index(), ContentType::Other.one_hot_index());
        assert_eq!(ContentType::Article.one_hot_index(), 0);
        assert_eq!(ContentType::Other.one_hot_index(), 6);
    }

    #[test]
    fn normalize_name_collapses_whitespace_and_case() {
        assert_eq!(normalize_name("  Jane   Doe "), "jane doe");
        assert_eq!(normalize_name("JANE DOE"), "jane doe");
    }

    #[test]
    fn selected_objectives_strips_prefix() {
        let mut selections = HashMap::new();
        selections.insert(
            "reward_type".to_string(),
            vec!["reward_type_curiosity".to_string(), "targeted".to_string()],
        );
        let fb = ExplicitFeedback {
            id: "f1".into(),
            item_id: "c1".into(),
            timestamp: Utc::now(),
            reward_score: 4.0,
            selections,
            notes: None,
            completion_pct: None,
            is_checkpoint: false,
        };
        assert_eq!(fb.selected_objectives(), vec!["curiosity", "targeted"]);
    }
}
