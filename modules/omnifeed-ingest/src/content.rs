use chrono::Utc;
use omnifeed_common::{short_id, ConsumptionType, Content, ContentType, Source};
use omnifeed_retriever::RawItem;

use crate::metadata::partition_metadata;

/// Classify a raw item's content type from its media hints. Defaults to
/// `Article` when nothing in `raw_metadata` suggests otherwise — the
/// majority case for RSS/blog sources.
pub fn infer_content_type(raw: &RawItem) -> ContentType {
    if let Some(hint) = raw.raw_metadata.get("media_type").and_then(|v| v.as_str()) {
        match hint {
            "video" => return ContentType::Video,
            "audio" => return ContentType::Audio,
            "image" => return ContentType::Image,
            "thread" => return ContentType::Thread,
            "paper" => return ContentType::Paper,
            _ => {}
        }
    }
    if raw.raw_metadata.contains_key("duration_seconds") {
        return ContentType::Video;
    }
    if raw.raw_metadata.contains_key("audio_preview_url") {
        return ContentType::Audio;
    }
    ContentType::Article
}

/// Build the durable `Content` half of the dual write for a never-before-seen
/// `(source_id, external_id)` pair. `seen`/`hidden` start false; the caller
/// is responsible for preserving them across re-ingestion by loading the
/// existing row instead of calling this again.
pub fn build_content(raw: &RawItem, _source: &Source) -> Content {
    let (content_metadata, _encoding_metadata) = partition_metadata(&raw.raw_metadata);
    let now = Utc::now();
    Content {
        id: short_id(),
        title: raw.title.clone(),
        content_type: infer_content_type(raw),
        published_at: raw.published_at,
        ingested_at: now,
        creator_ids: Vec::new(),
        consumption_type: ConsumptionType::OneShot,
        canonical_ids: Default::default(),
        seen: false,
        hidden: false,
        series_id: None,
        series_position: None,
        metadata: content_metadata,
        embeddings: Vec::new(),
    }
}

/// The canonical text embedding corpus: `title + "by " +
/// creator_name + first 1000 chars of content_text`, falling back to the
/// first 500 chars of `description` when there is no `content_text`.
pub fn build_text_corpus(
    title: &str,
    creator_name: Option<&str>,
    metadata: &std::collections::HashMap<String, serde_json::Value>,
) -> String {
    let mut parts = vec![title.to_string()];
    if let Some(name) = creator_name {
        if !name.is_empty() {
            parts.push(format!("by {name}"));
        }
    }
    let body = metadata
        .get("content_text")
        .and_then(|v| v.as_str())
        .map(|s| truncate_chars(s, 1000))
        .or_else(|| {
            metadata
                .get("description")
                .and_then(|v| v.as_str())
                .map(|s| truncate_chars(s, 500))
        });
    if let Some(body) = body {
        parts.push(body);
    }
    parts.join(" ")
}

fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
