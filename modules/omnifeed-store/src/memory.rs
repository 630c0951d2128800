use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use omnifeed_common::{
    Content, Creator, CreatorStats, Encoding, ExplicitFeedback, FeedbackEvent, Source, SourceInfo,
    SourceStats, normalize_name,
};
use omnifeed_retriever::{Retriever, RetrieverScore};
use uuid::Uuid;

use crate::traits::Store;

/// A process-local Store backed by `Mutex<HashMap<..>>`. Used by test suites
/// and as a reference implementation of the upsert/uniqueness contract; not
/// intended for production persistence.
#[derive(Default)]
pub struct InMemoryStore {
    sources: Mutex<HashMap<String, Source>>,
    retrievers: Mutex<HashMap<String, Retriever>>,
    retrievers_by_uri: Mutex<HashMap<String, String>>,
    creators: Mutex<HashMap<String, Creator>>,
    contents: Mutex<HashMap<String, Content>>,
    encodings: Mutex<HashMap<String, Encoding>>,
    encodings_by_external: Mutex<HashMap<(String, String), String>>,
    feedback_events: Mutex<Vec<FeedbackEvent>>,
    explicit_feedback: Mutex<Vec<ExplicitFeedback>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn add_source(&self, info: SourceInfo) -> Result<Source> {
        let id = Uuid::new_v4().to_string();
        let source = Source::from_info(id.clone(), info, Utc::now());
        self.sources.lock().unwrap().insert(id, source.clone());
        Ok(source)
    }

    async fn list_sources(&self) -> Result<Vec<Source>> {
        Ok(self.sources.lock().unwrap().values().cloned().collect())
    }

    async fn get_source(&self, source_id: &str) -> Result<Option<Source>> {
        Ok(self.sources.lock().unwrap().get(source_id).cloned())
    }

    async fn get_source_by_uri(&self, source_type: &str, uri: &str) -> Result<Option<Source>> {
        Ok(self
            .sources
            .lock()
            .unwrap()
            .values()
            .find(|s| s.source_type == source_type && s.uri == uri)
            .cloned())
    }

    async fn update_source_poll_time(&self, source_id: &str, polled_at: DateTime<Utc>) -> Result<()> {
        if let Some(s) = self.sources.lock().unwrap().get_mut(source_id) {
            s.last_polled_at = Some(polled_at);
        }
        Ok(())
    }

    async fn disable_source(&self, source_id: &str) -> Result<()> {
        if let Some(s) = self.sources.lock().unwrap().get_mut(source_id) {
            s.status = omnifeed_common::SourceStatus::Paused;
        }
        Ok(())
    }

    async fn source_stats(&self, source_id: &str) -> Result<SourceStats> {
        let contents = self.contents.lock().unwrap();
        let encodings = self.encodings.lock().unwrap();
        let content_ids: Vec<String> = encodings
            .values()
            .filter(|e| e.source_id == source_id)
            .map(|e| e.content_id.clone())
            .collect();

        let item_count = content_ids.len() as u64;
        if item_count == 0 {
            return Ok(SourceStats::default());
        }

        let explicit = self.explicit_feedback.lock().unwrap();
        let rewards: Vec<f64> = explicit
            .iter()
            .filter(|f| content_ids.contains(&f.item_id))
            .map(|f| f.reward_score)
            .collect();
        let avg_reward = if rewards.is_empty() {
            2.5
        } else {
            rewards.iter().sum::<f64>() / rewards.len() as f64
        };

        let events = self.feedback_events.lock().unwrap();
        let engagement_count = events
            .iter()
            .filter(|e| content_ids.contains(&e.item_id) && e.is_engagement())
            .count() as u64;
        let clicked_items = events
            .iter()
            .filter(|e| content_ids.contains(&e.item_id) && e.is_engagement())
            .map(|e| e.item_id.clone())
            .collect::<std::collections::HashSet<_>>()
            .len() as u64;

        let _ = contents;
        Ok(SourceStats {
            item_count,
            avg_reward,
            click_rate: clicked_items as f64 / item_count as f64,
            engagement_count,
        })
    }

    async fn upsert_retriever(&self, retriever: Retriever) -> Result<Retriever> {
        let mut by_uri = self.retrievers_by_uri.lock().unwrap();
        let mut retrievers = self.retrievers.lock().unwrap();

        if let Some(existing_id) = by_uri.get(&retriever.uri).cloned() {
            return Ok(retrievers.get(&existing_id).cloned().unwrap());
        }

        by_uri.insert(retriever.uri.clone(), retriever.id.clone());
        retrievers.insert(retriever.id.clone(), retriever.clone());
        Ok(retriever)
    }

    async fn get_retriever(&self, id: &str) -> Result<Option<Retriever>> {
        Ok(self.retrievers.lock().unwrap().get(id).cloned())
    }

    async fn get_retriever_by_uri(&self, uri: &str) -> Result<Option<Retriever>> {
        let by_uri = self.retrievers_by_uri.lock().unwrap();
        let id = match by_uri.get(uri) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        Ok(self.retrievers.lock().unwrap().get(&id).cloned())
    }

    async fn update_retriever_invoked(&self, id: &str, invoked_at: DateTime<Utc>) -> Result<()> {
        if let Some(r) = self.retrievers.lock().unwrap().get_mut(id) {
            r.last_invoked_at = Some(invoked_at);
            r.updated_at = invoked_at;
        }
        Ok(())
    }

    async fn update_retriever_score(&self, id: &str, score: RetrieverScore) -> Result<()> {
        if let Some(r) = self.retrievers.lock().unwrap().get_mut(id) {
            r.score = Some(score);
            r.updated_at = score.last_updated;
        }
        Ok(())
    }

    async fn list_retrievers(&self, include_disabled: bool) -> Result<Vec<Retriever>> {
        Ok(self
            .retrievers
            .lock()
            .unwrap()
            .values()
            .filter(|r| include_disabled || r.is_enabled)
            .cloned()
            .collect())
    }

    async fn children_of(&self, parent_id: &str) -> Result<Vec<Retriever>> {
        Ok(self
            .retrievers
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn get_retrievers_needing_poll(&self, limit: usize) -> Result<Vec<Retriever>> {
        let now = Utc::now();
        let mut due: Vec<Retriever> = self
            .retrievers
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_enabled)
            .filter(|r| match r.last_invoked_at {
                None => true,
                Some(last) => (now - last).num_seconds() >= r.poll_interval_seconds,
            })
            .cloned()
            .collect();
        due.truncate(limit);
        Ok(due)
    }

    async fn find_creator_by_external_id(&self, key: &str, value: &str) -> Result<Option<Creator>> {
        Ok(self
            .creators
            .lock()
            .unwrap()
            .values()
            .find(|c| c.external_ids.get(key).map(|v| v.as_str()) == Some(value))
            .cloned())
    }

    async fn find_creator_by_normalized_name(&self, normalized: &str) -> Result<Option<Creator>> {
        Ok(self
            .creators
            .lock()
            .unwrap()
            .values()
            .find(|c| {
                normalize_name(&c.name) == normalized
                    || c.name_variants.iter().any(|v| normalize_name(v) == normalized)
            })
            .cloned())
    }

    async fn upsert_creator(&self, creator: Creator) -> Result<Creator> {
        self.creators
            .lock()
            .unwrap()
            .insert(creator.id.clone(), creator.clone());
        Ok(creator)
    }

    async fn creator_stats(&self, creator_id: &str) -> Result<CreatorStats> {
        let contents = self.contents.lock().unwrap();
        let item_ids: Vec<String> = contents
            .values()
            .filter(|c| c.creator_ids.iter().any(|id| id == creator_id))
            .map(|c| c.id.clone())
            .collect();
        let item_count = item_ids.len() as u64;
        if item_count == 0 {
            return Ok(CreatorStats::default());
        }
        let explicit = self.explicit_feedback.lock().unwrap();
        let rewards: Vec<f64> = explicit
            .iter()
            .filter(|f| item_ids.contains(&f.item_id))
            .map(|f| f.reward_score)
            .collect();
        let avg_reward = if rewards.is_empty() {
            2.5
        } else {
            rewards.iter().sum::<f64>() / rewards.len() as f64
        };
        let events = self.feedback_events.lock().unwrap();
        let clicked = events
            .iter()
            .filter(|e| item_ids.contains(&e.item_id) && e.is_engagement())
            .map(|e| e.item_id.clone())
            .collect::<std::collections::HashSet<_>>()
            .len() as u64;
        Ok(CreatorStats {
            item_count,
            avg_reward,
            click_rate: clicked as f64 / item_count as f64,
        })
    }

    async fn upsert_content(&self, content: Content) -> Result<Content> {
        self.contents
            .lock()
            .unwrap()
            .insert(content.id.clone(), content.clone());
        Ok(content)
    }

    async fn get_content(&self, content_id: &str) -> Result<Option<Content>> {
        Ok(self.contents.lock().unwrap().get(content_id).cloned())
    }

    async fn get_encoding_by_external_id(
        &self,
        source_id: &str,
        external_id: &str,
    ) -> Result<Option<Encoding>> {
        let key = (source_id.to_string(), external_id.to_string());
        let by_ext = self.encodings_by_external.lock().unwrap();
        let id = match by_ext.get(&key) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        Ok(self.encodings.lock().unwrap().get(&id).cloned())
    }

    async fn add_encoding(&self, encoding: Encoding) -> Result<Encoding> {
        let key = (encoding.source_id.clone(), encoding.external_id.clone());
        self.encodings_by_external
            .lock()
            .unwrap()
            .insert(key, encoding.id.clone());
        self.encodings
            .lock()
            .unwrap()
            .insert(encoding.id.clone(), encoding.clone());
        Ok(encoding)
    }

    async fn encodings_for_content(&self, content_id: &str) -> Result<Vec<Encoding>> {
        Ok(self
            .encodings
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.content_id == content_id)
            .cloned()
            .collect())
    }

    async fn get_contents(
        &self,
        seen: Option<bool>,
        hidden: Option<bool>,
        source_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Content>> {
        let encodings = self.encodings.lock().unwrap();
        let allowed_ids: Option<std::collections::HashSet<String>> = source_id.map(|sid| {
            encodings
                .values()
                .filter(|e| e.source_id == sid)
                .map(|e| e.content_id.clone())
                .collect()
        });

        let mut items: Vec<Content> = self
            .contents
            .lock()
            .unwrap()
            .values()
            .filter(|c| seen.is_none_or(|want| c.seen == want))
            .filter(|c| hidden.is_none_or(|want| c.hidden == want))
            .filter(|c| allowed_ids.as_ref().is_none_or(|ids| ids.contains(&c.id)))
            .cloned()
            .collect();
        items.sort_by_key(|c| std::cmp::Reverse(c.published_at));
        Ok(items.into_iter().skip(offset).take(limit).collect())
    }

    async fn mark_seen(&self, content_id: &str, seen: bool) -> Result<()> {
        if let Some(c) = self.contents.lock().unwrap().get_mut(content_id) {
            c.seen = seen;
        }
        Ok(())
    }

    async fn mark_hidden(&self, content_id: &str, hidden: bool) -> Result<()> {
        if let Some(c) = self.contents.lock().unwrap().get_mut(content_id) {
            c.hidden = hidden;
        }
        Ok(())
    }

    async fn count_contents(
        &self,
        seen: Option<bool>,
        hidden: Option<bool>,
        source_id: Option<&str>,
    ) -> Result<u64> {
        Ok(self
            .get_contents(seen, hidden, source_id, usize::MAX, 0)
            .await?
            .len() as u64)
    }

    async fn add_feedback_event(&self, event: FeedbackEvent) -> Result<()> {
        self.feedback_events.lock().unwrap().push(event);
        Ok(())
    }

    async fn get_feedback_events(
        &self,
        item_id: Option<&str>,
        event_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FeedbackEvent>> {
        Ok(self
            .feedback_events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| item_id.is_none_or(|id| e.item_id == id))
            .filter(|e| event_type.is_none_or(|t| e.event_type == t))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn add_explicit_feedback(&self, feedback: ExplicitFeedback) -> Result<()> {
        self.explicit_feedback.lock().unwrap().push(feedback);
        Ok(())
    }

    async fn get_explicit_feedback(&self, item_id: &str) -> Result<Vec<ExplicitFeedback>> {
        Ok(self
            .explicit_feedback
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn contents_with_embeddings(&self) -> Result<Vec<Content>> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .values()
            .filter(|c| !c.embeddings.is_empty())
            .cloned()
            .collect())
    }

    async fn all_feedback_events(&self) -> Result<Vec<FeedbackEvent>> {
        Ok(self.feedback_events.lock().unwrap().clone())
    }

    async fn all_explicit_feedback(&self) -> Result<Vec<ExplicitFeedback>> {
        Ok(self.explicit_feedback.lock().unwrap().clone())
    }
}
