use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::{Adapter, AdapterRegistry, Handler};
use crate::types::{IngestCandidate, Retriever, RetrievalContext, RetrievalResult, RetrieverKind};

pub const HANDLER_TYPE: &str = "source";

/// Build a `source:{source_type}:{uri}` retriever URI. The inner `uri` may
/// itself contain colons; callers reconstruct it with `parse_source_uri`,
/// which splits on the first two colons only.
pub fn build_source_uri(source_type: &str, uri: &str) -> String {
    format!("source:{source_type}:{uri}")
}

/// Parse a `source:{source_type}:{uri}` retriever URI.
pub fn parse_source_uri(retriever_uri: &str) -> Option<(String, String)> {
    let rest = retriever_uri.strip_prefix("source:")?;
    let (source_type, uri) = rest.split_once(':')?;
    Some((source_type.to_string(), uri.to_string()))
}

/// Wraps an `Adapter` as a POLL leaf handler.
pub struct SourceRetrieverHandler {
    registry: Arc<AdapterRegistry>,
}

impl SourceRetrieverHandler {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Handler for SourceRetrieverHandler {
    fn handler_type(&self) -> &str {
        HANDLER_TYPE
    }

    fn can_handle(&self, uri: &str) -> bool {
        if uri.starts_with("source:") {
            return true;
        }
        self.registry.by_url(uri).is_some()
    }

    async fn resolve(&self, uri: &str, display_name: Option<&str>) -> Result<Retriever> {
        let (source_type, source_uri, info_display_name) = if let Some((st, u)) =
            parse_source_uri(uri)
        {
            (st, u, None)
        } else {
            let adapter = self
                .registry
                .by_url(uri)
                .ok_or_else(|| anyhow!("no adapter claims url: {uri}"))?;
            let info = adapter.resolve(uri).await?;
            (info.source_type.clone(), info.uri.clone(), Some(info.display_name))
        };

        let retriever_uri = build_source_uri(&source_type, &source_uri);
        let name = display_name
            .map(|s| s.to_string())
            .or(info_display_name)
            .unwrap_or_else(|| retriever_uri.clone());

        let mut retriever = Retriever::new(
            retriever_uri.clone(),
            name,
            RetrieverKind::Poll,
            HANDLER_TYPE,
            retriever_uri,
        );
        retriever
            .config
            .insert("source_type".to_string(), serde_json::json!(source_type));
        retriever
            .config
            .insert("source_uri".to_string(), serde_json::json!(source_uri));
        Ok(retriever)
    }

    async fn invoke(
        &self,
        retriever: &Retriever,
        _ctx: &RetrievalContext,
    ) -> Result<Vec<RetrievalResult>> {
        let source_type = retriever
            .config
            .get("source_type")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let source_uri = retriever
            .config
            .get("source_uri")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let (source_type, source_uri) = match (source_type, source_uri) {
            (Some(st), Some(su)) => (st, su),
            _ => parse_source_uri(&retriever.uri)
                .ok_or_else(|| anyhow!("retriever {} has no source config", retriever.id))?,
        };

        let adapter = self
            .registry
            .by_source_type(&source_type)
            .ok_or_else(|| anyhow!("no adapter registered for source_type: {source_type}"))?;

        let info = omnifeed_common::SourceInfo {
            source_type: source_type.clone(),
            uri: source_uri.clone(),
            display_name: retriever.display_name.clone(),
            avatar_url: None,
            metadata: retriever
                .config
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        let raw_items = adapter.poll(&info, retriever.last_invoked_at).await?;

        Ok(raw_items
            .into_iter()
            .enumerate()
            .map(|(rank, raw)| {
                let candidate = IngestCandidate {
                    raw,
                    source_type: source_type.clone(),
                    source_uri: source_uri.clone(),
                };
                RetrievalResult::from_item(candidate, Some(rank), None)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_uri_splitting_on_first_two_colons_only() {
        let (source_type, uri) = parse_source_uri("source:rss:https://blog.com/feed").unwrap();
        assert_eq!(source_type, "rss");
        assert_eq!(uri, "https://blog.com/feed");
    }

    #[test]
    fn round_trips_build_and_parse() {
        let built = build_source_uri("youtube_channel", "UC1234");
        let (st, u) = parse_source_uri(&built).unwrap();
        assert_eq!(st, "youtube_channel");
        assert_eq!(u, "UC1234");
    }
}
