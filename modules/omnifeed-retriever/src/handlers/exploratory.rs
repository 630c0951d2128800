use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::handlers::source_wrapper::build_source_uri;
use crate::traits::{Handler, SearchProviderRegistry};
use crate::types::{Retriever, RetrievalContext, RetrievalResult, RetrieverKind, SourceSuggestion};

pub const HANDLER_TYPE: &str = "explore";

const SAMPLE_TOPICS: &[&str] = &[
    "ambient electronic",
    "post-rock",
    "jazz fusion",
    "generative art",
    "distributed systems",
    "programming languages",
    "speculative fiction",
    "film criticism",
    "long-form journalism",
    "history of science",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExploreMode {
    All,
    Random,
    Topic(String),
}

fn parse_explore_uri(uri: &str) -> Option<ExploreMode> {
    let rest = uri.strip_prefix("explore:")?;
    if rest == "all" {
        return Some(ExploreMode::All);
    }
    if rest == "random" {
        return Some(ExploreMode::Random);
    }
    let topic = rest.strip_prefix("topic:")?;
    Some(ExploreMode::Topic(topic.to_string()))
}

fn suggestion_to_retriever(suggestion: &SourceSuggestion) -> Retriever {
    let uri = build_source_uri(&suggestion.source_type, &suggestion.url);
    let mut retriever = Retriever::new(
        uri.clone(),
        suggestion.name.clone(),
        RetrieverKind::Poll,
        crate::handlers::source_wrapper::HANDLER_TYPE,
        uri,
    );
    retriever
        .config
        .insert("source_type".to_string(), serde_json::json!(suggestion.source_type));
    retriever
        .config
        .insert("source_uri".to_string(), serde_json::json!(suggestion.url));
    retriever
}

/// EXPLORE node that asks search providers for suggestions and emits each as
/// a child `source:` retriever.
pub struct ExploratoryHandler {
    providers: Arc<SearchProviderRegistry>,
}

impl ExploratoryHandler {
    pub fn new(providers: Arc<SearchProviderRegistry>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl Handler for ExploratoryHandler {
    fn handler_type(&self) -> &str {
        HANDLER_TYPE
    }

    fn can_handle(&self, uri: &str) -> bool {
        uri.starts_with("explore:")
    }

    async fn resolve(&self, uri: &str, display_name: Option<&str>) -> Result<Retriever> {
        let mode = parse_explore_uri(uri).ok_or_else(|| anyhow!("not an explore: uri: {uri}"))?;
        let name = display_name
            .map(|s| s.to_string())
            .unwrap_or_else(|| uri.to_string());
        let mut retriever =
            Retriever::new(uri.to_string(), name, RetrieverKind::Explore, HANDLER_TYPE, uri.to_string());
        if let ExploreMode::Topic(topic) = mode {
            retriever
                .config
                .insert("topic".to_string(), serde_json::json!(topic));
        }
        Ok(retriever)
    }

    async fn invoke(
        &self,
        retriever: &Retriever,
        ctx: &RetrievalContext,
    ) -> Result<Vec<RetrievalResult>> {
        let mode = parse_explore_uri(&retriever.uri)
            .ok_or_else(|| anyhow!("not an explore: uri: {}", retriever.uri))?;

        let topic = match mode {
            ExploreMode::Topic(t) => t,
            ExploreMode::All | ExploreMode::Random => ctx
                .topic
                .clone()
                .unwrap_or_else(|| pick_random_topic().to_string()),
        };

        let providers = self.providers.providers();
        if providers.is_empty() {
            return Ok(Vec::new());
        }

        // Integer division may over-fetch by up to one item per provider.
        // Harmless: the combined list is shuffled and truncated below.
        let per_provider_limit = ctx.max_results / providers.len() + 1;

        let mut suggestions: Vec<SourceSuggestion> = Vec::new();
        for provider in providers {
            match provider.search(&topic, per_provider_limit).await {
                Ok(found) => suggestions.extend(found),
                Err(e) => {
                    tracing::warn!(provider = provider.provider_id(), error = %e, "search provider failed");
                }
            }
        }

        suggestions.shuffle(&mut rand::rng());
        suggestions.truncate(ctx.max_results);

        Ok(suggestions
            .iter()
            .map(|s| RetrievalResult::from_retriever(suggestion_to_retriever(s), None))
            .collect())
    }
}

fn pick_random_topic() -> &'static str {
    SAMPLE_TOPICS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(SAMPLE_TOPICS[0])
}
