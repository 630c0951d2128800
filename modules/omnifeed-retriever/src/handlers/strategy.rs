use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::Handler;
use crate::types::{Retriever, RetrievalContext, RetrievalResult, RetrieverKind};

pub const HANDLER_TYPE: &str = "strategy";

/// A scorable query/prompt construction method, identified as `{provider}:{method}`
///. Strategies discover candidate sub-retrievers; they do not
/// themselves produce content.
#[async_trait]
pub trait ExplorationStrategy: Send + Sync {
    /// `{provider}:{method}`, e.g. `"rym:top_albums"`.
    fn strategy_id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn provider(&self) -> &str {
        self.strategy_id().split_once(':').map(|(p, _)| p).unwrap_or(self.strategy_id())
    }

    fn method(&self) -> &str {
        self.strategy_id().split_once(':').map(|(_, m)| m).unwrap_or("")
    }

    async fn discover(&self, ctx: &RetrievalContext) -> Result<StrategyResult>;
}

#[derive(Debug, Clone, Default)]
pub struct StrategyResult {
    pub sub_retrievers: Vec<Retriever>,
}

/// Lookup by `strategy_id` (`{provider}:{method}`), analogous to
/// `SearchProviderRegistry`.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn ExplorationStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: Arc<dyn ExplorationStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn by_strategy_id(&self, strategy_id: &str) -> Option<Arc<dyn ExplorationStrategy>> {
        self.strategies
            .iter()
            .find(|s| s.strategy_id() == strategy_id)
            .cloned()
    }
}

/// URI grammar: `strategy:{provider}:{method}` wraps a registered
/// `ExplorationStrategy` as a scorable HYBRID retriever.
pub struct StrategyHandler {
    registry: Arc<StrategyRegistry>,
}

impl StrategyHandler {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry }
    }

    fn strategy_id_of(uri: &str) -> Option<&str> {
        uri.strip_prefix("strategy:")
    }
}

#[async_trait]
impl Handler for StrategyHandler {
    fn handler_type(&self) -> &str {
        HANDLER_TYPE
    }

    fn can_handle(&self, uri: &str) -> bool {
        Self::strategy_id_of(uri)
            .map(|id| self.registry.by_strategy_id(id).is_some())
            .unwrap_or(false)
    }

    async fn resolve(&self, uri: &str, display_name: Option<&str>) -> Result<Retriever> {
        let strategy_id = Self::strategy_id_of(uri)
            .ok_or_else(|| anyhow!("not a strategy: uri: {uri}"))?;
        let strategy = self
            .registry
            .by_strategy_id(strategy_id)
            .ok_or_else(|| anyhow!("no strategy registered for id: {strategy_id}"))?;

        let name = display_name
            .map(|s| s.to_string())
            .unwrap_or_else(|| strategy.display_name().to_string());
        let mut retriever = Retriever::new(uri.to_string(), name, RetrieverKind::Hybrid, HANDLER_TYPE, uri.to_string());
        retriever
            .config
            .insert("strategy_id".to_string(), serde_json::json!(strategy_id));
        Ok(retriever)
    }

    async fn invoke(
        &self,
        retriever: &Retriever,
        ctx: &RetrievalContext,
    ) -> Result<Vec<RetrievalResult>> {
        let strategy_id = Self::strategy_id_of(&retriever.uri)
            .ok_or_else(|| anyhow!("not a strategy: uri: {}", retriever.uri))?;
        let strategy = self
            .registry
            .by_strategy_id(strategy_id)
            .ok_or_else(|| anyhow!("no strategy registered for id: {strategy_id}"))?;

        let result = strategy.discover(ctx).await?;
        Ok(result
            .sub_retrievers
            .into_iter()
            .map(|sub| RetrievalResult::from_retriever(sub, None))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake;

    #[async_trait]
    impl ExplorationStrategy for Fake {
        fn strategy_id(&self) -> &str {
            "rym:top_albums"
        }
        fn display_name(&self) -> &str {
            "RYM Top Albums"
        }
        async fn discover(&self, _ctx: &RetrievalContext) -> Result<StrategyResult> {
            Ok(StrategyResult {
                sub_retrievers: vec![Retriever::new(
                    "source:rym_album:123",
                    "Some Album",
                    RetrieverKind::Poll,
                    "source",
                    "source:rym_album:123",
                )],
            })
        }
    }

    fn handler() -> StrategyHandler {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Fake));
        StrategyHandler::new(Arc::new(registry))
    }

    #[test]
    fn derives_provider_and_method_from_strategy_id() {
        let f = Fake;
        assert_eq!(f.provider(), "rym");
        assert_eq!(f.method(), "top_albums");
    }

    #[test]
    fn can_handle_only_registered_strategy_ids() {
        let h = handler();
        assert!(h.can_handle("strategy:rym:top_albums"));
        assert!(!h.can_handle("strategy:rym:unknown_method"));
        assert!(!h.can_handle("source:rss:x"));
    }

    #[tokio::test]
    async fn resolve_populates_strategy_config() {
        let h = handler();
        let r = h.resolve("strategy:rym:top_albums", None).await.unwrap();
        assert_eq!(r.kind, RetrieverKind::Hybrid);
        assert_eq!(r.display_name, "RYM Top Albums");
    }

    #[tokio::test]
    async fn invoke_emits_strategy_sub_retrievers() {
        let h = handler();
        let r = h.resolve("strategy:rym:top_albums", None).await.unwrap();
        let results = h.invoke(&r, &RetrievalContext::default()).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
