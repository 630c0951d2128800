use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use omnifeed_common::SourceInfo;

use crate::types::{RawItem, Retriever, RetrievalContext, RetrievalResult, SourceSuggestion};

/// A concrete poller for one source family (feed protocol, API), wrapped by
/// a `SourceRetrieverHandler`.
///
/// `poll` must be best-effort idempotent: the same item in the same state
/// should yield the same `external_id`. Implementations apply a safe default
/// page cap when `since` is absent, since the core never bounds pagination
/// for them.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable identifier, e.g. "rss", "youtube_channel".
    fn source_type(&self) -> &str;

    /// Pure, cheap URL classification. No network I/O.
    fn can_handle(&self, url: &str) -> bool;

    /// Resolve a URL to source metadata. May perform network I/O.
    /// Fails with `InvalidInput` if the URL does not belong to this adapter
    /// or the target is unreachable.
    async fn resolve(&self, url: &str) -> Result<SourceInfo>;

    /// Fetch items published strictly after `since`, or all available items
    /// (up to the adapter's own safe cap) if `since` is `None`.
    async fn poll(&self, source: &SourceInfo, since: Option<DateTime<Utc>>) -> Result<Vec<RawItem>>;
}

/// Strategy that knows how to resolve a URI into a `Retriever` and how to
/// invoke it. `resolve` performs no network calls beyond what is necessary
/// to produce a well-formed `Retriever`.
#[async_trait]
pub trait Handler: Send + Sync {
    fn handler_type(&self) -> &str;

    fn can_handle(&self, uri: &str) -> bool;

    async fn resolve(&self, uri: &str, display_name: Option<&str>) -> Result<Retriever>;

    async fn invoke(
        &self,
        retriever: &Retriever,
        ctx: &RetrievalContext,
    ) -> Result<Vec<RetrievalResult>>;
}

/// Lookup by `source_type` and first-match `can_handle(url)`.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<std::sync::Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: std::sync::Arc<dyn Adapter>) {
        self.adapters.push(adapter);
    }

    pub fn by_source_type(&self, source_type: &str) -> Option<std::sync::Arc<dyn Adapter>> {
        self.adapters
            .iter()
            .find(|a| a.source_type() == source_type)
            .cloned()
    }

    pub fn by_url(&self, url: &str) -> Option<std::sync::Arc<dyn Adapter>> {
        self.adapters.iter().find(|a| a.can_handle(url)).cloned()
    }
}

/// Lookup by `handler_type` and first-match `can_handle(uri)`.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<std::sync::Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: std::sync::Arc<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn by_handler_type(&self, handler_type: &str) -> Option<std::sync::Arc<dyn Handler>> {
        self.handlers
            .iter()
            .find(|h| h.handler_type() == handler_type)
            .cloned()
    }

    pub fn by_uri(&self, uri: &str) -> Option<std::sync::Arc<dyn Handler>> {
        self.handlers.iter().find(|h| h.can_handle(uri)).cloned()
    }
}

/// A search provider consulted by exploratory/strategy handlers.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn provider_id(&self) -> &str;
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SourceSuggestion>>;
}

#[derive(Default)]
pub struct SearchProviderRegistry {
    providers: Vec<std::sync::Arc<dyn SearchProvider>>,
}

impl SearchProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: std::sync::Arc<dyn SearchProvider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[std::sync::Arc<dyn SearchProvider>] {
        &self.providers
    }
}
