use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use omnifeed_retriever::RawItem;

/// Source-specific enrichment run before embedding (e.g. fetching a video's
/// transcript into `metadata.content_text`). Failures are logged and
/// skipped; they never abort the pipeline.
#[async_trait]
pub trait SourceEnricher: Send + Sync {
    fn source_type(&self) -> &str;
    async fn enrich(&self, raw: &mut RawItem) -> Result<()>;
}

/// Lookup by `source_type`, analogous to `AdapterRegistry`.
#[derive(Default)]
pub struct EnricherRegistry {
    enrichers: HashMap<String, Arc<dyn SourceEnricher>>,
}

impl EnricherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, enricher: Arc<dyn SourceEnricher>) {
        self.enrichers
            .insert(enricher.source_type().to_string(), enricher);
    }

    pub fn get(&self, source_type: &str) -> Option<Arc<dyn SourceEnricher>> {
        self.enrichers.get(source_type).cloned()
    }
}
