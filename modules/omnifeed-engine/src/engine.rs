use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use omnifeed_common::{short_id, ExplicitFeedback};
use omnifeed_ingest::{IngestReport, IngestionPipeline, PipelineOptions};
use omnifeed_orchestrator::Orchestrator;
use omnifeed_ranking::ModelRegistry;
use omnifeed_retriever::{HandlerRegistry, RetrievalContext, Retriever};
use omnifeed_scoring::RetrieverScorer;
use omnifeed_store::Store;

use crate::feed::{score_contents, FeedResult};

/// The wiring an `Engine` needs: the store, the handler/adapter registry it
/// orchestrates over, and the three long-lived collaborators (orchestrator,
/// scorer, ingestion pipeline, model registry) built from it.
pub struct EngineDeps {
    pub store: Arc<dyn Store>,
    pub handlers: Arc<HandlerRegistry>,
    pub orchestrator: Arc<Orchestrator>,
    pub scorer: Arc<RetrieverScorer>,
    pub ingestion: Arc<IngestionPipeline>,
    pub models: Arc<ModelRegistry>,
}

impl EngineDeps {
    pub fn new(
        store: Arc<dyn Store>,
        handlers: Arc<HandlerRegistry>,
        scorer: Arc<RetrieverScorer>,
        ingestion: Arc<IngestionPipeline>,
        models: Arc<ModelRegistry>,
    ) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(store.clone(), handlers.clone(), scorer.clone()));
        Self {
            store,
            handlers,
            orchestrator,
            scorer,
            ingestion,
            models,
        }
    }
}

/// The core's outward API: `add_source` / `add_retriever`,
/// `invoke_for_feed`, `rate_content`, `get_feed`, `train`. This is the
/// facade every application surface (CLI, HTTP handler, worker) is built on;
/// it owns no I/O of its own beyond what the handlers/adapters/embedders it
/// was constructed with already perform.
pub struct Engine {
    deps: EngineDeps,
}

/// How many candidate contents `get_feed` scores before truncating to the
/// caller's limit. Keeps the scoring pass bounded even for large stores.
const FEED_CANDIDATE_POOL: usize = 500;

impl Engine {
    pub fn new(deps: EngineDeps) -> Self {
        Self { deps }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.deps.store
    }

    /// Resolve a raw URL into a retriever and persist it. Delegates to
    /// whichever registered handler claims the URL — ordinarily the source
    /// wrapper handler, which in turn consults the adapter registry.
    /// Fails with an error if no handler claims the URL.
    pub async fn add_source(&self, url: &str) -> Result<Retriever> {
        self.add_retriever(url).await
    }

    /// Resolve a retriever URI (any grammar a registered handler
    /// understands — `source:...`, `explore:...`, `{provider}:{method}`) and
    /// persist it as a new DAG root.
    pub async fn add_retriever(&self, uri: &str) -> Result<Retriever> {
        let handler = self
            .deps
            .handlers
            .by_uri(uri)
            .ok_or_else(|| anyhow!("no handler registered for uri: {uri}"))?;
        let retriever = handler.resolve(uri, None).await.context("resolving retriever")?;
        let persisted = self.deps.store.upsert_retriever(retriever).await?;
        tracing::info!(retriever_id = %persisted.id, uri = %persisted.uri, "added retriever");
        Ok(persisted)
    }

    /// Run one orchestrated pass: select retrievers via the scorer's
    /// explore/exploit policy, invoke them, and push every discovered item
    /// through ingestion. Handler/adapter failures never abort the pass —
    /// they are collected into `FeedResult::errors` alongside ingestion
    /// errors.
    pub async fn invoke_for_feed(&self, ctx: &RetrievalContext) -> Result<IngestReport> {
        let invocation = self.deps.orchestrator.invoke_for_feed(ctx).await?;
        tracing::info!(
            items = invocation.items.len(),
            new_retrievers = invocation.new_retrievers.len(),
            errors = invocation.errors.len(),
            "orchestrator pass complete"
        );

        let mut report = self
            .deps
            .ingestion
            .ingest(invocation.items, PipelineOptions::default())
            .await;
        report.errors.extend(invocation.errors);
        Ok(report)
    }

    /// Record an explicit rating against `content_id`: persists the
    /// `ExplicitFeedback` row, then propagates the score through the
    /// content's primary encoding's source up the retriever DAG.
    /// A content with no resolvable source is still recorded as feedback;
    /// score propagation is a no-op in that case.
    pub async fn rate_content(
        &self,
        content_id: &str,
        score: f64,
        selections: Option<HashMap<String, Vec<String>>>,
    ) -> Result<Vec<String>> {
        let feedback = ExplicitFeedback {
            id: short_id(),
            item_id: content_id.to_string(),
            timestamp: Utc::now(),
            reward_score: score.clamp(0.0, 5.0),
            selections: selections.unwrap_or_default(),
            notes: None,
            completion_pct: None,
            is_checkpoint: false,
        };
        self.deps.store.add_explicit_feedback(feedback).await?;

        let encodings = self.deps.store.encodings_for_content(content_id).await?;
        let Some(encoding) = encodings.iter().find(|e| e.is_primary).or_else(|| encodings.first()) else {
            tracing::warn!(content_id, "rated content has no encoding; score not propagated");
            return Ok(Vec::new());
        };

        self.deps
            .scorer
            .record_rating_via_source(&encoding.source_id, score)
            .await
    }

    /// Score up to `FEED_CANDIDATE_POOL` unhidden contents and return the
    /// top `limit`, highest combined score first. Falls back to
    /// cold-start priors per item when no model is trained.
    pub async fn get_feed(&self, objective: Option<&str>, limit: usize) -> Result<FeedResult> {
        let candidates = self
            .deps
            .store
            .get_contents(None, Some(false), None, FEED_CANDIDATE_POOL, 0)
            .await?;
        score_contents(&self.deps.models, self.deps.store.as_ref(), candidates, objective, limit).await
    }

    /// Rebuild the named model (`"default"` or `"multi_objective"`, or any
    /// caller-registered name) from the store's current training data and
    /// persist it.
    pub async fn train(&self, model_name: &str) -> Result<()> {
        self.deps.models.train_model(model_name, self.deps.store.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use omnifeed_common::{Content, ConsumptionType, ContentType, Embedding, Encoding, SourceInfo};
    use omnifeed_embedding::{AudioEmbedder, TextEmbedder};
    use omnifeed_ingest::EnricherRegistry;
    use omnifeed_retriever::handlers::source_wrapper::SourceRetrieverHandler;
    use omnifeed_retriever::{Adapter, AdapterRegistry, RawItem, RetrieverKind};
    use omnifeed_store::InMemoryStore;

    struct StubAdapter;

    #[async_trait]
    impl Adapter for StubAdapter {
        fn source_type(&self) -> &str {
            "rss"
        }

        fn can_handle(&self, url: &str) -> bool {
            url.starts_with("https://blog.example/")
        }

        async fn resolve(&self, url: &str) -> Result<SourceInfo> {
            Ok(SourceInfo {
                source_type: "rss".to_string(),
                uri: url.to_string(),
                display_name: "Example Blog".to_string(),
                avatar_url: None,
                metadata: HashMap::new(),
            })
        }

        async fn poll(&self, source: &SourceInfo, since: Option<chrono::DateTime<Utc>>) -> Result<Vec<RawItem>> {
            if since.is_some() {
                return Ok(Vec::new());
            }
            Ok(vec![RawItem {
                external_id: "post-1".to_string(),
                url: format!("{}/post-1", source.uri),
                title: "First post".to_string(),
                published_at: Utc::now(),
                raw_metadata: HashMap::new(),
            }])
        }
    }

    struct StubTextEmbedder;

    #[async_trait]
    impl TextEmbedder for StubTextEmbedder {
        fn model_name(&self) -> &str {
            "stub-text"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }

    fn build_engine(store: Arc<dyn Store>) -> Engine {
        let mut adapters = AdapterRegistry::new();
        adapters.register(Arc::new(StubAdapter));
        let mut handlers = HandlerRegistry::new();
        handlers.register(Arc::new(SourceRetrieverHandler::new(Arc::new(adapters))));
        let handlers = Arc::new(handlers);

        let scorer = Arc::new(RetrieverScorer::new(store.clone(), 0.3, 5));
        let ingestion = Arc::new(IngestionPipeline::new(
            store.clone(),
            Some(Arc::new(StubTextEmbedder) as Arc<dyn TextEmbedder>),
            None::<Arc<dyn AudioEmbedder>>,
            Arc::new(EnricherRegistry::new()),
        ));
        let dir = tempfile::tempdir().unwrap();
        let models = Arc::new(ModelRegistry::new(dir.path(), 2));
        // Leak the tempdir so it outlives the registry for the duration of the test.
        std::mem::forget(dir);

        let deps = EngineDeps::new(store, handlers, scorer, ingestion, models);
        Engine::new(deps)
    }

    #[tokio::test]
    async fn add_source_resolves_through_adapter_and_persists_retriever() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let engine = build_engine(store.clone());

        let retriever = engine.add_source("https://blog.example/feed").await.unwrap();
        assert_eq!(retriever.kind, RetrieverKind::Poll);
        assert_eq!(retriever.handler_type, "source");

        let fetched = store.get_retriever_by_uri(&retriever.uri).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn invoke_for_feed_ingests_items_from_invoked_retrievers() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let engine = build_engine(store.clone());
        engine.add_source("https://blog.example/feed").await.unwrap();

        let ctx = RetrievalContext {
            max_results: 10,
            ..Default::default()
        };
        let report = engine.invoke_for_feed(&ctx).await.unwrap();
        assert_eq!(report.ingested.len(), 1);
        assert_eq!(report.ingested[0].title, "First post");
    }

    #[tokio::test]
    async fn rate_content_persists_feedback_and_propagates_score() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let engine = build_engine(store.clone());
        let retriever = engine.add_source("https://blog.example/feed").await.unwrap();

        let ctx = RetrievalContext {
            max_results: 10,
            ..Default::default()
        };
        engine.invoke_for_feed(&ctx).await.unwrap();

        let contents = store.get_contents(None, None, None, 10, 0).await.unwrap();
        let content = contents.into_iter().next().expect("ingested content");

        let updated = engine.rate_content(&content.id, 4.5, None).await.unwrap();
        assert_eq!(updated, vec![retriever.id.clone()]);

        let feedback = store.get_explicit_feedback(&content.id).await.unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].reward_score, 4.5);

        let r = store.get_retriever(&retriever.id).await.unwrap().unwrap();
        assert_eq!(r.score.unwrap().value, 4.5);
    }

    #[tokio::test]
    async fn get_feed_falls_back_to_cold_start_priors_when_untrained() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let engine = build_engine(store.clone());

        store
            .upsert_content(Content {
                id: "c1".to_string(),
                title: "Cold start item".to_string(),
                content_type: ContentType::Article,
                published_at: Utc::now(),
                ingested_at: Utc::now(),
                creator_ids: Vec::new(),
                consumption_type: ConsumptionType::OneShot,
                canonical_ids: HashMap::new(),
                seen: false,
                hidden: false,
                series_id: None,
                series_position: None,
                metadata: HashMap::new(),
                embeddings: vec![Embedding {
                    name: "text".to_string(),
                    kind: "text".to_string(),
                    model: "m".to_string(),
                    vector: vec![1.0, 2.0],
                }],
            })
            .await
            .unwrap();

        let result = engine.get_feed(None, 10).await.unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].score.combined, 2.5);
    }

    #[tokio::test]
    async fn add_retriever_rejects_unclaimed_uri() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let engine = build_engine(store);
        let err = engine.add_retriever("gopher://nowhere").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn train_persists_and_get_model_becomes_available() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let engine = build_engine(store.clone());

        for i in 0..6 {
            let content_id = format!("c{i}");
            store
                .upsert_content(Content {
                    id: content_id.clone(),
                    title: format!("Item {i}"),
                    content_type: ContentType::Article,
                    published_at: Utc::now(),
                    ingested_at: Utc::now(),
                    creator_ids: Vec::new(),
                    consumption_type: ConsumptionType::OneShot,
                    canonical_ids: HashMap::new(),
                    seen: false,
                    hidden: false,
                    series_id: None,
                    series_position: None,
                    metadata: HashMap::new(),
                    embeddings: vec![Embedding {
                        name: "text".to_string(),
                        kind: "text".to_string(),
                        model: "m".to_string(),
                        vector: vec![i as f32, 1.0],
                    }],
                })
                .await
                .unwrap();
            store
                .add_encoding(Encoding {
                    id: format!("enc{i}"),
                    content_id: content_id.clone(),
                    source_id: "src".to_string(),
                    source_type: "rss".to_string(),
                    external_id: format!("ext-{i}"),
                    uri: format!("https://example.com/{i}"),
                    media_type: None,
                    metadata: HashMap::new(),
                    discovered_at: Utc::now(),
                    is_primary: true,
                })
                .await
                .unwrap();
            store
                .add_explicit_feedback(ExplicitFeedback {
                    id: format!("fb{i}"),
                    item_id: content_id.clone(),
                    timestamp: Utc::now(),
                    reward_score: if i % 2 == 0 { 4.0 } else { 1.0 },
                    selections: HashMap::new(),
                    notes: None,
                    completion_pct: None,
                    is_checkpoint: false,
                })
                .await
                .unwrap();
        }

        engine.train("default").await.unwrap();
        let result = engine.get_feed(None, 5).await.unwrap();
        assert!(!result.items.is_empty());
    }
}
