use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use omnifeed_common::{short_id, Content, Embedding, Encoding, SourceInfo};
use omnifeed_embedding::{l2_normalize, AudioEmbedder, TextEmbedder};
use omnifeed_retriever::{IngestCandidate, RawItem};
use omnifeed_store::Store;
use tracing::warn;

use crate::content::{build_content, build_text_corpus};
use crate::creator::find_or_create_creator;
use crate::enrichment::EnricherRegistry;
use crate::metadata::partition_metadata;

/// Flags controlling which pipeline steps run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub generate_embeddings: bool,
    pub enrich_content: bool,
    pub persist: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            generate_embeddings: true,
            enrich_content: true,
            persist: true,
        }
    }
}

/// Outcome of running a batch of candidates through the pipeline.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub ingested: Vec<Content>,
    pub errors: Vec<String>,
}

/// Outcome of a `refresh_embeddings` run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshReport {
    pub updated_count: u64,
    pub skipped_count: u64,
    pub failed_count: u64,
}

/// The sole path by which a raw item becomes durable `(Content, Encoding)`
/// rows. Owns the embedding clients and source-specific enrichers;
/// every mutation goes through the `Store`.
pub struct IngestionPipeline {
    store: Arc<dyn Store>,
    text_embedder: Option<Arc<dyn TextEmbedder>>,
    audio_embedder: Option<Arc<dyn AudioEmbedder>>,
    enrichers: Arc<EnricherRegistry>,
    http: reqwest::Client,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn Store>,
        text_embedder: Option<Arc<dyn TextEmbedder>>,
        audio_embedder: Option<Arc<dyn AudioEmbedder>>,
        enrichers: Arc<EnricherRegistry>,
    ) -> Self {
        Self {
            store,
            text_embedder,
            audio_embedder,
            enrichers,
            http: reqwest::Client::new(),
        }
    }

    pub async fn ingest(
        &self,
        candidates: Vec<IngestCandidate>,
        options: PipelineOptions,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        for candidate in candidates {
            match self.ingest_one(candidate, &options).await {
                Ok(content) => report.ingested.push(content),
                Err(e) => {
                    warn!(error = %e, "ingestion failed for item");
                    report.errors.push(e.to_string());
                }
            }
        }
        report
    }

    async fn ingest_one(&self, candidate: IngestCandidate, options: &PipelineOptions) -> Result<Content> {
        let IngestCandidate {
            mut raw,
            source_type,
            source_uri,
        } = candidate;

        if options.enrich_content {
            if let Some(enricher) = self.enrichers.get(&source_type) {
                if let Err(e) = enricher.enrich(&mut raw).await {
                    warn!(source_type = %source_type, external_id = %raw.external_id, error = %e, "enrichment failed, skipping");
                }
            }
        }

        let source = match self.store.get_source_by_uri(&source_type, &source_uri).await? {
            Some(source) => source,
            None => {
                let info = SourceInfo {
                    source_type: source_type.clone(),
                    uri: source_uri.clone(),
                    display_name: source_uri.clone(),
                    avatar_url: None,
                    metadata: HashMap::new(),
                };
                self.store.add_source(info).await?
            }
        };

        let existing_encoding = self
            .store
            .get_encoding_by_external_id(&source.id, &raw.external_id)
            .await?;

        let mut content = match &existing_encoding {
            Some(encoding) => self
                .store
                .get_content(&encoding.content_id)
                .await?
                .ok_or_else(|| anyhow!("encoding {} references missing content", encoding.id))?,
            None => build_content(&raw, &source),
        };

        if options.generate_embeddings {
            self.generate_embeddings(&mut content, &raw).await;
        }

        if let Some(author) = raw.raw_metadata.get("author").and_then(|v| v.as_str()) {
            let creator = find_or_create_creator(self.store.as_ref(), author, &HashMap::new()).await?;
            if !content.creator_ids.contains(&creator.id) {
                content.creator_ids = vec![creator.id];
            }
        }

        if !options.persist {
            return Ok(content);
        }

        let content = self.store.upsert_content(content).await?;

        if existing_encoding.is_none() {
            let (_, encoding_metadata) = partition_metadata(&raw.raw_metadata);
            let media_type = raw
                .raw_metadata
                .get("media_type")
                .and_then(|v| v.as_str())
                .map(String::from);
            let encoding = Encoding {
                id: short_id(),
                content_id: content.id.clone(),
                source_id: source.id.clone(),
                source_type: source_type.clone(),
                external_id: raw.external_id.clone(),
                uri: raw.url.clone(),
                media_type,
                metadata: encoding_metadata,
                discovered_at: Utc::now(),
                is_primary: true,
            };
            self.store.add_encoding(encoding).await?;
        }

        Ok(content)
    }

    async fn generate_embeddings(&self, content: &mut Content, raw: &RawItem) {
        if self.text_embedder.is_some() && content.embedding_of_type(Embedding::TEXT).is_none() {
            let author = raw.raw_metadata.get("author").and_then(|v| v.as_str());
            let corpus = build_text_corpus(&raw.title, author, &raw.raw_metadata);
            match self.embed_text(&corpus).await {
                Ok(embedding) => content.set_embedding(embedding),
                Err(e) => warn!(content_id = %content.id, error = %e, "text embedding failed"),
            }
        }

        if self.audio_embedder.is_some() && content.embedding_of_type(Embedding::AUDIO).is_none() {
            if let Some(url) = raw
                .raw_metadata
                .get("audio_preview_url")
                .and_then(|v| v.as_str())
            {
                match self.embed_audio(url).await {
                    Ok(embedding) => content.set_embedding(embedding),
                    Err(e) => warn!(content_id = %content.id, url = %url, error = %e, "audio embedding failed"),
                }
            }
        }
    }

    async fn embed_text(&self, corpus: &str) -> Result<Embedding> {
        let embedder = self
            .text_embedder
            .as_ref()
            .ok_or_else(|| anyhow!("no text embedder configured"))?;
        let vector = embedder.embed(corpus).await?;
        Ok(Embedding {
            name: Embedding::TEXT.to_string(),
            kind: Embedding::TEXT.to_string(),
            model: embedder.model_name().to_string(),
            vector,
        })
    }

    /// Download `url` to a scoped temp file, embed it, and L2-normalize the
    /// result. The temp file is released on every return path
    /// via `NamedTempFile`'s drop.
    async fn embed_audio(&self, url: &str) -> Result<Embedding> {
        let embedder = self
            .audio_embedder
            .as_ref()
            .ok_or_else(|| anyhow!("no audio embedder configured"))?;

        let bytes = self.http.get(url).send().await?.error_for_status()?.bytes().await?;
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&bytes)?;

        let vector = embedder.embed_file(file.path()).await?;
        Ok(Embedding {
            name: Embedding::AUDIO.to_string(),
            kind: Embedding::AUDIO.to_string(),
            model: embedder.model_name().to_string(),
            vector: l2_normalize(vector),
        })
    }

    /// Force-regenerate embeddings for already-ingested content.
    ///
    /// Loads up to 10,000 items from the store (optionally filtered by
    /// `source_id`) when `items` is not given. A missing embedder for
    /// `embedding_type` is a batch-level failure: every candidate item is
    /// counted failed without attempting per-item calls.
    pub async fn refresh_embeddings(
        &self,
        items: Option<Vec<Content>>,
        source_id: Option<&str>,
        embedding_type: &str,
        force: bool,
    ) -> Result<RefreshReport> {
        let mut contents = match items {
            Some(items) => items,
            None => self.store.get_contents(None, None, source_id, 10_000, 0).await?,
        };

        let embedder_available = match embedding_type {
            Embedding::TEXT => self.text_embedder.is_some(),
            Embedding::AUDIO => self.audio_embedder.is_some(),
            _ => false,
        };
        if !embedder_available {
            return Ok(RefreshReport {
                updated_count: 0,
                skipped_count: 0,
                failed_count: contents.len() as u64,
            });
        }

        let mut report = RefreshReport::default();
        for content in contents.iter_mut() {
            if !force && content.embedding_of_type(embedding_type).is_some() {
                report.skipped_count += 1;
                continue;
            }
            content.embeddings.retain(|e| e.kind != embedding_type);

            let result = match embedding_type {
                Embedding::TEXT => {
                    let author = content.metadata.get("author").and_then(|v| v.as_str());
                    let corpus = build_text_corpus(&content.title, author, &content.metadata);
                    self.embed_text(&corpus).await
                }
                Embedding::AUDIO => {
                    match content
                        .metadata
                        .get("audio_preview_url")
                        .and_then(|v| v.as_str())
                    {
                        Some(url) => self.embed_audio(url).await,
                        None => Err(anyhow!("no audio_preview_url on content {}", content.id)),
                    }
                }
                other => Err(anyhow!("unsupported embedding type {other}")),
            };

            match result {
                Ok(embedding) => {
                    content.set_embedding(embedding);
                    if let Err(e) = self.store.upsert_content(content.clone()).await {
                        warn!(content_id = %content.id, error = %e, "failed to persist refreshed embedding");
                    }
                    report.updated_count += 1;
                }
                Err(e) => {
                    warn!(content_id = %content.id, error = %e, "refresh_embeddings failed for item");
                    report.failed_count += 1;
                }
            }
        }

        Ok(report)
    }
}
