use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use omnifeed_store::Store;

use crate::model::RankingModel;
use crate::training::{collect_training_data, source_stats_for_content};

/// One registered model slot: its cached instance (if loaded and trained),
/// on-disk path, and dispatch metadata.
struct ModelEntry {
    name: String,
    path: PathBuf,
    supports_objectives: bool,
    is_default: bool,
    objectives: Vec<String>,
    cached: RwLock<Option<RankingModel>>,
}

/// Named models with a loader, on-disk path, `supports_objectives` flag, and
/// an optional default mark. `get_model_for_objective` is the only read path
/// callers need; `train_model` is the only write path.
pub struct ModelRegistry {
    model_dir: PathBuf,
    fusion_output_dim: usize,
    entries: HashMap<String, ModelEntry>,
}

const DEFAULT_MODEL_NAME: &str = "default";
const MULTI_OBJECTIVE_MODEL_NAME: &str = "multi_objective";

impl ModelRegistry {
    /// Registers the two default models: `"default"`
    /// (single-objective, marked default) and `"multi_objective"`
    /// (multi-objective, dispatched to by every objective id). Attempts to
    /// load each from `model_dir` if a file already exists there.
    pub fn new(model_dir: impl AsRef<Path>, fusion_output_dim: usize) -> Self {
        let model_dir = model_dir.as_ref().to_path_buf();
        let mut registry = Self {
            model_dir,
            fusion_output_dim,
            entries: HashMap::new(),
        };

        registry.register(DEFAULT_MODEL_NAME, false, true, Vec::new());
        registry.register(
            MULTI_OBJECTIVE_MODEL_NAME,
            true,
            false,
            omnifeed_common::ExplicitFeedback::OBJECTIVE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        registry
    }

    fn register(
        &mut self,
        name: &str,
        supports_objectives: bool,
        is_default: bool,
        objectives: Vec<String>,
    ) {
        let path = self.model_dir.join(format!("{name}.json"));
        let cached = load_from_disk(&path).ok().flatten();
        self.entries.insert(
            name.to_string(),
            ModelEntry {
                name: name.to_string(),
                path,
                supports_objectives,
                is_default,
                objectives,
                cached: RwLock::new(cached),
            },
        );
    }

    /// Step 1: a registered model whose mapped objectives include `objective`
    /// and is trained. Step 2: the default model, if trained. Step 3: `None`,
    /// leaving callers to fall back to source/default priors.
    pub fn get_model_for_objective(&self, objective: Option<&str>) -> Option<ModelHandle<'_>> {
        fn trained(entry: &ModelEntry) -> bool {
            entry
                .cached
                .read()
                .unwrap()
                .as_ref()
                .map(|m| m.is_trained())
                .unwrap_or(false)
        }

        if let Some(obj) = objective {
            for entry in self.entries.values() {
                if entry.supports_objectives && entry.objectives.iter().any(|o| o == obj) && trained(entry) {
                    return Some(ModelHandle { entry });
                }
            }
        }

        let default_entry = self.entries.values().find(|e| e.is_default)?;
        if trained(default_entry) {
            return Some(ModelHandle { entry: default_entry });
        }
        None
    }

    /// Builds a fresh instance from current store state, trains it, and — on
    /// success — persists it to disk and swaps the cached instance.
    pub async fn train_model(&self, name: &str, store: &dyn Store) -> Result<()> {
        let entry = self
            .entries
            .get(name)
            .with_context(|| format!("no registered model named '{name}'"))?;

        let (examples, stats) = collect_training_data(store).await?;
        tracing::info!(
            model = name,
            examples = stats.example_count,
            missing_embeddings = stats.missing_embeddings,
            "training ranking model"
        );

        let mut model = RankingModel::new(name, self.fusion_output_dim, entry.supports_objectives, entry.is_default);
        model.train(&examples);

        if model.is_trained() {
            persist_to_disk(&entry.path, &model)?;
        }

        *entry.cached.write().unwrap() = Some(model);
        Ok(())
    }
}

/// A read handle to a cached, trained model plus its name, returned by
/// `get_model_for_objective`.
pub struct ModelHandle<'a> {
    entry: &'a ModelEntry,
}

impl<'a> ModelHandle<'a> {
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn score(
        &self,
        content: &omnifeed_common::Content,
        source_stats: &omnifeed_common::SourceStats,
        objective: Option<&str>,
    ) -> Option<crate::model::ScoreResult> {
        let guard = self.entry.cached.read().unwrap();
        guard.as_ref().map(|m| m.score(content, source_stats, objective))
    }
}

/// Resolves the source stats a caller should score with, given only a
/// content id and a store — a thin convenience over
/// `training::source_stats_for_content` for callers outside this crate.
pub async fn score_content(
    registry: &ModelRegistry,
    store: &dyn Store,
    content: &omnifeed_common::Content,
    objective: Option<&str>,
) -> Result<Option<crate::model::ScoreResult>> {
    let Some(handle) = registry.get_model_for_objective(objective) else {
        return Ok(None);
    };
    let stats = source_stats_for_content(store, &content.id).await?;
    Ok(handle.score(content, &stats, objective))
}

fn load_from_disk(path: &Path) -> Result<Option<RankingModel>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path).with_context(|| format!("reading model file {}", path.display()))?;
    let model: RankingModel =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing model file {}", path.display()))?;
    Ok(Some(model))
}

fn persist_to_disk(path: &Path, model: &RankingModel) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating model dir {}", parent.display()))?;
    }
    let bytes = serde_json::to_vec(model).context("serializing trained model")?;
    std::fs::write(path, bytes).with_context(|| format!("writing model file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use omnifeed_common::{
        ConsumptionType, Content, ContentType, Embedding, Encoding, ExplicitFeedback, FeedbackEvent, SourceInfo,
    };
    use omnifeed_store::InMemoryStore;
    use std::collections::HashMap as Map;

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let source = store
            .add_source(SourceInfo {
                source_type: "rss".to_string(),
                uri: "https://example.com/feed".to_string(),
                display_name: "Feed".to_string(),
                avatar_url: None,
                metadata: Map::new(),
            })
            .await
            .unwrap();

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
                    canonical_ids: Map::new(),
                    seen: false,
                    hidden: false,
                    series_id: None,
                    series_position: None,
                    metadata: Map::new(),
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
                    source_id: source.id.clone(),
                    source_type: "rss".to_string(),
                    external_id: format!("ext-{i}"),
                    uri: format!("https://example.com/{i}"),
                    media_type: None,
                    metadata: Map::new(),
                    discovered_at: Utc::now(),
                    is_primary: true,
                })
                .await
                .unwrap();

            store
                .add_feedback_event(FeedbackEvent {
                    id: format!("evt{i}"),
                    item_id: content_id.clone(),
                    timestamp: Utc::now(),
                    event_type: "click".to_string(),
                    payload: Map::new(),
                })
                .await
                .unwrap();

            store
                .add_explicit_feedback(ExplicitFeedback {
                    id: format!("fb{i}"),
                    item_id: content_id.clone(),
                    timestamp: Utc::now(),
                    reward_score: if i % 2 == 0 { 4.0 } else { 1.0 },
                    selections: Map::new(),
                    notes: None,
                    completion_pct: None,
                    is_checkpoint: false,
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn untrained_registry_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path(), 2);
        assert!(registry.get_model_for_objective(None).is_none());
    }

    #[tokio::test]
    async fn training_default_model_makes_it_retrievable() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path(), 2);
        let store = seeded_store().await;

        registry.train_model(DEFAULT_MODEL_NAME, &store).await.unwrap();
        let handle = registry.get_model_for_objective(None).expect("trained default model");
        assert_eq!(handle.name(), DEFAULT_MODEL_NAME);
        assert!(dir.path().join("default.json").exists());
    }

    #[tokio::test]
    async fn reloading_registry_from_disk_recovers_trained_model() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store().await;

        {
            let registry = ModelRegistry::new(dir.path(), 2);
            registry.train_model(DEFAULT_MODEL_NAME, &store).await.unwrap();
        }

        let reloaded = ModelRegistry::new(dir.path(), 2);
        assert!(reloaded.get_model_for_objective(None).is_some());
    }
}
