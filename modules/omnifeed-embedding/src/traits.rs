use anyhow::Result;
use async_trait::async_trait;

/// Encodes text into a dense vector. Implementations call out to a hosted
/// embedding API; the model name returned is stamped onto the resulting
/// `Embedding` so later retraining can detect a model change.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    fn model_name(&self) -> &str;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Encodes an audio file (by local path) into a dense vector.
#[async_trait]
pub trait AudioEmbedder: Send + Sync {
    fn model_name(&self) -> &str;
    async fn embed_file(&self, path: &std::path::Path) -> Result<Vec<f32>>;
}
