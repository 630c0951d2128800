use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::traits::{AudioEmbedder, TextEmbedder};

const VOYAGE_API_URL: &str = "https://api.voyageai.com/v1/embeddings";

/// Default CLAP checkpoint for music/speech audio embeddings, served behind
/// whatever inference endpoint `AudioEmbeddingClient` is pointed at.
pub const DEFAULT_AUDIO_MODEL: &str = "laion/larger_clap_music_and_speech";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Text embedding client for a Voyage-AI-compatible hosted embeddings API.
pub struct VoyageEmbeddingClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl VoyageEmbeddingClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl TextEmbedder for VoyageEmbeddingClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch.pop().ok_or_else(|| anyhow!("embedding API returned no vectors"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.model, count = texts.len(), "embedding batch request");

        let request = EmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let response = self
            .http
            .post(VOYAGE_API_URL)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("embedding API error ({status}): {error_text}"));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Serialize)]
struct AudioEmbeddingRequest {
    model: String,
    audio_base64: String,
}

#[derive(Deserialize)]
struct AudioEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Audio embedding client for a CLAP-compatible hosted inference endpoint.
/// The endpoint is operator-configured (`base_url`); this crate has no
/// opinion on who runs it.
pub struct AudioEmbeddingClient {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl AudioEmbeddingClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_AUDIO_MODEL.to_string(),
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl AudioEmbedder for AudioEmbeddingClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_file(&self, path: &std::path::Path) -> Result<Vec<f32>> {
        use base64::Engine;

        let bytes = tokio::fs::read(path).await?;
        let audio_base64 = base64::engine::general_purpose::STANDARD.encode(bytes);

        let request = AudioEmbeddingRequest {
            model: self.model.clone(),
            audio_base64,
        };

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("audio embedding API error ({status}): {error_text}"));
        }

        let parsed: AudioEmbeddingResponse = response.json().await?;
        Ok(l2_normalize(parsed.embedding))
    }
}

/// L2-normalize a vector in place, returning it. No-op on a zero vector.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_produces_unit_vector() {
        let v = l2_normalize(vec![3.0, 4.0]);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_vector_is_noop() {
        let v = l2_normalize(vec![0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
