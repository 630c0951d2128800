use std::env;

/// Application configuration loaded from environment variables.
///
/// Values otherwise treated as fixed constants (EMA alpha, confidence
/// sample count, explore ratio, fusion output dimension, HTTP timeout) are
/// exposed here with sensible defaults so operators can tune them without
/// recompiling.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,

    // Embedding service
    pub embedding_api_key: String,
    pub embedding_model: String,
    pub audio_embedding_api_key: String,

    // Scorer tuning
    pub ema_alpha: f64,
    pub min_confidence_samples: u32,
    pub default_explore_ratio: f64,
    pub min_exploit_confidence: f64,

    // Orchestrator tuning
    pub default_max_depth: u32,
    pub default_feed_limit: usize,
    pub http_timeout_secs: u64,

    // Embedding fusion
    pub fusion_output_dim: usize,

    // Ranking model storage
    pub model_dir: String,
}

impl Config {
    /// Load configuration for the full engine (orchestrator + ingestion + ranking).
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            embedding_api_key: required_env("EMBEDDING_API_KEY"),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "voyage-3-large".to_string()),
            audio_embedding_api_key: env::var("AUDIO_EMBEDDING_API_KEY").unwrap_or_default(),
            ema_alpha: parsed_env("EMA_ALPHA", 0.3),
            min_confidence_samples: parsed_env("MIN_CONFIDENCE_SAMPLES", 5),
            default_explore_ratio: parsed_env("DEFAULT_EXPLORE_RATIO", 0.3),
            min_exploit_confidence: parsed_env("MIN_EXPLOIT_CONFIDENCE", 0.3),
            default_max_depth: parsed_env("DEFAULT_MAX_DEPTH", 1),
            default_feed_limit: parsed_env("DEFAULT_FEED_LIMIT", 50),
            http_timeout_secs: parsed_env("HTTP_TIMEOUT_SECS", 30),
            fusion_output_dim: parsed_env("FUSION_OUTPUT_DIM", 128),
            model_dir: env::var("MODEL_DIR").unwrap_or_else(|_| "~/.omnifeed".to_string()),
        }
    }

    /// Load config for a poll-only worker: no embedding or ranking keys required.
    pub fn poller_from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            embedding_api_key: env::var("EMBEDDING_API_KEY").unwrap_or_default(),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "voyage-3-large".to_string()),
            audio_embedding_api_key: String::new(),
            ema_alpha: parsed_env("EMA_ALPHA", 0.3),
            min_confidence_samples: parsed_env("MIN_CONFIDENCE_SAMPLES", 5),
            default_explore_ratio: parsed_env("DEFAULT_EXPLORE_RATIO", 0.3),
            min_exploit_confidence: parsed_env("MIN_EXPLOIT_CONFIDENCE", 0.3),
            default_max_depth: parsed_env("DEFAULT_MAX_DEPTH", 1),
            default_feed_limit: parsed_env("DEFAULT_FEED_LIMIT", 50),
            http_timeout_secs: parsed_env("HTTP_TIMEOUT_SECS", 30),
            fusion_output_dim: parsed_env("FUSION_OUTPUT_DIM", 128),
            model_dir: env::var("MODEL_DIR").unwrap_or_else(|_| "~/.omnifeed".to_string()),
        }
    }

    /// Log redacted config: secrets are reduced to a character count.
    pub fn log_redacted(&self) {
        let secrets = [
            ("DATABASE_URL", &self.database_url),
            ("EMBEDDING_API_KEY", &self.embedding_api_key),
            ("AUDIO_EMBEDDING_API_KEY", &self.audio_embedding_api_key),
        ];
        for (name, value) in secrets {
            if value.is_empty() {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({} chars)", value.len());
            }
        }
        tracing::info!(
            ema_alpha = self.ema_alpha,
            min_confidence_samples = self.min_confidence_samples,
            default_explore_ratio = self.default_explore_ratio,
            fusion_output_dim = self.fusion_output_dim,
            "loaded config"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
