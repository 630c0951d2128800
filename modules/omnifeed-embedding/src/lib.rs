pub mod client;
pub mod fusion;
pub mod pca;
pub mod traits;

pub use client::{l2_normalize, AudioEmbeddingClient, VoyageEmbeddingClient, DEFAULT_AUDIO_MODEL};
pub use fusion::EmbeddingFusion;
pub use pca::PcaProjection;
pub use traits::{AudioEmbedder, TextEmbedder};
