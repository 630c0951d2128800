use thiserror::Error;

/// Error taxonomy for the core. Variants map to the kinds the orchestrator,
/// ingestion pipeline, and ranking model need to distinguish for recovery —
/// not every variant necessarily aborts the enclosing operation.
#[derive(Error, Debug)]
pub enum OmniFeedError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("fetch error: {0}")]
    FetchError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("no trained model available for objective {objective:?}")]
    ModelUnavailable { objective: Option<String> },

    #[error("features out of distribution: max |scaled| = {max_abs}")]
    OODFeatures { max_abs: f64 },

    #[error("encoding already exists for ({source_type}, {external_id})")]
    DualWriteConflict {
        source_type: String,
        external_id: String,
    },

    #[error("fatal: {0}")]
    Fatal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, OmniFeedError>;
