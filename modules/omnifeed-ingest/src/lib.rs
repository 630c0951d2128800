pub mod content;
pub mod creator;
pub mod enrichment;
pub mod metadata;
pub mod pipeline;

pub use content::{build_content, build_text_corpus, infer_content_type};
pub use creator::find_or_create_creator;
pub use enrichment::{EnricherRegistry, SourceEnricher};
pub use metadata::partition_metadata;
pub use pipeline::{IngestReport, IngestionPipeline, PipelineOptions, RefreshReport};
