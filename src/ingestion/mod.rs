//! Document ingestion: PDF extraction, semantic chunking, embedding, and index rebuild.

mod chunking;
mod pdf;
mod service;
pub mod types;

pub(crate) use service::is_pdf;
pub use service::{IngestionService, IngestionSettings};
pub use types::{ChunkingError, IngestionError, IngestionOutcome};

#[cfg(test)]
pub(crate) use pdf::sample_pdf;
