//! Error definitions and outcome summaries for document ingestion.

use crate::embedding::EmbeddingClientError;
use crate::index::IndexError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning raw text into semantic chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible token budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted while rebuilding the index from the document library.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The upload directory could not be enumerated.
    #[error("Failed to read upload directory {path}: {source}")]
    UploadDir {
        /// Directory being walked.
        path: PathBuf,
        /// Underlying walk failure.
        #[source]
        source: walkdir::Error,
    },
    /// A document could not be read from disk.
    #[error("Failed to read document {path}: {source}")]
    ReadDocument {
        /// Document path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A document is not a parseable PDF.
    #[error("Failed to parse PDF {path}: {source}")]
    Pdf {
        /// Document path.
        path: PathBuf,
        /// Parser failure.
        #[source]
        source: lopdf::Error,
    },
    /// Chunking step failed to segment a document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors for the chunks.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned a different number of vectors than requested.
    #[error("Embedding provider returned {actual} vectors for {expected} chunks")]
    EmbeddingCountMismatch {
        /// Number of chunks submitted.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
    /// No document produced any text.
    #[error("No text could be extracted from the uploaded documents ({skipped} skipped)")]
    NoContent {
        /// Documents that failed to parse.
        skipped: usize,
    },
    /// The rebuilt index could not be assembled or persisted.
    #[error("Failed to write index: {0}")]
    Index(#[from] IndexError),
}

/// Summary of a completed rebuild produced by [`crate::ingestion::IngestionService::rebuild`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IngestionOutcome {
    /// Documents that contributed at least one chunk.
    pub documents: usize,
    /// Documents skipped because their text could not be extracted.
    pub skipped_documents: Vec<String>,
    /// Chunks written to the new index.
    pub chunk_count: usize,
    /// Token budget used when splitting.
    pub chunk_size: usize,
    /// Chunks dropped because identical content was already indexed.
    pub skipped_duplicates: usize,
}
