//! Data types and error definitions for the persisted vector index.

use crate::embedding::EmbeddingClientError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A unit of retrievable text stored with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk text returned to the context assembler.
    pub content: String,
    /// Embedding produced at ingestion time.
    pub embedding: Vec<f32>,
    /// Originating file name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl DocumentChunk {
    /// Create a chunk without source metadata.
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            content: content.into(),
            embedding,
            source: None,
        }
    }

    /// Attach the originating file name.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A chunk paired with its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Retrieved chunk.
    pub chunk: DocumentChunk,
    /// Cosine similarity; higher is more relevant.
    pub score: f32,
}

/// Descriptive header persisted next to the chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// On-disk layout version.
    pub format_version: u32,
    /// Embedding model that produced the stored vectors.
    pub embedding_model: String,
    /// Dimensionality shared by every stored vector.
    pub dimension: usize,
    /// Number of chunks in the index.
    pub chunk_count: usize,
    /// Number of source documents that contributed chunks.
    pub document_count: usize,
    /// RFC 3339 build timestamp.
    pub built_at: String,
}

/// Errors raised while loading, persisting, or querying the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No persisted index artifact exists; ingestion has never run.
    #[error("No index found at {path}; process documents first")]
    Unavailable {
        /// Directory that was expected to contain the artifact.
        path: PathBuf,
    },
    /// Filesystem failure while reading or writing the artifact.
    #[error("Index I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Artifact exists but could not be decoded.
    #[error("Index artifact is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    /// A vector does not match the index dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension recorded in the manifest.
        expected: usize,
        /// Dimension actually supplied.
        actual: usize,
    },
}

/// Errors surfaced by the embedding store accessor.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The index has not been built.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(#[source] IndexError),
    /// Query text or `k` was rejected before any work happened.
    #[error("Invalid retrieval request: {0}")]
    InvalidQuery(String),
    /// Embedding provider failed to encode the query.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors for the query")]
    EmptyEmbedding,
    /// Index could not be read or searched.
    #[error("Index search failed: {0}")]
    Index(#[source] IndexError),
}

impl From<IndexError> for RetrievalError {
    fn from(error: IndexError) -> Self {
        match error {
            unavailable @ IndexError::Unavailable { .. } => Self::IndexUnavailable(unavailable),
            other => Self::Index(other),
        }
    }
}
