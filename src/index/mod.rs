//! Persisted vector index and the embedding store accessor built on top of it.

pub mod accessor;
pub mod store;
pub mod types;

pub use accessor::{EmbeddingStore, IndexRebuildGuard, Retriever};
pub use store::{INDEX_FILE, MANIFEST_FILE, VectorIndex};
pub use types::{DocumentChunk, IndexError, IndexManifest, RetrievalError, ScoredChunk};
