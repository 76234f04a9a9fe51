//! Embedding store accessor: read-only top-K retrieval over the persisted index.
//!
//! The loaded index lives in a `RwLock` slot. Queries take the read side just long enough to
//! clone an `Arc` snapshot, so an in-flight query always sees a complete index. Reprocessing
//! takes the write side for the whole rebuild through [`EmbeddingStore::lock_for_rebuild`],
//! which makes new queries wait until the replacement index has been swapped in.

use super::store::VectorIndex;
use super::types::{DocumentChunk, IndexError, RetrievalError, ScoredChunk};
use crate::embedding::EmbeddingClient;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// Source of similarity-ranked chunks for the answer pipeline.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `k` chunks most similar to `query`, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, RetrievalError>;
}

/// Owns the embedding client and the swappable index slot.
pub struct EmbeddingStore {
    embedding_client: Arc<dyn EmbeddingClient>,
    index_dir: PathBuf,
    score_threshold: f32,
    slot: RwLock<Option<Arc<VectorIndex>>>,
}

impl EmbeddingStore {
    /// Create an accessor over the artifact in `index_dir`. Nothing is loaded until first use.
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        index_dir: impl Into<PathBuf>,
        score_threshold: f32,
    ) -> Self {
        Self {
            embedding_client,
            index_dir: index_dir.into(),
            score_threshold,
            slot: RwLock::new(None),
        }
    }

    /// Embedding client shared with ingestion.
    pub fn embedding_client(&self) -> &Arc<dyn EmbeddingClient> {
        &self.embedding_client
    }

    /// Directory holding the persisted artifact.
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Whether an index is loaded or available on disk.
    pub async fn is_ready(&self) -> bool {
        self.slot.read().await.is_some() || VectorIndex::exists(&self.index_dir)
    }

    /// Like [`Retriever::retrieve`] but keeps similarity scores.
    pub async fn retrieve_scored(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrievalError::InvalidQuery("query must not be empty".into()));
        }
        if k == 0 {
            return Err(RetrievalError::InvalidQuery("k must be greater than zero".into()));
        }

        let index = self.current_index().await?;
        if index.is_empty() {
            tracing::debug!("Index holds no chunks; skipping query embedding");
            return Ok(Vec::new());
        }

        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![query.to_string()])
            .await?;
        let vector = vectors.pop().ok_or(RetrievalError::EmptyEmbedding)?;

        let hits = index.search(&vector, k, self.score_threshold)?;
        tracing::debug!(
            k,
            hits = hits.len(),
            top_score = hits.first().map(|hit| hit.score),
            threshold = self.score_threshold,
            "Retrieved chunks"
        );
        Ok(hits)
    }

    /// Acquire exclusive access to the index slot for a rebuild.
    pub async fn lock_for_rebuild(&self) -> IndexRebuildGuard<'_> {
        tracing::debug!("Waiting for exclusive index access");
        IndexRebuildGuard {
            slot: self.slot.write().await,
            index_dir: &self.index_dir,
        }
    }

    async fn current_index(&self) -> Result<Arc<VectorIndex>, IndexError> {
        if let Some(index) = self.slot.read().await.as_ref() {
            return Ok(Arc::clone(index));
        }

        let mut slot = self.slot.write().await;
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }
        if !VectorIndex::exists(&self.index_dir) {
            return Err(IndexError::Unavailable {
                path: self.index_dir.clone(),
            });
        }
        let index = Arc::new(VectorIndex::load(&self.index_dir).await?);
        tracing::info!(
            path = %self.index_dir.display(),
            chunks = index.len(),
            "Index loaded"
        );
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }
}

#[async_trait]
impl Retriever for EmbeddingStore {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, RetrievalError> {
        Ok(self
            .retrieve_scored(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.chunk)
            .collect())
    }
}

/// Exclusive handle on the index slot held for the duration of a rebuild.
pub struct IndexRebuildGuard<'a> {
    slot: RwLockWriteGuard<'a, Option<Arc<VectorIndex>>>,
    index_dir: &'a Path,
}

impl IndexRebuildGuard<'_> {
    /// Persist `index` and make it the one served to queries.
    ///
    /// On failure the previously loaded index stays in place.
    pub async fn install(mut self, index: VectorIndex) -> Result<Arc<VectorIndex>, IndexError> {
        index.persist(self.index_dir).await?;
        let index = Arc::new(index);
        *self.slot = Some(Arc::clone(&index));
        tracing::info!(chunks = index.len(), "Index swapped in");
        Ok(index)
    }

    /// Index currently served, if one has been loaded.
    pub fn current(&self) -> Option<&Arc<VectorIndex>> {
        self.slot.as_ref()
    }
}
