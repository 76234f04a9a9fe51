//! Rebuilds the vector index from the document library.

use super::chunking::{Splitter, determine_chunk_size};
use super::pdf::extract_text;
use super::types::{IngestionError, IngestionOutcome};
use crate::config::{Config, EmbeddingProvider};
use crate::index::{DocumentChunk, EmbeddingStore, VectorIndex};
use crate::metrics::PipelineMetrics;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const EMBEDDING_BATCH_SIZE: usize = 32;

/// Settings that shape how documents are split.
#[derive(Debug, Clone)]
pub struct IngestionSettings {
    /// Directory scanned for PDF files.
    pub upload_dir: PathBuf,
    /// Embedding backend; selects the tokenizer and default chunk size.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model name.
    pub embedding_model: String,
    /// Explicit token budget per chunk.
    pub chunk_size: Option<usize>,
    /// Token overlap between adjacent chunks.
    pub chunk_overlap: usize,
}

impl From<&Config> for IngestionSettings {
    fn from(config: &Config) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            embedding_provider: config.embedding_provider,
            embedding_model: config.embedding_model.clone(),
            chunk_size: config.text_splitter_chunk_size,
            chunk_overlap: config.text_splitter_chunk_overlap.unwrap_or(0),
        }
    }
}

/// Extracts, chunks, embeds, and indexes every PDF in the upload directory.
///
/// A rebuild holds the store's write lock from the first file read until the new index has been
/// swapped in, so queries never interleave with a half-finished rebuild.
pub struct IngestionService {
    store: Arc<EmbeddingStore>,
    settings: IngestionSettings,
    metrics: Arc<PipelineMetrics>,
}

struct PendingChunk {
    content: String,
    source: String,
}

impl IngestionService {
    /// Create a service writing into `store`.
    pub fn new(store: Arc<EmbeddingStore>, settings: IngestionSettings) -> Self {
        Self {
            store,
            settings,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Share a metrics registry with other services.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replace the index with one built from the current library contents.
    pub async fn rebuild(&self) -> Result<IngestionOutcome, IngestionError> {
        let guard = self.store.lock_for_rebuild().await;
        let settings = &self.settings;
        tracing::info!(upload_dir = %settings.upload_dir.display(), "Rebuilding index");

        let chunk_size = determine_chunk_size(
            settings.chunk_size,
            settings.embedding_provider,
            &settings.embedding_model,
        );
        let splitter = Splitter::for_model(
            chunk_size,
            settings.chunk_overlap,
            settings.embedding_provider,
            &settings.embedding_model,
        )?;
        tracing::debug!(
            chunk_size,
            chunk_size_override = ?settings.chunk_size,
            overlap = settings.chunk_overlap,
            provider = ?settings.embedding_provider,
            model = %settings.embedding_model,
            "Derived chunk size"
        );

        let mut pending = Vec::new();
        let mut skipped_documents = Vec::new();
        let mut documents = 0usize;
        for path in list_pdfs(&settings.upload_dir)? {
            let name = file_name(&path);
            let text = match read_pdf(&path).await {
                Ok(text) => text,
                Err(error) => {
                    tracing::warn!(document = %name, error = %error, "Skipping unreadable PDF");
                    skipped_documents.push(name);
                    continue;
                }
            };
            let chunks = splitter.split(&text);
            if chunks.is_empty() {
                tracing::warn!(document = %name, "PDF contains no extractable text");
                continue;
            }
            tracing::debug!(document = %name, chunks = chunks.len(), "Document chunked");
            documents += 1;
            pending.extend(chunks.into_iter().map(|content| PendingChunk {
                content,
                source: name.clone(),
            }));
        }

        let (pending, skipped_duplicates) = dedupe_chunks(pending);
        if pending.is_empty() {
            return Err(IngestionError::NoContent {
                skipped: skipped_documents.len(),
            });
        }

        let chunks = self.embed(pending).await?;
        let client = self.store.embedding_client();
        let index = VectorIndex::build(client.model(), client.dimension(), documents, chunks)?;
        let index = guard.install(index).await?;

        self.metrics
            .record_ingestion(documents as u64, index.len() as u64);
        tracing::info!(
            documents,
            skipped = skipped_documents.len(),
            chunks = index.len(),
            chunk_size,
            skipped_duplicates,
            "Index rebuilt"
        );

        Ok(IngestionOutcome {
            documents,
            skipped_documents,
            chunk_count: index.len(),
            chunk_size: splitter.chunk_size(),
            skipped_duplicates,
        })
    }

    async fn embed(&self, pending: Vec<PendingChunk>) -> Result<Vec<DocumentChunk>, IngestionError> {
        let client = self.store.embedding_client();
        let mut chunks = Vec::with_capacity(pending.len());
        for batch in pending.chunks(EMBEDDING_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
            let vectors = client.generate_embeddings(texts).await?;
            if vectors.len() != batch.len() {
                return Err(IngestionError::EmbeddingCountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }
            chunks.extend(batch.iter().zip(vectors).map(|(chunk, vector)| {
                DocumentChunk::new(chunk.content.clone(), vector).with_source(chunk.source.clone())
            }));
        }
        Ok(chunks)
    }
}

/// PDF files directly inside `dir`, sorted by name.
fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, IngestionError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| IngestionError::UploadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_pdf(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

pub(crate) fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_pdf(path: &Path) -> Result<String, IngestionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| IngestionError::ReadDocument {
            path: path.to_path_buf(),
            source,
        })?;
    extract_text(&bytes).map_err(|source| IngestionError::Pdf {
        path: path.to_path_buf(),
        source,
    })
}

/// Drop blank chunks and repeated content, keeping the first occurrence.
fn dedupe_chunks(chunks: Vec<PendingChunk>) -> (Vec<PendingChunk>, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(chunks.len());
    let mut skipped = 0;
    for chunk in chunks {
        if chunk.content.trim().is_empty() {
            continue;
        }
        if seen.insert(content_hash(&chunk.content)) {
            kept.push(chunk);
        } else {
            skipped += 1;
        }
    }
    (kept, skipped)
}

fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.trim().as_bytes()))
}
