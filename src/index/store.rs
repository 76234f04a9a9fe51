//! Persisted flat vector index.
//!
//! The artifact is a directory holding `manifest.json` and `index.json`. Search is an exact
//! cosine scan over every stored chunk. Persisting writes a staging directory first and then
//! renames it over the live one, so the index is always replaced wholesale.

use super::types::{DocumentChunk, IndexError, IndexManifest, ScoredChunk};
use std::io;
use std::path::{Path, PathBuf};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// File holding the serialized chunks; its presence means ingestion has run.
pub const INDEX_FILE: &str = "index.json";
/// File holding the [`IndexManifest`].
pub const MANIFEST_FILE: &str = "manifest.json";
/// Current on-disk layout version.
pub const FORMAT_VERSION: u32 = 1;

/// In-memory form of the persisted index.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    manifest: IndexManifest,
    chunks: Vec<DocumentChunk>,
}

impl VectorIndex {
    /// Assemble an index from freshly embedded chunks, checking every vector's dimension.
    pub fn build(
        embedding_model: impl Into<String>,
        dimension: usize,
        document_count: usize,
        chunks: Vec<DocumentChunk>,
    ) -> Result<Self, IndexError> {
        validate_dimensions(dimension, &chunks)?;
        let built_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("unknown"));
        Ok(Self {
            manifest: IndexManifest {
                format_version: FORMAT_VERSION,
                embedding_model: embedding_model.into(),
                dimension,
                chunk_count: chunks.len(),
                document_count,
                built_at,
            },
            chunks,
        })
    }

    /// Whether a persisted artifact is present under `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    /// Load the artifact stored under `dir`.
    pub async fn load(dir: &Path) -> Result<Self, IndexError> {
        let index_path = dir.join(INDEX_FILE);
        let raw_chunks = match tokio::fs::read(&index_path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(IndexError::Unavailable {
                    path: dir.to_path_buf(),
                });
            }
            Err(error) => return Err(IndexError::Io(error)),
        };
        let raw_manifest = tokio::fs::read(dir.join(MANIFEST_FILE)).await?;

        let manifest: IndexManifest = serde_json::from_slice(&raw_manifest)?;
        let chunks: Vec<DocumentChunk> = serde_json::from_slice(&raw_chunks)?;
        validate_dimensions(manifest.dimension, &chunks)?;

        tracing::debug!(
            path = %dir.display(),
            chunks = chunks.len(),
            dimension = manifest.dimension,
            model = %manifest.embedding_model,
            "Loaded index artifact"
        );
        Ok(Self { manifest, chunks })
    }

    /// Write the artifact to `dir`, replacing any previous index in one rename.
    pub async fn persist(&self, dir: &Path) -> Result<(), IndexError> {
        let (parent, name) = split_dir(dir)?;
        tokio::fs::create_dir_all(&parent).await?;

        let token = Uuid::new_v4().simple().to_string();
        let staging = parent.join(format!("{name}.staging-{token}"));
        tokio::fs::create_dir_all(&staging).await?;

        let write_result = async {
            tokio::fs::write(
                staging.join(MANIFEST_FILE),
                serde_json::to_vec_pretty(&self.manifest)?,
            )
            .await?;
            tokio::fs::write(staging.join(INDEX_FILE), serde_json::to_vec(&self.chunks)?).await?;
            Ok::<(), IndexError>(())
        }
        .await;
        if let Err(error) = write_result {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(error);
        }

        let retired = parent.join(format!("{name}.old-{token}"));
        let had_previous = tokio::fs::try_exists(dir).await?;
        if had_previous {
            tokio::fs::rename(dir, &retired).await?;
        }
        if let Err(error) = tokio::fs::rename(&staging, dir).await {
            if had_previous {
                let _ = tokio::fs::rename(&retired, dir).await;
            }
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(IndexError::Io(error));
        }
        if had_previous {
            if let Err(error) = tokio::fs::remove_dir_all(&retired).await {
                tracing::warn!(path = %retired.display(), error = %error, "Failed to remove retired index");
            }
        }

        tracing::info!(
            path = %dir.display(),
            chunks = self.chunks.len(),
            documents = self.manifest.document_count,
            "Persisted index artifact"
        );
        Ok(())
    }

    /// Exact nearest-neighbour search by cosine similarity.
    ///
    /// Returns at most `k` chunks scoring at least `threshold`, best first. Equal scores keep
    /// their index order.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        if query.len() != self.manifest.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.manifest.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(&chunk.embedding, query),
                chunk: chunk.clone(),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Manifest describing this index.
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Stored chunks in insertion order.
    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn validate_dimensions(dimension: usize, chunks: &[DocumentChunk]) -> Result<(), IndexError> {
    match chunks
        .iter()
        .find(|chunk| chunk.embedding.len() != dimension)
    {
        Some(chunk) => Err(IndexError::DimensionMismatch {
            expected: dimension,
            actual: chunk.embedding.len(),
        }),
        None => Ok(()),
    }
}

fn split_dir(dir: &Path) -> Result<(PathBuf, String), IndexError> {
    let name = dir
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IndexError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("index path {} has no directory name", dir.display()),
            ))
        })?
        .to_string();
    let parent = match dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((parent, name))
}

/// Cosine similarity; `0.0` when either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
