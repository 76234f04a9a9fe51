//! Uploaded PDF library with size and count limits.
//!
//! Every successful upload or delete raises a change flag; an index rebuild takes it.

use crate::config::Config;
use crate::ingestion::is_pdf;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors raised by document library operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Name is empty, contains a path, or does not end in `.pdf`.
    #[error("Invalid document name '{0}'; expected a file name ending in .pdf")]
    InvalidName(String),
    /// Upload carried no bytes.
    #[error("Document '{0}' is empty")]
    Empty(String),
    /// Upload exceeds the per-file limit.
    #[error("Document is {size} bytes; the limit is {limit} bytes")]
    TooLarge {
        /// Size of the rejected upload.
        size: u64,
        /// Configured limit.
        limit: u64,
    },
    /// Library already holds the maximum number of documents.
    #[error("Only {limit} documents can be uploaded; delete one first")]
    LimitReached {
        /// Configured limit.
        limit: usize,
    },
    /// Named document is not in the library.
    #[error("Document '{0}' not found")]
    NotFound(String),
    /// Deleting would leave the library empty.
    #[error("Dataset must contain at least one document")]
    LastDocument,
    /// Filesystem failure.
    #[error("Document storage failed: {0}")]
    Io(#[from] io::Error),
}

/// Directory of uploaded PDFs.
pub struct DocumentLibrary {
    dir: PathBuf,
    max_upload_bytes: u64,
    max_documents: usize,
    changed: AtomicBool,
    writes: Mutex<()>,
}

impl DocumentLibrary {
    /// Create a library rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>, max_upload_bytes: u64, max_documents: usize) -> Self {
        Self {
            dir: dir.into(),
            max_upload_bytes,
            max_documents,
            changed: AtomicBool::new(false),
            writes: Mutex::new(()),
        }
    }

    /// Create a library using the configured directory and limits.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.upload_dir.clone(),
            config.max_upload_bytes,
            config.max_document_count,
        )
    }

    /// Create the library directory if it does not exist.
    pub async fn ensure_dir(&self) -> Result<(), DocumentError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// PDF file names in the library, sorted.
    pub async fn list(&self) -> Result<Vec<String>, DocumentError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            if is_pdf(&path) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Store `bytes` under `name`, replacing any document with the same name.
    pub async fn upload(&self, name: &str, bytes: &[u8]) -> Result<(), DocumentError> {
        validate_name(name)?;
        if bytes.is_empty() {
            return Err(DocumentError::Empty(name.to_string()));
        }
        let size = bytes.len() as u64;
        if size > self.max_upload_bytes {
            return Err(DocumentError::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let _writes = self.writes.lock().await;
        let existing = self.list().await?;
        if !existing.iter().any(|existing| existing == name) && existing.len() >= self.max_documents
        {
            return Err(DocumentError::LimitReached {
                limit: self.max_documents,
            });
        }

        self.ensure_dir().await?;
        let staging = self.dir.join(format!(".{name}.part"));
        tokio::fs::write(&staging, bytes).await?;
        if let Err(error) = tokio::fs::rename(&staging, self.dir.join(name)).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(error.into());
        }

        self.changed.store(true, Ordering::SeqCst);
        tracing::info!(document = name, bytes = size, "Document uploaded");
        Ok(())
    }

    /// Remove `name` from the library. The last remaining document cannot be removed.
    pub async fn delete(&self, name: &str) -> Result<(), DocumentError> {
        validate_name(name)?;
        let _writes = self.writes.lock().await;
        let existing = self.list().await?;
        if !existing.iter().any(|existing| existing == name) {
            return Err(DocumentError::NotFound(name.to_string()));
        }
        if existing.len() <= 1 {
            return Err(DocumentError::LastDocument);
        }

        tokio::fs::remove_file(self.dir.join(name)).await?;
        self.changed.store(true, Ordering::SeqCst);
        tracing::info!(document = name, "Document deleted");
        Ok(())
    }

    /// Whether documents were added or removed since the last rebuild.
    pub fn has_changes(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Clear the change flag ahead of a rebuild, returning its previous value.
    pub fn take_changes(&self) -> bool {
        self.changed.swap(false, Ordering::SeqCst)
    }

    /// Raise the change flag again, e.g. after a rebuild failed.
    pub fn mark_changed(&self) {
        self.changed.store(true, Ordering::SeqCst);
    }
}

fn validate_name(name: &str) -> Result<(), DocumentError> {
    let path = Path::new(name);
    let bare = path.file_name().and_then(|file| file.to_str()) == Some(name);
    if name.trim().is_empty() || !bare || name.starts_with('.') || !is_pdf(path) {
        return Err(DocumentError::InvalidName(name.to_string()));
    }
    Ok(())
}
