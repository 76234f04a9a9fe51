//! Token-budgeted semantic splitting of extracted document text.
//!
//! Chunk boundaries come from `semchunk-rs`, measured with a `tiktoken-rs` encoding. When no
//! encoding can be loaded the splitter counts whitespace-separated words instead. An optional
//! overlap prepends the tail of the previous chunk to each chunk, trimmed so the result still
//! fits the token budget.

use super::types::ChunkingError;
use crate::config::EmbeddingProvider;
use semchunk_rs::Chunker;
use std::sync::Arc;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, r50k_base};

pub(crate) type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

const MIN_AUTOMATIC_CHUNK_SIZE: usize = 256;
const MAX_AUTOMATIC_CHUNK_SIZE: usize = 1024;
// Matches the sentence-transformer window the local encoder stands in for.
const LOCAL_CONTEXT_WINDOW: usize = 512;

/// Pick the per-chunk token budget: an explicit override wins, otherwise a quarter of the
/// embedding model's context window clamped into `[256, 1024]`.
pub(crate) fn determine_chunk_size(
    override_size: Option<usize>,
    provider: EmbeddingProvider,
    model: &str,
) -> usize {
    if let Some(explicit) = override_size {
        return explicit.max(1);
    }
    (embedding_context_window(provider, model) / 4)
        .clamp(MIN_AUTOMATIC_CHUNK_SIZE, MAX_AUTOMATIC_CHUNK_SIZE)
}

/// Context window, in tokens, of the configured embedding model.
pub(crate) fn embedding_context_window(provider: EmbeddingProvider, model: &str) -> usize {
    match provider {
        EmbeddingProvider::Local => LOCAL_CONTEXT_WINDOW,
        EmbeddingProvider::Ollama => {
            let normalized = model.to_lowercase();
            match normalized.as_str() {
                "nomic-embed-text" | "mxbai-embed-large" | "mxbai-embed-large-v1" => 8192,
                value if value.contains("all-minilm") => 512,
                value if value.contains("e5-large") => 4096,
                _ => {
                    tracing::trace!(model, "Using default Ollama context window estimate");
                    4096
                }
            }
        }
    }
}

/// Splits text into chunks no larger than `chunk_size` tokens.
pub(crate) struct Splitter {
    chunk_size: usize,
    overlap: usize,
    counter: TokenCounter,
}

impl Splitter {
    /// Build a splitter whose token counter matches the embedding model.
    pub(crate) fn for_model(
        chunk_size: usize,
        overlap: usize,
        provider: EmbeddingProvider,
        model: &str,
    ) -> Result<Self, ChunkingError> {
        Self::with_counter(chunk_size, overlap, token_counter(provider, model))
    }

    pub(crate) fn with_counter(
        chunk_size: usize,
        overlap: usize,
        counter: TokenCounter,
    ) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self {
            chunk_size,
            // A full-size overlap would leave no room for new content.
            overlap: overlap.min(chunk_size - 1),
            counter,
        })
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split `text`; blank input yields no chunks.
    pub(crate) fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let counter = Arc::clone(&self.counter);
        let chunker = Chunker::new(
            self.chunk_size,
            Box::new(move |segment: &str| counter.as_ref()(segment)),
        );
        let chunks = chunker.chunk(text);
        if self.overlap == 0 || chunks.len() < 2 {
            return chunks;
        }

        let mut overlapped = Vec::with_capacity(chunks.len());
        let mut previous: Option<&str> = None;
        for current in &chunks {
            match previous {
                None => overlapped.push(current.clone()),
                Some(prior) => overlapped.push(self.join_with_tail(prior, current)),
            }
            previous = Some(current);
        }
        overlapped
    }

    fn join_with_tail(&self, previous: &str, current: &str) -> String {
        let tail = self.fitting_suffix(previous, self.overlap);
        if tail.is_empty() {
            return current.to_string();
        }
        let separator = if tail.ends_with(char::is_whitespace)
            || current.starts_with(char::is_whitespace)
        {
            ""
        } else {
            " "
        };
        let combined = format!("{tail}{separator}{current}");
        self.fitting_suffix(&combined, self.chunk_size).to_string()
    }

    /// Longest suffix of `text` (leading whitespace trimmed) that fits in `budget` tokens.
    fn fitting_suffix<'a>(&self, text: &'a str, budget: usize) -> &'a str {
        text.char_indices()
            .map(|(offset, _)| text[offset..].trim_start())
            .find(|candidate| self.count(candidate) <= budget)
            .unwrap_or("")
    }

    fn count(&self, text: &str) -> usize {
        self.counter.as_ref()(text)
    }
}

/// Token counter for the embedding model, falling back to whitespace counting.
pub(crate) fn token_counter(provider: EmbeddingProvider, model: &str) -> TokenCounter {
    let encoding = match provider {
        EmbeddingProvider::Local => cl100k_base().map_err(|error| error.to_string()),
        EmbeddingProvider::Ollama => resolve_encoding(model),
    };
    match encoding {
        Ok(encoding) => {
            let encoding = Arc::new(encoding);
            Arc::new(move |segment: &str| encoding.encode_ordinary(segment).len())
        }
        Err(error) => {
            tracing::warn!(
                model,
                error = %error,
                "Tokenizer unavailable; falling back to whitespace counter"
            );
            whitespace_counter()
        }
    }
}

fn resolve_encoding(model: &str) -> Result<CoreBPE, String> {
    if let Ok(encoding) = get_bpe_from_model(model.trim()) {
        return Ok(encoding);
    }
    let named = match model.trim() {
        "o200k_base" => o200k_base(),
        "p50k_base" => p50k_base(),
        "r50k_base" | "gpt2" => r50k_base(),
        _ => {
            tracing::debug!(model, "No tokenizer registered for model; using 'cl100k_base'");
            cl100k_base()
        }
    };
    named.map_err(|error| error.to_string())
}

pub(crate) fn whitespace_counter() -> TokenCounter {
    Arc::new(|segment: &str| match segment.split_whitespace().count() {
        0 if !segment.is_empty() => 1,
        words => words,
    })
}
