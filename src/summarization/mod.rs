//! Abstractions for summarizing retrieved context.
//!
//! A [`SummarizationClient`] does the actual work: the deterministic [`ExtractiveSummarizer`]
//! by default, or an Ollama model when configured. [`SummarizerService`] wraps the client with
//! lazy one-time construction, input validation, and a wall-clock timeout. Summary bounds are
//! counted in words.

mod extractive;
mod ollama;

pub use extractive::ExtractiveSummarizer;
pub use ollama::OllamaSummarizationClient;

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Errors surfaced by summarization providers.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Input text or length bounds were rejected before reaching the provider.
    #[error("Invalid summarization input: {0}")]
    InvalidInput(String),
}

/// Errors returned by [`SummarizerService::summarize`].
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Provider failed or rejected the input.
    #[error(transparent)]
    Failure(#[from] SummarizationClientError),
    /// Provider did not answer within the configured budget.
    #[error("Summarization timed out after {0:?}")]
    Timeout(Duration),
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Text to condense.
    pub text: String,
    /// Minimum summary length in words, when the input is long enough.
    pub min_words: usize,
    /// Maximum summary length in words.
    pub max_words: usize,
}

/// Interface implemented by summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a summary of `request.text` within the requested bounds.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;

    /// Short provider name used in logs.
    fn name(&self) -> &'static str;
}

type ClientFactory =
    Box<dyn Fn() -> Result<Arc<dyn SummarizationClient>, SummarizationClientError> + Send + Sync>;

/// Process-wide summarizer: the provider is built on first use and reused afterwards.
pub struct SummarizerService {
    client: OnceCell<Arc<dyn SummarizationClient>>,
    factory: ClientFactory,
    timeout: Duration,
}

impl SummarizerService {
    /// Build a service whose provider is selected by configuration on first use.
    pub fn from_config(config: &Config) -> Self {
        let provider = config.summarization_provider;
        let base_url = config.ollama_url.clone();
        let model = config.summarization_model.clone();
        let factory: ClientFactory = Box::new(move || {
            tracing::info!(provider = ?provider, "Initializing summarization provider");
            let client: Arc<dyn SummarizationClient> = match provider {
                SummarizationProvider::Extractive => Arc::new(ExtractiveSummarizer::new()),
                SummarizationProvider::Ollama => {
                    Arc::new(OllamaSummarizationClient::new(base_url.clone(), model.clone())?)
                }
            };
            Ok(client)
        });
        Self {
            client: OnceCell::new(),
            factory,
            timeout: config.summarization_timeout,
        }
    }

    /// Wrap an already constructed provider.
    pub fn with_client(client: Arc<dyn SummarizationClient>, timeout: Duration) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
            factory: Box::new(|| {
                Err(SummarizationClientError::ProviderUnavailable(
                    "provider was supplied at construction".into(),
                ))
            }),
            timeout,
        }
    }

    /// Whether the provider has been constructed yet.
    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    /// Summarize `text` to between `min_len` and `max_len` words.
    pub async fn summarize(
        &self,
        text: &str,
        min_len: usize,
        max_len: usize,
    ) -> Result<String, SummarizeError> {
        if max_len == 0 || min_len > max_len {
            return Err(SummarizationClientError::InvalidInput(format!(
                "invalid length bounds (min {min_len}, max {max_len})"
            ))
            .into());
        }
        if text.trim().is_empty() {
            return Err(SummarizationClientError::InvalidInput("text is empty".into()).into());
        }

        let client = self
            .client
            .get_or_try_init(|| async { (self.factory)() })
            .await?;

        let request = SummarizationRequest {
            text: text.to_string(),
            min_words: min_len,
            max_words: max_len,
        };
        let started = std::time::Instant::now();
        let summary = tokio::time::timeout(self.timeout, client.generate_summary(request))
            .await
            .map_err(|_| SummarizeError::Timeout(self.timeout))??;

        tracing::debug!(
            provider = client.name(),
            input_words = count_words(text),
            summary_words = count_words(&summary),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Summary generated"
        );
        Ok(summary)
    }
}

pub(crate) fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Keep at most `max_words` whitespace-separated words, normalizing spacing.
pub(crate) fn clip_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowClient;

    #[async_trait]
    impl SummarizationClient for SlowClient {
        async fn generate_summary(
            &self,
            _request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn summarize_times_out() {
        let service = SummarizerService::with_client(Arc::new(SlowClient), Duration::from_millis(20));
        let error = service
            .summarize("Some text to summarize.", 1, 10)
            .await
            .unwrap_err();
        assert!(matches!(error, SummarizeError::Timeout(_)));
    }

    #[tokio::test]
    async fn summarize_rejects_invalid_bounds_and_empty_text() {
        let service = SummarizerService::with_client(
            Arc::new(ExtractiveSummarizer::new()),
            Duration::from_secs(1),
        );
        assert!(matches!(
            service.summarize("text", 10, 5).await,
            Err(SummarizeError::Failure(SummarizationClientError::InvalidInput(_)))
        ));
        assert!(matches!(
            service.summarize("   ", 1, 5).await,
            Err(SummarizeError::Failure(SummarizationClientError::InvalidInput(_)))
        ));
    }

    #[tokio::test]
    async fn provider_is_built_once_and_reused() {
        static BUILDS: AtomicUsize = AtomicUsize::new(0);
        let service = SummarizerService {
            client: OnceCell::new(),
            factory: Box::new(|| {
                BUILDS.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(ExtractiveSummarizer::new()) as Arc<dyn SummarizationClient>)
            }),
            timeout: Duration::from_secs(1),
        };
        assert!(!service.is_initialized());
        for _ in 0..3 {
            service
                .summarize("Plants use chlorophyll.", 1, 10)
                .await
                .expect("summary");
        }
        assert!(service.is_initialized());
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn extractive_summaries_are_deterministic() {
        let service = SummarizerService::from_config(&Config::default());
        let text = "Photosynthesis converts light to energy. Plants use chlorophyll. \
                    Chlorophyll absorbs mostly red and blue light.";
        let first = service.summarize(text, 3, 12).await.expect("summary");
        let second = service.summarize(text, 3, 12).await.expect("summary");
        assert_eq!(first, second);
        assert!(count_words(&first) <= 12);
    }

    #[test]
    fn clip_words_limits_and_normalizes() {
        assert_eq!(clip_words("a  b\nc d", 3), "a b c");
        assert_eq!(clip_words("short", 10), "short");
    }
}
