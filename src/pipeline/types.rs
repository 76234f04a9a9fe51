//! Answer values, pipeline settings, and the failure taxonomy.

use crate::config::Config;
use crate::index::RetrievalError;
use crate::summarization::{SummarizationClientError, SummarizeError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Prefix placed in front of every generated summary.
pub const ANSWER_PREFIX: &str = "Answer: ";
/// Fixed reply when retrieval finds nothing relevant.
pub const NO_CONTEXT_MESSAGE: &str =
    "No relevant sections found to answer or summarize your query.";

/// Outcome of a successfully processed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Summary of the retrieved context.
    Summary(String),
    /// Retrieval returned no chunks; the summarizer was not invoked.
    NoContext,
}

impl Answer {
    /// Plain-text form shown to users and stored in the conversation log.
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary(summary) => write!(f, "{ANSWER_PREFIX}{summary}"),
            Self::NoContext => f.write_str(NO_CONTEXT_MESSAGE),
        }
    }
}

/// Stage a query is in; logged as the pipeline advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Looking up similar chunks.
    Retrieving,
    /// Joining the retrieved chunks.
    Assembling,
    /// Waiting on the summarizer.
    Summarizing,
    /// Summary produced.
    Done,
    /// Nothing relevant was retrieved.
    NoContext,
    /// A sub-step failed.
    Failed,
}

/// Failures surfaced by [`crate::pipeline::AnswerPipeline::answer`].
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Documents were never processed; a setup problem rather than a query problem.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(#[source] RetrievalError),
    /// Vector search or query embedding failed.
    #[error("Retrieval failed: {0}")]
    RetrievalFailure(#[source] RetrievalError),
    /// The summarizer raised an error.
    #[error("Summarization failed: {0}")]
    SummarizationFailure(#[source] SummarizationClientError),
    /// The summarizer exceeded its time budget.
    #[error("Summarization timed out after {0:?}")]
    SummarizationTimeout(Duration),
}

impl AnswerError {
    /// Single-line message safe to show to end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::IndexUnavailable(_) => {
                "Documents have not been processed yet. Please process documents first."
            }
            Self::RetrievalFailure(_) => {
                "An error occurred while searching your documents. Please try again."
            }
            Self::SummarizationFailure(_) => {
                "An error occurred while answering your question. Please try again."
            }
            Self::SummarizationTimeout(_) => {
                "Answering your question timed out. Please try again."
            }
        }
    }
}

impl From<RetrievalError> for AnswerError {
    fn from(error: RetrievalError) -> Self {
        match error {
            unavailable @ RetrievalError::IndexUnavailable(_) => {
                Self::IndexUnavailable(unavailable)
            }
            other => Self::RetrievalFailure(other),
        }
    }
}

impl From<SummarizeError> for AnswerError {
    fn from(error: SummarizeError) -> Self {
        match error {
            SummarizeError::Failure(inner) => Self::SummarizationFailure(inner),
            SummarizeError::Timeout(budget) => Self::SummarizationTimeout(budget),
        }
    }
}

/// Tunables consumed by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Chunks requested from retrieval.
    pub top_k: usize,
    /// Chunks kept when assembling context.
    pub context_chunk_cap: usize,
    /// Summary lower bound in words.
    pub summary_min_len: usize,
    /// Summary upper bound in words.
    pub summary_max_len: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            top_k: config.retrieval_top_k,
            context_chunk_cap: config.context_chunk_cap,
            summary_min_len: config.summary_min_len,
            summary_max_len: config.summary_max_len,
        }
    }
}
