//! The answer pipeline: retrieve, assemble, summarize.

use super::types::{Answer, AnswerError, PipelineSettings, PipelineStage};
use crate::context::assemble_with_cap;
use crate::index::Retriever;
use crate::metrics::PipelineMetrics;
use crate::summarization::SummarizerService;
use std::sync::Arc;

/// Routes each query through retrieval and summarization.
///
/// The pipeline never touches the conversation log and never retries; callers decide what to
/// record and whether to resubmit.
pub struct AnswerPipeline {
    retriever: Arc<dyn Retriever>,
    summarizer: Arc<SummarizerService>,
    settings: PipelineSettings,
    metrics: Arc<PipelineMetrics>,
}

impl AnswerPipeline {
    /// Compose a pipeline from its collaborators.
    pub fn new(
        retriever: Arc<dyn Retriever>,
        summarizer: Arc<SummarizerService>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            retriever,
            summarizer,
            settings,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Share a metrics registry with other services.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Answer `query` from the indexed documents.
    pub async fn answer(&self, query: &str) -> Result<Answer, AnswerError> {
        match self.run(query).await {
            Ok(answer) => {
                match answer {
                    Answer::Summary(_) => self.metrics.record_answer(),
                    Answer::NoContext => self.metrics.record_no_context(),
                }
                Ok(answer)
            }
            Err(error) => {
                enter(PipelineStage::Failed);
                self.metrics.record_failure();
                match &error {
                    AnswerError::IndexUnavailable(_) => {
                        tracing::warn!(error = %error, "Query rejected; index not built")
                    }
                    _ => tracing::error!(error = %error, "Query failed"),
                }
                Err(error)
            }
        }
    }

    async fn run(&self, query: &str) -> Result<Answer, AnswerError> {
        enter(PipelineStage::Retrieving);
        let chunks = self.retriever.retrieve(query, self.settings.top_k).await?;
        if chunks.is_empty() {
            enter(PipelineStage::NoContext);
            return Ok(Answer::NoContext);
        }

        enter(PipelineStage::Assembling);
        let context = assemble_with_cap(&chunks, self.settings.context_chunk_cap);

        enter(PipelineStage::Summarizing);
        let summary = self
            .summarizer
            .summarize(
                &context,
                self.settings.summary_min_len,
                self.settings.summary_max_len,
            )
            .await?;

        enter(PipelineStage::Done);
        tracing::info!(
            retrieved = chunks.len(),
            context_chars = context.len(),
            "Query answered"
        );
        Ok(Answer::Summary(summary))
    }
}

fn enter(stage: PipelineStage) {
    tracing::debug!(stage = ?stage, "Pipeline stage");
}
