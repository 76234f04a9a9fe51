//! Assistant service composing the answer pipeline, ingestion, and the document library.

use crate::config::Config;
use crate::documents::{DocumentError, DocumentLibrary};
use crate::embedding::{EmbeddingClientError, build_embedding_client};
use crate::index::EmbeddingStore;
use crate::ingestion::{IngestionError, IngestionOutcome, IngestionService, IngestionSettings};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::pipeline::{Answer, AnswerError, AnswerPipeline, PipelineSettings};
use crate::summarization::SummarizerService;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Result of a processing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// The index was rebuilt.
    Processed(IngestionOutcome),
    /// Documents are unchanged since the last rebuild and an index exists.
    Skipped,
}

/// Operations exposed to the HTTP surface.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Answer a question from the indexed documents.
    async fn answer(&self, query: &str) -> Result<Answer, AnswerError>;

    /// Names of the uploaded documents.
    async fn list_documents(&self) -> Result<Vec<String>, DocumentError>;

    /// Add or replace a document.
    async fn upload_document(&self, name: &str, bytes: Vec<u8>) -> Result<(), DocumentError>;

    /// Remove a document.
    async fn delete_document(&self, name: &str) -> Result<(), DocumentError>;

    /// Rebuild the index when documents changed or no index exists yet.
    async fn process_documents(&self) -> Result<ProcessOutcome, IngestionError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Production [`AssistantApi`] implementation.
///
/// Construct once near process start and share through an `Arc`.
pub struct AssistantService {
    store: Arc<EmbeddingStore>,
    pipeline: AnswerPipeline,
    ingestion: IngestionService,
    documents: DocumentLibrary,
    metrics: Arc<PipelineMetrics>,
}

impl AssistantService {
    /// Wire the service from its collaborators.
    pub fn new(
        store: Arc<EmbeddingStore>,
        summarizer: Arc<SummarizerService>,
        documents: DocumentLibrary,
        pipeline_settings: PipelineSettings,
        ingestion_settings: IngestionSettings,
    ) -> Self {
        let metrics = Arc::new(PipelineMetrics::new());
        let pipeline = AnswerPipeline::new(store.clone(), summarizer, pipeline_settings)
            .with_metrics(Arc::clone(&metrics));
        let ingestion = IngestionService::new(Arc::clone(&store), ingestion_settings)
            .with_metrics(Arc::clone(&metrics));
        Self {
            store,
            pipeline,
            ingestion,
            documents,
            metrics,
        }
    }

    /// Build every collaborator from configuration.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingClientError> {
        tracing::info!(provider = ?config.embedding_provider, "Initializing embedding client");
        let embedding_client = build_embedding_client(config)?;
        let store = Arc::new(EmbeddingStore::new(
            embedding_client,
            config.index_dir.clone(),
            config.retrieval_score_threshold,
        ));
        Ok(Self::new(
            store,
            Arc::new(SummarizerService::from_config(config)),
            DocumentLibrary::from_config(config),
            PipelineSettings::from(config),
            IngestionSettings::from(config),
        ))
    }

    /// Create the upload directory so the library starts in a usable state.
    pub async fn prepare(&self) -> Result<(), DocumentError> {
        self.documents.ensure_dir().await?;
        if !self.store.is_ready().await {
            tracing::warn!(
                index_dir = %self.store.index_dir().display(),
                "No index found; process documents before asking questions"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl AssistantApi for AssistantService {
    async fn answer(&self, query: &str) -> Result<Answer, AnswerError> {
        self.pipeline.answer(query).await
    }

    async fn list_documents(&self) -> Result<Vec<String>, DocumentError> {
        self.documents.list().await
    }

    async fn upload_document(&self, name: &str, bytes: Vec<u8>) -> Result<(), DocumentError> {
        self.documents.upload(name, &bytes).await
    }

    async fn delete_document(&self, name: &str) -> Result<(), DocumentError> {
        self.documents.delete(name).await
    }

    async fn process_documents(&self) -> Result<ProcessOutcome, IngestionError> {
        let changed = self.documents.take_changes();
        if !changed && self.store.is_ready().await {
            tracing::info!("No document changes detected; skipping reprocessing");
            return Ok(ProcessOutcome::Skipped);
        }

        match self.ingestion.rebuild().await {
            Ok(outcome) => Ok(ProcessOutcome::Processed(outcome)),
            Err(error) => {
                if changed {
                    self.documents.mark_changed();
                }
                tracing::error!(error = %error, "Document processing failed");
                Err(error)
            }
        }
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingProvider;
    use crate::embedding::LocalEmbeddingClient;
    use crate::ingestion::sample_pdf;
    use crate::summarization::ExtractiveSummarizer;
    use std::path::Path;
    use std::time::Duration;

    fn service(root: &Path) -> AssistantService {
        let store = Arc::new(EmbeddingStore::new(
            Arc::new(LocalEmbeddingClient::new("all-minilm", 128)),
            root.join("vectorstore"),
            0.0,
        ));
        let summarizer = Arc::new(SummarizerService::with_client(
            Arc::new(ExtractiveSummarizer::new()),
            Duration::from_secs(5),
        ));
        AssistantService::new(
            store,
            summarizer,
            DocumentLibrary::new(root.join("dataset"), 1024 * 1024, 3),
            PipelineSettings::default(),
            IngestionSettings {
                upload_dir: root.join("dataset"),
                embedding_provider: EmbeddingProvider::Local,
                embedding_model: "all-minilm".into(),
                chunk_size: None,
                chunk_overlap: 0,
            },
        )
    }

    #[tokio::test]
    async fn answers_only_after_processing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let service = service(temp.path());
        service.prepare().await.expect("prepare");

        service
            .upload_document(
                "plants.pdf",
                sample_pdf(&["Photosynthesis converts light to energy. Plants use chlorophyll."]),
            )
            .await
            .expect("upload");

        let error = service.answer("How do plants make energy?").await.unwrap_err();
        assert!(matches!(error, AnswerError::IndexUnavailable(_)));

        let outcome = service.process_documents().await.expect("process");
        assert!(matches!(outcome, ProcessOutcome::Processed(ref o) if o.documents == 1));

        let answer = service
            .answer("How do plants make energy?")
            .await
            .expect("answer");
        assert!(answer.text().starts_with("Answer: "));
        assert!(answer.text().contains("Photosynthesis"));

        let snapshot = service.metrics_snapshot();
        assert_eq!((snapshot.answers, snapshot.failures), (1, 1));
        assert_eq!(snapshot.ingestion_runs, 1);
    }

    #[tokio::test]
    async fn unchanged_documents_skip_reprocessing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let service = service(temp.path());
        service
            .upload_document("a.pdf", sample_pdf(&["Alpha beta gamma."]))
            .await
            .expect("upload");

        assert!(matches!(
            service.process_documents().await.expect("first"),
            ProcessOutcome::Processed(_)
        ));
        assert_eq!(
            service.process_documents().await.expect("second"),
            ProcessOutcome::Skipped
        );

        service
            .upload_document("b.pdf", sample_pdf(&["Delta epsilon."]))
            .await
            .expect("upload");
        assert!(matches!(
            service.process_documents().await.expect("third"),
            ProcessOutcome::Processed(ref o) if o.documents == 2
        ));
    }

    #[tokio::test]
    async fn failed_processing_keeps_change_flag() {
        let temp = tempfile::tempdir().expect("tempdir");
        let service = service(temp.path());
        service
            .upload_document("broken.pdf", b"not a pdf".to_vec())
            .await
            .expect("upload");

        let error = service.process_documents().await.unwrap_err();
        assert!(matches!(error, IngestionError::NoContent { .. }));
        assert!(service.documents.has_changes());
    }

    #[test]
    fn skipped_outcome_serializes_with_status() {
        assert_eq!(
            serde_json::to_value(ProcessOutcome::Skipped).expect("json"),
            serde_json::json!({ "status": "skipped" })
        );
    }
}
