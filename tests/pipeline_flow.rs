mod common;

use async_trait::async_trait;
use httpmock::{Method::POST, MockServer};
use pdfgenius::embedding::LocalEmbeddingClient;
use pdfgenius::index::{EmbeddingStore, Retriever, VectorIndex};
use pdfgenius::ingestion::IngestionService;
use pdfgenius::pipeline::{Answer, AnswerError, AnswerPipeline, PipelineSettings};
use pdfgenius::summarization::{
    ExtractiveSummarizer, OllamaSummarizationClient, SummarizationClient,
    SummarizationClientError, SummarizationRequest,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct CountingSummarizer {
    calls: AtomicUsize,
}

#[async_trait]
impl SummarizationClient for CountingSummarizer {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(request.text)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

async fn indexed_library(root: &Path, documents: &[(&str, &str)]) -> Arc<EmbeddingStore> {
    let uploads = root.join("dataset");
    std::fs::create_dir_all(&uploads).expect("uploads");
    for (name, text) in documents {
        std::fs::write(uploads.join(name), common::pdf(&[text])).expect("write pdf");
    }
    let store = common::store(&root.join("vectorstore"));
    IngestionService::new(Arc::clone(&store), common::ingestion_settings(&uploads))
        .rebuild()
        .await
        .expect("rebuild");
    store
}

#[tokio::test]
async fn photosynthesis_question_is_answered_from_documents() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = indexed_library(
        temp.path(),
        &[
            ("light.pdf", "Photosynthesis converts light to energy."),
            ("leaves.pdf", "Plants use chlorophyll."),
            ("markets.pdf", "Bond yields rose sharply on Tuesday."),
        ],
    )
    .await;

    let query = "How do plants make energy from light?";
    let sources: Vec<String> = store
        .retrieve(query, 3)
        .await
        .expect("retrieve")
        .into_iter()
        .filter_map(|chunk| chunk.source)
        .collect();
    assert_eq!(sources.first().map(String::as_str), Some("light.pdf"));
    assert!(sources.iter().any(|source| source == "leaves.pdf"));

    let pipeline = AnswerPipeline::new(
        store,
        common::summarizer(Arc::new(ExtractiveSummarizer::new())),
        PipelineSettings::default(),
    );
    let answer = pipeline.answer(query).await.expect("answer");

    let text = answer.text();
    assert!(text.starts_with("Answer: "), "unexpected answer: {text}");
    assert!(text.contains("Photosynthesis converts light to energy."));
    assert!(text.contains("Plants use chlorophyll."));
}

#[tokio::test]
async fn absent_index_fails_without_summarizing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let summarizer = Arc::new(CountingSummarizer::default());
    let pipeline = AnswerPipeline::new(
        common::store(&temp.path().join("vectorstore")),
        common::summarizer(summarizer.clone()),
        PipelineSettings::default(),
    );

    let error = pipeline.answer("anything").await.unwrap_err();
    assert!(matches!(error, AnswerError::IndexUnavailable(_)));
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_retrieval_yields_sentinel_without_summarizing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let index_dir = temp.path().join("vectorstore");
    indexed_library(temp.path(), &[("a.pdf", "Plants use chlorophyll.")]).await;

    // A threshold above any attainable cosine similarity filters every hit.
    let strict = Arc::new(EmbeddingStore::new(
        Arc::new(LocalEmbeddingClient::new("all-minilm", common::DIMENSION)),
        &index_dir,
        1.5,
    ));
    let summarizer = Arc::new(CountingSummarizer::default());
    let pipeline = AnswerPipeline::new(
        strict,
        common::summarizer(summarizer.clone()),
        PipelineSettings::default(),
    );

    let answer = pipeline.answer("chlorophyll").await.expect("answer");
    assert_eq!(answer, Answer::NoContext);
    assert_eq!(
        answer.text(),
        "No relevant sections found to answer or summarize your query."
    );
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_queries_give_identical_answers() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = indexed_library(
        temp.path(),
        &[
            ("a.pdf", "Photosynthesis converts light to energy."),
            ("b.pdf", "Plants use chlorophyll."),
        ],
    )
    .await;
    let pipeline = AnswerPipeline::new(
        store,
        common::summarizer(Arc::new(ExtractiveSummarizer::new())),
        PipelineSettings::default(),
    );

    let first = pipeline.answer("plants energy").await.expect("first");
    let second = pipeline.answer("plants energy").await.expect("second");
    assert_eq!(first, second);
}

#[tokio::test]
async fn ollama_summaries_flow_through_pipeline() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = indexed_library(
        temp.path(),
        &[("a.pdf", "Photosynthesis converts light to energy.")],
    )
    .await;

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("Photosynthesis converts light to energy.");
            then.status(200).json_body(json!({
                "response": "Plants turn light into chemical energy.",
                "done": true
            }));
        })
        .await;

    let client = OllamaSummarizationClient::new(server.base_url(), "llama3.2").expect("client");
    let pipeline = AnswerPipeline::new(
        store,
        common::summarizer(Arc::new(client)),
        PipelineSettings::default(),
    );
    let answer = pipeline.answer("photosynthesis").await.expect("answer");

    mock.assert();
    assert_eq!(answer.text(), "Answer: Plants turn light into chemical energy.");
}

#[tokio::test]
async fn rebuild_replaces_index_wholesale() {
    let temp = tempfile::tempdir().expect("tempdir");
    let uploads = temp.path().join("dataset");
    let store = indexed_library(
        temp.path(),
        &[("old.pdf", "Ancient pottery was fired in kilns.")],
    )
    .await;
    assert_eq!(store.retrieve("pottery", 3).await.expect("retrieve").len(), 1);

    std::fs::remove_file(uploads.join("old.pdf")).expect("remove");
    std::fs::write(
        uploads.join("new.pdf"),
        common::pdf(&["Glaciers carve valleys over millennia."]),
    )
    .expect("write");
    IngestionService::new(Arc::clone(&store), common::ingestion_settings(&uploads))
        .rebuild()
        .await
        .expect("rebuild");

    let chunks = store.retrieve("glaciers pottery", 3).await.expect("retrieve");
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].content.contains("Glaciers"));
    assert_eq!(chunks[0].source.as_deref(), Some("new.pdf"));

    let reloaded = VectorIndex::load(store.index_dir()).await.expect("load");
    assert_eq!(reloaded.manifest().chunk_count, 1);
    assert_eq!(reloaded.manifest().document_count, 1);
}
