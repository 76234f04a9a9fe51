//! Ollama-backed abstractive summarization.

use super::{SummarizationClient, SummarizationClientError, SummarizationRequest, clip_words};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

// Greedy decoding with a pinned seed keeps repeated calls on the same text identical.
const SAMPLING_SEED: u64 = 42;

/// Summarization client issuing `/api/generate` requests to an Ollama runtime.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

impl OllamaSummarizationClient {
    /// Construct a client for `model` at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("pdfgenius/summary")
            .build()
            .map_err(|error| SummarizationClientError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

fn build_prompt(request: &SummarizationRequest) -> String {
    format!(
        "Summarize the following passages in {min} to {max} words. Use only information found in \
         the passages. Output a single plain-text paragraph.\n\n{text}",
        min = request.min_words,
        max = request.max_words,
        text = request.text.trim(),
    )
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": build_prompt(&request),
            "stream": false,
            "options": {
                "temperature": 0.0,
                "seed": SAMPLING_SEED,
                // Roughly two tokens per English word.
                "num_predict": request.max_words * 2,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        let summary = clip_words(body.response.trim(), request.max_words);
        if summary.is_empty() {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama returned an empty summary".into(),
            ));
        }
        Ok(summary)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn request(text: &str, max_words: usize) -> SummarizationRequest {
        SummarizationRequest {
            text: text.into(),
            min_words: 1,
            max_words,
        }
    }

    #[tokio::test]
    async fn handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url(), "llama").expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("\"temperature\":0.0");
                then.status(200).json_body(json!({
                    "response": "  Summary text  ",
                    "done": true
                }));
            })
            .await;

        let summary = client
            .generate_summary(request("Plants use chlorophyll.", 100))
            .await
            .expect("summary");

        mock.assert();
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn clips_overlong_response() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url(), "llama").expect("client");
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "one two three four five",
                    "done": true
                }));
            })
            .await;

        let summary = client
            .generate_summary(request("text", 3))
            .await
            .expect("summary");
        assert_eq!(summary, "one two three");
    }

    #[tokio::test]
    async fn handles_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url(), "llama").expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate_summary(request("text", 10))
            .await
            .expect_err("error response");

        assert!(
            matches!(error, SummarizationClientError::GenerationFailed(message) if message.contains("500"))
        );
    }

    #[test]
    fn prompt_carries_bounds_and_text() {
        let prompt = build_prompt(&SummarizationRequest {
            text: " Plants use chlorophyll. ".into(),
            min_words: 60,
            max_words: 180,
        });
        assert!(prompt.contains("60 to 180 words"));
        assert!(prompt.ends_with("Plants use chlorophyll."));
    }
}
