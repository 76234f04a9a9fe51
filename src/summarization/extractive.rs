//! Deterministic extractive summarizer.

use super::{SummarizationClient, SummarizationClientError, SummarizationRequest, count_words};
use async_trait::async_trait;

/// Selects whole sentences in document order until the word budget is spent.
///
/// When the selected sentences fall short of `min_words`, the next sentence is clipped to fill
/// the remaining budget. Output never exceeds `max_words`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveSummarizer;

impl ExtractiveSummarizer {
    /// Construct the summarizer.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SummarizationClient for ExtractiveSummarizer {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let summary = build_extractive_summary(&request.text, request.min_words, request.max_words);
        if summary.is_empty() {
            return Err(SummarizationClientError::InvalidInput(
                "text contains no sentences".into(),
            ));
        }
        Ok(summary)
    }

    fn name(&self) -> &'static str {
        "extractive"
    }
}

fn build_extractive_summary(text: &str, min_words: usize, max_words: usize) -> String {
    let mut selected: Vec<String> = Vec::new();
    let mut used_words = 0usize;

    for sentence in split_sentences(text) {
        let words = count_words(&sentence);
        if used_words + words <= max_words {
            used_words += words;
            selected.push(sentence);
            if used_words == max_words {
                break;
            }
            continue;
        }

        if used_words < min_words || selected.is_empty() {
            let remaining = max_words - used_words;
            let mut clipped = sentence
                .split_whitespace()
                .take(remaining)
                .collect::<Vec<_>>()
                .join(" ");
            if !clipped.is_empty() {
                clipped.push('…');
                selected.push(clipped);
            }
        }
        break;
    }

    selected.join(" ")
}

/// Split on sentence terminators and blank lines, collapsing internal whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for paragraph in text.split("\n\n") {
        let mut current = String::new();
        let mut chars = paragraph.chars().peekable();
        while let Some(c) = chars.next() {
            current.push(c);
            let at_boundary = matches!(c, '.' | '!' | '?')
                && chars.peek().map_or(true, |next| next.is_whitespace());
            if at_boundary {
                push_sentence(&mut sentences, &current);
                current.clear();
            }
        }
        push_sentence(&mut sentences, &current);
    }
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.is_empty() {
        sentences.push(normalized);
    }
}
