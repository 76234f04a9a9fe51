#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdfgenius::config::EmbeddingProvider;
use pdfgenius::documents::DocumentLibrary;
use pdfgenius::embedding::LocalEmbeddingClient;
use pdfgenius::index::EmbeddingStore;
use pdfgenius::ingestion::IngestionSettings;
use pdfgenius::summarization::{SummarizationClient, SummarizerService};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Minimal Helvetica PDF with one page per entry.
pub fn pdf(pages: &[&str]) -> Vec<u8> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = pages
        .iter()
        .map(|text| {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = document.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content"),
            ));
            document
                .add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                    "Resources" => resources_id,
                })
                .into()
        })
        .collect();

    let count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

pub const DIMENSION: usize = 256;

pub fn store(index_dir: &Path) -> Arc<EmbeddingStore> {
    Arc::new(EmbeddingStore::new(
        Arc::new(LocalEmbeddingClient::new("all-minilm", DIMENSION)),
        index_dir,
        0.0,
    ))
}

pub fn summarizer(client: Arc<dyn SummarizationClient>) -> Arc<SummarizerService> {
    Arc::new(SummarizerService::with_client(client, Duration::from_secs(5)))
}

pub fn ingestion_settings(upload_dir: &Path) -> IngestionSettings {
    IngestionSettings {
        upload_dir: upload_dir.to_path_buf(),
        embedding_provider: EmbeddingProvider::Local,
        embedding_model: "all-minilm".into(),
        chunk_size: None,
        chunk_overlap: 0,
    }
}

pub fn library(upload_dir: &Path) -> DocumentLibrary {
    DocumentLibrary::new(upload_dir, 5 * 1024 * 1024, 3)
}
