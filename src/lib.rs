#![deny(missing_docs)]

//! Core library for the PDFGenius document question-answering service.
//!
//! Uploaded PDFs are split into chunks, embedded, and stored in a flat vector index. Questions
//! are answered by retrieving the closest chunks and summarizing them.

/// HTTP routing and REST handlers.
pub mod api;
/// Assistant service composing answering, ingestion, and the document library.
pub mod assistant;
/// Client for the external authentication service.
pub mod auth;
/// Environment-driven configuration management.
pub mod config;
/// Context assembly from retrieved chunks.
pub mod context;
/// Uploaded document bookkeeping.
pub mod documents;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Persisted vector index and the retrieval accessor.
pub mod index;
/// PDF extraction, chunking, and index rebuilds.
pub mod ingestion;
/// Structured logging and tracing setup.
pub mod logging;
/// Query and ingestion metrics helpers.
pub mod metrics;
/// Retrieval-then-summarization answer pipeline.
pub mod pipeline;
/// Sessions and conversation logs.
pub mod session;
/// Summarization providers and the lazily initialized summarizer.
pub mod summarization;
