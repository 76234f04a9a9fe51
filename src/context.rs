//! Context assembly: turns ranked chunks into the text handed to the summarizer.

use crate::index::DocumentChunk;

/// Hard upper bound on the chunks that may reach the summarizer.
pub const CONTEXT_CHUNK_CAP: usize = 3;

const SEPARATOR: &str = "\n\n";

/// Join the first [`CONTEXT_CHUNK_CAP`] chunks with a blank line, preserving order.
pub fn assemble(chunks: &[DocumentChunk]) -> String {
    assemble_with_cap(chunks, CONTEXT_CHUNK_CAP)
}

/// Same as [`assemble`] with a tighter cap. Values above [`CONTEXT_CHUNK_CAP`] are clamped.
pub fn assemble_with_cap(chunks: &[DocumentChunk], cap: usize) -> String {
    let cap = cap.min(CONTEXT_CHUNK_CAP);
    chunks
        .iter()
        .take(cap)
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
