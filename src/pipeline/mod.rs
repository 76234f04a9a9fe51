//! Retrieval-then-summarization answer pipeline.

mod service;
pub mod types;

pub use service::AnswerPipeline;
pub use types::{
    ANSWER_PREFIX, Answer, AnswerError, NO_CONTEXT_MESSAGE, PipelineSettings, PipelineStage,
};
