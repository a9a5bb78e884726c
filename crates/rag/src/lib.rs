//! Knowledge-base side of the Q&A engine
//!
//! Features:
//! - Confidence assessment over retrieved candidates
//! - Answer-quality validation ("I don't know" marker detection)
//! - Knowledge file loading (JSON/YAML, pre-chunked)
//! - In-memory lexical retriever implementing the core `Retriever` trait

pub mod assessment;
pub mod knowledge;
pub mod lexical;
pub mod quality;

pub use assessment::ConfidenceAssessor;
pub use knowledge::{KnowledgeDocument, KnowledgeFile, KnowledgeLoader};
pub use lexical::LexicalRetriever;
pub use quality::AnswerQualityValidator;

use docqa_core::RetrievalError;
use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid pattern: {0}")]
    Pattern(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<RagError> for RetrievalError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::NotFound(msg) => RetrievalError::IndexUnavailable(msg),
            other => RetrievalError::Backend(other.to_string()),
        }
    }
}
