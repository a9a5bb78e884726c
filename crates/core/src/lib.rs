//! Core traits and types for the document Q&A engine
//!
//! This crate provides foundational types used across all other crates:
//! - The per-query data model (queries, evidence, citations, answers)
//! - Collaborator traits for pluggable backends (retriever, generator, web providers)
//! - The collaborator error taxonomy
//! - LLM request types
//! - Bounded, cancellable external calls

pub mod answer;
pub mod call;
pub mod error;
pub mod evidence;
pub mod llm_types;
pub mod query;
pub mod traits;

pub use answer::{AnswerRecord, Citation, CitationLocator, ConfidenceVerdict, VerdictReason};
pub use call::{bounded, CallOutcome};
pub use error::{GenerationError, ProviderError, RetrievalError};
pub use evidence::{ChunkSource, EvidenceSet, RetrievalCandidate, SourceType, WebSnippet};
pub use llm_types::{GenerateRequest, Message, Role};
pub use query::Query;

// Trait re-exports
pub use traits::{Generator, Retriever, WebProvider};

pub use tokio_util::sync::CancellationToken;
