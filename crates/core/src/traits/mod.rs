//! Collaborator traits
//!
//! The orchestrator only talks to its external collaborators through these
//! traits, so backends can be swapped by configuration and replaced by mocks
//! in tests.
//!
//! # Trait Hierarchy
//!
//! ```text
//! Retrieval:
//!   - Retriever: query text → top-k scored chunks
//!
//! Generation:
//!   - Generator: prompt messages → answer text
//!
//! Web search:
//!   - WebProvider: query text → web snippets
//! ```

mod generator;
mod retriever;
mod web_provider;

pub use generator::Generator;
pub use retriever::Retriever;
pub use web_provider::WebProvider;
