// Core pieces shared by the audit store and the request handler:
// - Configuration loading
// - Shared error types
// - Wire types for the managed services
// - Knowledge-base, inference and embedding clients

pub mod config;
pub use config::*;

pub mod errors;
pub use errors::*;

pub mod http;

pub mod types;
pub use types::*;

pub mod retrieval;
pub use retrieval::{extract_texts, BedrockAgentClient, KnowledgeBase};

pub mod inference;
pub use inference::{BedrockInferenceClient, InferenceClient};

pub mod embedding;
pub use embedding::{EmbeddingClient, TitanEmbeddingClient};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
