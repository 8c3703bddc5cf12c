//! Request handling for knowledge-base question answering
//!
//! A query is answered by retrieving fragments from the knowledge base,
//! filling the prompt template, invoking the model, splitting the tagged
//! output and writing one audit record. `RequestHandler` runs those steps;
//! `http_server` and the `kbqa-daemon` binary host it.

pub mod envelope;
pub mod errors;
pub mod http_server;
pub mod pipeline;
pub mod prompt;
pub mod splitter;

pub use envelope::{QueryRequest, ResponseEnvelope};
pub use errors::PipelineError;
pub use pipeline::{Answer, RequestHandler};
pub use prompt::PromptTemplate;
pub use splitter::split_response;
