use kbqa_audit::AuditError;
use kbqa_core::ServiceError;
use thiserror::Error;

/// Why a pipeline run failed. Every variant maps to the same 500 envelope.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The event is missing a required field or has the wrong type
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Knowledge-base retrieval failed: {0}")]
    Retrieval(#[source] ServiceError),

    #[error("Model inference failed: {0}")]
    Inference(#[source] ServiceError),

    /// The answer was computed but could not be logged
    #[error("Audit log write failed: {0}")]
    Persistence(#[from] AuditError),
}

impl PipelineError {
    /// Short stable name for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Retrieval(_) => "retrieval",
            PipelineError::Inference(_) => "inference",
            PipelineError::Persistence(_) => "persistence",
        }
    }
}
