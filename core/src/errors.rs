use thiserror::Error;

/// Errors raised by the managed-service clients
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },
}

impl ServiceError {
    /// Builds an `HttpError` from a non-success response body.
    ///
    /// AWS JSON services report failures as `{"__type": ..., "message": ...}`
    /// (sometimes `Message`); when the body has that shape the message is
    /// lifted out, otherwise the raw body is kept.
    pub fn from_error_body(status_code: u16, body: &str) -> Self {
        let message = serde_json::from_str::<crate::types::AwsErrorBody>(body)
            .ok()
            .and_then(|err| {
                let text = err.message?;
                Some(match err.error_type {
                    Some(kind) => format!("{}: {}", short_error_type(&kind), text),
                    None => text,
                })
            })
            .unwrap_or_else(|| body.to_string());

        ServiceError::HttpError {
            status_code,
            message,
        }
    }
}

// "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException" -> "ResourceNotFoundException"
fn short_error_type(kind: &str) -> &str {
    kind.rsplit('#').next().unwrap_or(kind)
}

/// Result type for managed-service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
