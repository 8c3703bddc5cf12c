use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PipelineError;

pub const STATUS_OK: u16 = 200;
pub const STATUS_ERROR: u16 = 500;

/// Incoming invocation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub user: String,
    pub prompt: String,
}

impl QueryRequest {
    /// Pulls `user` and `prompt` out of an untyped event.
    ///
    /// Extra fields are ignored; a missing or non-string field is a validation error.
    pub fn from_event(event: &Value) -> Result<Self, PipelineError> {
        Ok(Self {
            user: required_string(event, "user")?,
            prompt: required_string(event, "prompt")?,
        })
    }
}

fn required_string(event: &Value, field: &str) -> Result<String, PipelineError> {
    match event.get(field) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(PipelineError::Validation(format!(
            "field '{}' must be a string, got {}",
            field,
            json_type_name(other)
        ))),
        None => Err(PipelineError::Validation(format!(
            "missing required field '{}'",
            field
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Response returned to the invoker.
///
/// Success: `{"statusCode": 200, "answer_id": "...", "body": <answer or null>}`.
/// Failure: `{"statusCode": 500, "body": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub answer_id: Option<String>,
    pub body: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(answer_id: String, body: Option<String>) -> Self {
        Self {
            status_code: STATUS_OK,
            answer_id: Some(answer_id),
            body,
        }
    }

    pub fn failure(error: &PipelineError) -> Self {
        Self {
            status_code: STATUS_ERROR,
            answer_id: None,
            body: Some(format!("Error processing event: {}", error)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}
