use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Search mode sent with every retrieval request
pub const SEMANTIC_SEARCH: &str = "SEMANTIC";

/// Request body for the knowledge-base `Retrieve` operation
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    pub retrieval_query: TextInput,
    pub retrieval_configuration: RetrievalConfiguration,
}

/// A plain `{"text": ...}` input block
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TextInput {
    pub text: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfiguration {
    pub vector_search_configuration: VectorSearchConfiguration,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchConfiguration {
    pub number_of_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_search_type: Option<String>,
}

impl RetrievalConfiguration {
    pub fn with_results(number_of_results: usize, search_type: Option<&str>) -> Self {
        Self {
            vector_search_configuration: VectorSearchConfiguration {
                number_of_results,
                override_search_type: search_type.map(str::to_string),
            },
        }
    }
}

/// Response body of the `Retrieve` operation
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    #[serde(default)]
    pub retrieval_results: Vec<RetrievalResult>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// One ranked fragment returned by the knowledge base.
///
/// Score, location and metadata are carried through untouched; only
/// `content.text` is read by this crate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub content: RetrievalContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RetrievalResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: RetrievalContent { text: text.into() },
            score: None,
            location: None,
            metadata: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RetrievalContent {
    pub text: String,
}

/// Request body for the `RetrieveAndGenerate` operation
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveAndGenerateRequest {
    pub input: TextInput,
    pub retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveAndGenerateConfiguration {
    #[serde(rename = "type")]
    pub config_type: String,
    pub knowledge_base_configuration: KnowledgeBaseConfiguration,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseConfiguration {
    pub knowledge_base_id: String,
    pub model_arn: String,
    pub retrieval_configuration: RetrievalConfiguration,
}

/// Response body of the `RetrieveAndGenerate` operation
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveAndGenerateResponse {
    pub output: Value,
    #[serde(default)]
    pub citations: Vec<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Output and citations of a combined retrieve-and-generate call, verbatim
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub output: Value,
    pub citations: Vec<Value>,
}

/// Anthropic messages body accepted by `InvokeModel`
#[derive(Serialize, Debug)]
pub struct MessagesRequest<'a> {
    pub anthropic_version: &'static str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub messages: Vec<Message<'a>>,
}

#[derive(Serialize, Debug)]
pub struct Message<'a> {
    pub role: &'static str,
    pub content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize, Debug)]
pub struct ContentBlock<'a> {
    #[serde(rename = "type")]
    pub block_type: &'static str,
    pub text: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug)]
pub struct ResponseBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Titan embedding request body
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRequest<'a> {
    pub input_text: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub input_text_token_count: Option<u32>,
}

/// Error payload shared by the AWS JSON services
#[derive(Deserialize, Debug)]
pub(crate) struct AwsErrorBody {
    #[serde(rename = "__type", default)]
    pub error_type: Option<String>,
    #[serde(alias = "Message", default)]
    pub message: Option<String>,
}
