use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::KbqaConfig;
use crate::errors::{ServiceError, ServiceResult};
use crate::http::{build_http_client, endpoint_url, send_json};
use crate::types::*;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Text generation against a managed model endpoint
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Generate text from a prompt
    async fn invoke(&self, prompt: &str) -> ServiceResult<String>;

    /// Get the model name being used
    fn model_name(&self) -> String;
}

/// Bedrock Runtime client for Anthropic message models
#[derive(Debug, Clone)]
pub struct BedrockInferenceClient {
    http_client: Client,
    endpoint: String,
    model_id: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl BedrockInferenceClient {
    pub fn new(config: &KbqaConfig) -> ServiceResult<Self> {
        let model_id =
            KbqaConfig::require(&config.inference_model_id, "inference_model_id")?.to_string();

        Ok(Self {
            http_client: build_http_client(config.request_timeout(), config.bearer_token.as_deref())?,
            endpoint: config.runtime_endpoint(),
            model_id,
            max_tokens: config.max_tokens.unwrap_or(1024),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl InferenceClient for BedrockInferenceClient {
    fn model_name(&self) -> String {
        self.model_id.clone()
    }

    async fn invoke(&self, prompt: &str) -> ServiceResult<String> {
        debug!(model = %self.model_id, prompt_len = prompt.len(), "Invoking inference model");

        let url = endpoint_url(&self.endpoint, &["model", &self.model_id, "invoke"])?;
        let request = MessagesRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: vec![ContentBlock {
                    block_type: "text",
                    text: prompt,
                }],
            }],
        };

        let response: MessagesResponse = send_json(
            self.http_client
                .post(url)
                .header(ACCEPT, "application/json")
                .json(&request),
            "InvokeModel",
        )
        .await?;

        if let Some(usage) = &response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Inference token usage"
            );
        }

        if let Some(reason) = &response.stop_reason {
            if reason != "end_turn" && reason != "stop_sequence" {
                warn!("Inference stop reason: {}", reason);
            }
        }

        let text: String = response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.is_empty() {
            return Err(ServiceError::ResponseError(
                "No text in model response".to_string(),
            ));
        }

        Ok(text)
    }
}
