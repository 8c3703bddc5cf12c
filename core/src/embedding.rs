use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::debug;

use crate::config::{KbqaConfig, DEFAULT_EMBEDDING_MODEL_ID};
use crate::errors::ServiceResult;
use crate::http::{build_http_client, endpoint_url, send_json};
use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// Vector embedding of a single text. No caching, no batching.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>>;
}

/// Amazon Titan text embeddings through Bedrock Runtime
#[derive(Debug, Clone)]
pub struct TitanEmbeddingClient {
    http_client: Client,
    endpoint: String,
    model_id: String,
}

impl TitanEmbeddingClient {
    pub fn new(config: &KbqaConfig) -> ServiceResult<Self> {
        Ok(Self {
            http_client: build_http_client(config.request_timeout(), config.bearer_token.as_deref())?,
            endpoint: config.runtime_endpoint(),
            model_id: config
                .embedding_model_id
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL_ID.to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingClient for TitanEmbeddingClient {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let url = endpoint_url(&self.endpoint, &["model", &self.model_id, "invoke"])?;

        let response: EmbeddingResponse = send_json(
            self.http_client
                .post(url)
                .header(ACCEPT, "application/json")
                .json(&EmbeddingRequest { input_text: text }),
            "InvokeModel",
        )
        .await?;

        debug!(
            model = %self.model_id,
            dimensions = response.embedding.len(),
            tokens = ?response.input_text_token_count,
            "Generated embedding"
        );

        Ok(response.embedding)
    }
}
