use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::KbqaConfig;
use crate::errors::ServiceResult;
use crate::http::{build_http_client, endpoint_url, send_json};
use crate::types::*;

/// Semantic search over a managed knowledge base
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Returns up to `result_count` ranked fragments for `query`, in service order
    async fn retrieve(&self, query: &str, result_count: usize) -> ServiceResult<Vec<RetrievalResult>>;

    /// Delegates both retrieval and generation to the service in one call
    async fn retrieve_and_generate(
        &self,
        input: &str,
        result_count: usize,
    ) -> ServiceResult<GeneratedAnswer>;
}

/// Projects the text content of each fragment, preserving order
pub fn extract_texts(fragments: &[RetrievalResult]) -> Vec<String> {
    fragments
        .iter()
        .map(|fragment| fragment.content.text.clone())
        .collect()
}

/// Client for the Bedrock Agent Runtime knowledge-base API
#[derive(Debug, Clone)]
pub struct BedrockAgentClient {
    http_client: Client,
    endpoint: String,
    knowledge_base_id: String,
    model_arn: Option<String>,
}

impl BedrockAgentClient {
    /// Create a new knowledge-base client; the knowledge base id is required
    pub fn new(config: &KbqaConfig) -> ServiceResult<Self> {
        let knowledge_base_id =
            KbqaConfig::require(&config.knowledge_base_id, "knowledge_base_id")?.to_string();

        let http_client =
            build_http_client(config.request_timeout(), config.bearer_token.as_deref())?;

        Ok(Self {
            http_client,
            endpoint: config.agent_endpoint(),
            knowledge_base_id,
            model_arn: config.model_arn.clone(),
        })
    }

    pub fn knowledge_base_id(&self) -> &str {
        &self.knowledge_base_id
    }
}

#[async_trait]
impl KnowledgeBase for BedrockAgentClient {
    async fn retrieve(&self, query: &str, result_count: usize) -> ServiceResult<Vec<RetrievalResult>> {
        let url = endpoint_url(
            &self.endpoint,
            &["knowledgebases", &self.knowledge_base_id, "retrieve"],
        )?;

        let request = RetrieveRequest {
            retrieval_query: TextInput {
                text: query.to_string(),
            },
            retrieval_configuration: RetrievalConfiguration::with_results(
                result_count,
                Some(SEMANTIC_SEARCH),
            ),
        };

        debug!(
            knowledge_base_id = %self.knowledge_base_id,
            result_count,
            "Retrieving knowledge-base fragments"
        );

        let response: RetrieveResponse =
            send_json(self.http_client.post(url).json(&request), "Retrieve").await?;

        info!(
            fragments = response.retrieval_results.len(),
            "Knowledge-base retrieval completed"
        );

        Ok(response.retrieval_results)
    }

    async fn retrieve_and_generate(
        &self,
        input: &str,
        result_count: usize,
    ) -> ServiceResult<GeneratedAnswer> {
        let model_arn = KbqaConfig::require(&self.model_arn, "model_arn")?.to_string();
        let url = endpoint_url(&self.endpoint, &["retrieveAndGenerate"])?;

        let request = RetrieveAndGenerateRequest {
            input: TextInput {
                text: input.to_string(),
            },
            retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration {
                config_type: "KNOWLEDGE_BASE".to_string(),
                knowledge_base_configuration: KnowledgeBaseConfiguration {
                    knowledge_base_id: self.knowledge_base_id.clone(),
                    model_arn,
                    retrieval_configuration: RetrievalConfiguration::with_results(result_count, None),
                },
            },
        };

        let response: RetrieveAndGenerateResponse = send_json(
            self.http_client.post(url).json(&request),
            "RetrieveAndGenerate",
        )
        .await?;

        info!(
            citations = response.citations.len(),
            "Retrieve-and-generate completed"
        );

        Ok(GeneratedAnswer {
            output: response.output,
            citations: response.citations,
        })
    }
}
