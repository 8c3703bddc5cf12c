use std::sync::Arc;

use anyhow::{Context, Result};
use kbqa_audit::{AuditLogWriter, AuditStoreRef, DynamoDbAuditStore};
use kbqa_core::{
    extract_texts, BedrockAgentClient, BedrockInferenceClient, InferenceClient, KbqaConfig,
    KnowledgeBase, DEFAULT_RESULT_COUNT,
};
use serde_json::Value;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::envelope::{QueryRequest, ResponseEnvelope};
use crate::errors::PipelineError;
use crate::prompt::PromptTemplate;
use crate::splitter::split_response;

/// Result of one successful pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer_id: String,
    pub body: Option<String>,
    pub topic: Option<String>,
}

/// Retrieval, prompt composition, inference, parsing and audit logging,
/// run in that fixed order for each request.
///
/// Clients are built once and shared across invocations.
pub struct RequestHandler {
    knowledge_base: Arc<dyn KnowledgeBase>,
    inference: Arc<dyn InferenceClient>,
    audit: AuditLogWriter,
    template: PromptTemplate,
    result_count: usize,
}

impl RequestHandler {
    pub fn new(
        knowledge_base: Arc<dyn KnowledgeBase>,
        inference: Arc<dyn InferenceClient>,
        audit_store: AuditStoreRef,
        template: PromptTemplate,
    ) -> Self {
        Self {
            knowledge_base,
            inference,
            audit: AuditLogWriter::new(audit_store),
            template,
            result_count: DEFAULT_RESULT_COUNT,
        }
    }

    pub fn with_result_count(mut self, result_count: usize) -> Self {
        self.result_count = result_count;
        self
    }

    /// Builds the production clients from configuration.
    ///
    /// `audit_store` overrides the DynamoDB table when given.
    pub fn from_config(config: &KbqaConfig, audit_store: Option<AuditStoreRef>) -> Result<Self> {
        let knowledge_base = BedrockAgentClient::new(config)
            .context("Failed to initialize knowledge-base client")?;
        let inference = BedrockInferenceClient::new(config)
            .context("Failed to initialize inference client")?;

        let audit_store = match audit_store {
            Some(store) => store,
            None => Arc::new(
                DynamoDbAuditStore::new(config).context("Failed to initialize audit store")?,
            ),
        };

        let template = match &config.prompt_template_path {
            Some(path) => PromptTemplate::load_from_file(path)
                .with_context(|| format!("Failed to load prompt template {}", path.display()))?,
            None => PromptTemplate::default(),
        };

        info!(
            knowledge_base_id = knowledge_base.knowledge_base_id(),
            model = %inference.model_name(),
            table = audit_store.table_name(),
            "Request handler initialized"
        );

        Ok(Self::new(
            Arc::new(knowledge_base),
            Arc::new(inference),
            audit_store,
            template,
        )
        .with_result_count(config.result_count()))
    }

    pub fn knowledge_base(&self) -> Arc<dyn KnowledgeBase> {
        self.knowledge_base.clone()
    }

    pub fn result_count(&self) -> usize {
        self.result_count
    }

    /// Runs the pipeline and reports which step failed, if any
    pub async fn answer(&self, event: &Value) -> Result<Answer, PipelineError> {
        let request = QueryRequest::from_event(event)?;
        info!(user = %request.user, "Processing query");
        debug!(prompt = %request.prompt, "User prompt");

        let fragments = self
            .knowledge_base
            .retrieve(&request.prompt, self.result_count)
            .await
            .map_err(PipelineError::Retrieval)?;

        let contexts = extract_texts(&fragments);
        debug!(contexts = contexts.len(), "Extracted fragment texts");

        let prompt = self.template.build(&request.prompt, &contexts);
        debug!(prompt_len = prompt.len(), "Composed prompt");

        let output = self
            .inference
            .invoke(&prompt)
            .await
            .map_err(PipelineError::Inference)?;
        debug!(output = %output, "Model output");

        let (body, topic) = split_response(&output);
        debug!(
            has_answer = body.is_some(),
            topic = ?topic,
            "Split model output"
        );

        let answer_id = Uuid::new_v4().to_string();

        self.audit
            .record(
                &answer_id,
                &request.user,
                &request.prompt,
                body.as_deref(),
                topic.as_deref(),
            )
            .await?;

        Ok(Answer {
            answer_id,
            body,
            topic,
        })
    }

    /// Runs the pipeline and collapses the outcome into the response envelope
    pub async fn handle(&self, event: &Value) -> ResponseEnvelope {
        match self.answer(event).await {
            Ok(answer) => {
                info!(answer_id = %answer.answer_id, "Query answered");
                ResponseEnvelope::success(answer.answer_id, answer.body)
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, "Failed to process event");
                ResponseEnvelope::failure(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kbqa_audit::{AuditError, AuditRecord, AuditStore, InMemoryAuditStore};
    use kbqa_core::{GeneratedAnswer, RetrievalResult, ServiceError, ServiceResult};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockKnowledgeBase {
        fragments: Vec<&'static str>,
        fail: bool,
        calls: AtomicUsize,
        last_count: Mutex<Option<usize>>,
    }

    impl MockKnowledgeBase {
        fn returning(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                fail: false,
                calls: AtomicUsize::new(0),
                last_count: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::returning(vec![])
            }
        }
    }

    #[async_trait]
    impl KnowledgeBase for MockKnowledgeBase {
        async fn retrieve(&self, _query: &str, result_count: usize) -> ServiceResult<Vec<RetrievalResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_count.lock().unwrap() = Some(result_count);
            if self.fail {
                return Err(ServiceError::HttpError {
                    status_code: 503,
                    message: "knowledge base unavailable".to_string(),
                });
            }
            Ok(self.fragments.iter().map(|t| RetrievalResult::text(*t)).collect())
        }

        async fn retrieve_and_generate(
            &self,
            _input: &str,
            _result_count: usize,
        ) -> ServiceResult<GeneratedAnswer> {
            unreachable!("not used by the request path")
        }
    }

    struct MockInference {
        output: &'static str,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl MockInference {
        fn returning(output: &'static str) -> Self {
            Self {
                output,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InferenceClient for MockInference {
        async fn invoke(&self, prompt: &str) -> ServiceResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.output.to_string())
        }

        fn model_name(&self) -> String {
            "mock-model".to_string()
        }
    }

    struct FailingInference;

    #[async_trait]
    impl InferenceClient for FailingInference {
        async fn invoke(&self, _prompt: &str) -> ServiceResult<String> {
            Err(ServiceError::RequestError("connection reset".to_string()))
        }

        fn model_name(&self) -> String {
            "failing-model".to_string()
        }
    }

    #[derive(Debug, Default)]
    struct FailingStore {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl AuditStore for FailingStore {
        async fn put(&self, _record: &AuditRecord) -> Result<(), AuditError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AuditError::WriteFailed {
                table: "query-logs".to_string(),
                message: "ProvisionedThroughputExceededException".to_string(),
            })
        }

        fn table_name(&self) -> &str {
            "query-logs"
        }
    }

    const MODEL_OUTPUT: &str =
        "<response>X is a widget used for Y.</response><topic>definitions</topic>";

    #[tokio::test]
    async fn test_worked_example() {
        let kb = Arc::new(MockKnowledgeBase::returning(vec![
            "X is a widget.",
            "Widgets are small.",
        ]));
        let inference = Arc::new(MockInference::returning(MODEL_OUTPUT));
        let store = Arc::new(InMemoryAuditStore::new("query-logs"));
        let handler = RequestHandler::new(
            kb.clone(),
            inference.clone(),
            store.clone(),
            PromptTemplate::default(),
        );

        let envelope = handler
            .handle(&json!({"user": "u1", "prompt": "What is X?"}))
            .await;

        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.body.as_deref(), Some("X is a widget used for Y."));
        let answer_id = envelope.answer_id.clone().unwrap();
        assert!(Uuid::parse_str(&answer_id).is_ok());

        assert_eq!(*kb.last_count.lock().unwrap(), Some(5));
        let prompts = inference.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("What is X?"));
        assert!(prompts[0].contains("1. X is a widget.\n2. Widgets are small."));

        assert_eq!(store.len().unwrap(), 1);
        let record = store.get(&answer_id).unwrap().unwrap();
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.query, "What is X?");
        assert_eq!(record.model_response.as_deref(), Some("X is a widget used for Y."));
        assert_eq!(record.query_topic.as_deref(), Some("definitions"));
        assert_eq!(record.was_copied, 0);
        assert_eq!(record.was_liked, None);
    }

    #[tokio::test]
    async fn test_each_run_gets_a_fresh_id() {
        let store = Arc::new(InMemoryAuditStore::default());
        let handler = RequestHandler::new(
            Arc::new(MockKnowledgeBase::returning(vec!["ctx"])),
            Arc::new(MockInference::returning(MODEL_OUTPUT)),
            store.clone(),
            PromptTemplate::default(),
        );
        let event = json!({"user": "u1", "prompt": "What is X?"});

        let first = handler.answer(&event).await.unwrap();
        let second = handler.answer(&event).await.unwrap();

        assert_ne!(first.answer_id, second.answer_id);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_untagged_output_is_logged_with_absent_fields() {
        let store = Arc::new(InMemoryAuditStore::default());
        let handler = RequestHandler::new(
            Arc::new(MockKnowledgeBase::returning(vec![])),
            Arc::new(MockInference::returning("I could not find that.")),
            store.clone(),
            PromptTemplate::default(),
        );

        let envelope = handler.handle(&json!({"user": "u1", "prompt": "?"})).await;

        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.body, None);
        let record = store.get(envelope.answer_id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(record.model_response, None);
        assert_eq!(record.query_topic, None);
    }

    #[tokio::test]
    async fn test_missing_field_fails_without_side_effects() {
        for event in [json!({"user": "u1"}), json!({"prompt": "What is X?"})] {
            let kb = Arc::new(MockKnowledgeBase::returning(vec!["ctx"]));
            let inference = Arc::new(MockInference::returning(MODEL_OUTPUT));
            let store = Arc::new(InMemoryAuditStore::default());
            let handler = RequestHandler::new(
                kb.clone(),
                inference.clone(),
                store.clone(),
                PromptTemplate::default(),
            );

            let err = handler.answer(&event).await.unwrap_err();
            assert!(matches!(err, PipelineError::Validation(_)));

            let envelope = handler.handle(&event).await;
            assert_eq!(envelope.status_code, 500);
            assert!(envelope.answer_id.is_none());
            assert_eq!(kb.calls.load(Ordering::SeqCst), 0);
            assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
            assert!(store.is_empty().unwrap());
        }
    }

    #[tokio::test]
    async fn test_retrieval_failure_skips_inference_and_audit() {
        let inference = Arc::new(MockInference::returning(MODEL_OUTPUT));
        let store = Arc::new(InMemoryAuditStore::default());
        let handler = RequestHandler::new(
            Arc::new(MockKnowledgeBase::failing()),
            inference.clone(),
            store.clone(),
            PromptTemplate::default(),
        );
        let event = json!({"user": "u1", "prompt": "What is X?"});

        let err = handler.answer(&event).await.unwrap_err();
        assert!(matches!(err, PipelineError::Retrieval(_)));
        assert_eq!(err.kind(), "retrieval");

        let envelope = handler.handle(&event).await;
        assert_eq!(envelope.status_code, 500);
        assert!(envelope
            .body
            .as_deref()
            .unwrap()
            .contains("knowledge base unavailable"));
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_inference_failure_skips_audit() {
        let store = Arc::new(InMemoryAuditStore::default());
        let handler = RequestHandler::new(
            Arc::new(MockKnowledgeBase::returning(vec!["ctx"])),
            Arc::new(FailingInference),
            store.clone(),
            PromptTemplate::default(),
        );

        let err = handler
            .answer(&json!({"user": "u1", "prompt": "What is X?"}))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Inference(_)));
        assert!(store.is_empty().unwrap());
    }

    // The answer is computed but discarded when the audit write fails.
    #[tokio::test]
    async fn test_audit_failure_after_inference_is_a_failure() {
        let inference = Arc::new(MockInference::returning(MODEL_OUTPUT));
        let store = Arc::new(FailingStore::default());
        let handler = RequestHandler::new(
            Arc::new(MockKnowledgeBase::returning(vec!["ctx"])),
            inference.clone(),
            store.clone(),
            PromptTemplate::default(),
        );
        let event = json!({"user": "u1", "prompt": "What is X?"});

        let err = handler.answer(&event).await.unwrap_err();
        assert!(matches!(err, PipelineError::Persistence(_)));

        let envelope = handler.handle(&event).await;
        assert_eq!(envelope.status_code, 500);
        assert!(envelope.answer_id.is_none());
        assert!(envelope
            .body
            .as_deref()
            .unwrap()
            .starts_with("Error processing event: Audit log write failed"));
        assert_eq!(inference.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_configured_result_count_is_used() {
        let kb = Arc::new(MockKnowledgeBase::returning(vec!["ctx"]));
        let handler = RequestHandler::new(
            kb.clone(),
            Arc::new(MockInference::returning(MODEL_OUTPUT)),
            Arc::new(InMemoryAuditStore::default()),
            PromptTemplate::default(),
        )
        .with_result_count(3);

        handler
            .answer(&json!({"user": "u1", "prompt": "What is X?"}))
            .await
            .unwrap();
        assert_eq!(*kb.last_count.lock().unwrap(), Some(3));
        assert_eq!(handler.result_count(), 3);
    }

    #[test]
    fn test_from_config_reports_missing_settings() {
        let err = RequestHandler::from_config(&KbqaConfig::default(), None)
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("knowledge_base_id is not configured"));
    }

    #[test]
    fn test_from_config_accepts_store_override() {
        let config = KbqaConfig {
            knowledge_base_id: Some("KB123".to_string()),
            inference_model_id: Some("anthropic.claude-3-haiku-20240307-v1:0".to_string()),
            result_count: Some(4),
            ..KbqaConfig::default()
        };

        let handler =
            RequestHandler::from_config(&config, Some(Arc::new(InMemoryAuditStore::default())))
                .unwrap();
        assert_eq!(handler.result_count(), 4);
    }
}
