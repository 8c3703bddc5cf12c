use async_trait::async_trait;
use kbqa_core::http::{build_http_client, send_json};
use kbqa_core::{KbqaConfig, ServiceError};
use reqwest::{Client, Url};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::errors::AuditError;
use crate::record::AuditRecord;
use crate::store::AuditStore;

const PUT_ITEM_TARGET: &str = "DynamoDB_20120810.PutItem";
const AMZ_JSON: &str = "application/x-amz-json-1.0";

/// Audit store backed by a DynamoDB table, spoken to over the JSON 1.0 protocol.
///
/// Request signing is left to whatever sits at the configured endpoint.
#[derive(Debug, Clone)]
pub struct DynamoDbAuditStore {
    http_client: Client,
    endpoint: Url,
    table_name: String,
}

impl DynamoDbAuditStore {
    pub fn new(config: &KbqaConfig) -> Result<Self, AuditError> {
        let table_name = KbqaConfig::require(&config.dynamodb_table, "dynamodb_table")?.to_string();

        let raw_endpoint = config.dynamodb_endpoint();
        let endpoint = Url::parse(&raw_endpoint).map_err(|e| {
            ServiceError::ConfigError(format!("Invalid endpoint '{}': {}", raw_endpoint, e))
        })?;

        Ok(Self {
            http_client: build_http_client(config.request_timeout(), None)?,
            endpoint,
            table_name,
        })
    }
}

#[async_trait]
impl AuditStore for DynamoDbAuditStore {
    async fn put(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let body = json!({
            "TableName": self.table_name,
            "Item": record.to_dynamo_item(),
        });

        debug!(table = %self.table_name, unique_id = %record.unique_id, "Putting audit item");

        let request = self
            .http_client
            .post(self.endpoint.clone())
            .header("X-Amz-Target", PUT_ITEM_TARGET)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .body(body.to_string());

        match send_json::<Value>(request, "PutItem").await {
            Ok(_) => {
                info!(table = %self.table_name, unique_id = %record.unique_id, "Audit record written");
                Ok(())
            }
            Err(ServiceError::HttpError { status_code, message }) => Err(AuditError::WriteFailed {
                table: self.table_name.clone(),
                message: format!("{} ({})", message, status_code),
            }),
            Err(e) => Err(AuditError::Service(e)),
        }
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }
}
