use tracing::{error, info};

use crate::errors::AuditError;
use crate::record::AuditRecord;
use crate::store::AuditStoreRef;

/// Persists one audit record per answered query
#[derive(Debug, Clone)]
pub struct AuditLogWriter {
    store: AuditStoreRef,
}

impl AuditLogWriter {
    pub fn new(store: AuditStoreRef) -> Self {
        Self { store }
    }

    /// Builds the record and performs a single unconditional write.
    ///
    /// Failures are logged and returned as-is: no retry, no buffering.
    pub async fn record(
        &self,
        unique_id: &str,
        user_id: &str,
        query: &str,
        model_response: Option<&str>,
        query_topic: Option<&str>,
    ) -> Result<AuditRecord, AuditError> {
        let record = AuditRecord::new(
            unique_id,
            user_id,
            query,
            model_response.map(str::to_string),
            query_topic.map(str::to_string),
        );

        match self.store.put(&record).await {
            Ok(()) => {
                info!(
                    table = self.store.table_name(),
                    unique_id,
                    "Audit log entry recorded"
                );
                Ok(record)
            }
            Err(e) => {
                error!(
                    table = self.store.table_name(),
                    unique_id,
                    error = %e,
                    "Failed to record audit log entry"
                );
                Err(e)
            }
        }
    }
}
