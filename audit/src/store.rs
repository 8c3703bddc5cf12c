use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AuditError;
use crate::record::AuditRecord;

/// Trait defining the interface for audit stores
#[async_trait]
pub trait AuditStore: Send + Sync + Debug {
    /// Writes one record, overwriting any existing record with the same id
    async fn put(&self, record: &AuditRecord) -> Result<(), AuditError>;

    /// Name of the table records are written to
    fn table_name(&self) -> &str;
}

/// Type alias for Arc-wrapped AuditStore trait objects
pub type AuditStoreRef = Arc<dyn AuditStore>;
