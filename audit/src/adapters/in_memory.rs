use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::AuditError;
use crate::record::AuditRecord;
use crate::store::AuditStore;

/// In-memory implementation of AuditStore
#[derive(Debug)]
pub struct InMemoryAuditStore {
    table_name: String,
    records: RwLock<HashMap<String, AuditRecord>>,
}

impl InMemoryAuditStore {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Get a record by its unique id
    pub fn get(&self, unique_id: &str) -> Result<Option<AuditRecord>, AuditError> {
        let records = self.records.read().map_err(|e| {
            AuditError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(records.get(unique_id).cloned())
    }

    /// All stored records, in no particular order
    pub fn records(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let records = self.records.read().map_err(|e| {
            AuditError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(records.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize, AuditError> {
        let records = self.records.read().map_err(|e| {
            AuditError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool, AuditError> {
        Ok(self.len()? == 0)
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new("in-memory")
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn put(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut records = self.records.write().map_err(|e| {
            AuditError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        records.insert(record.unique_id.clone(), record.clone());
        debug!("Stored audit record: {}", record.unique_id);

        Ok(())
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::test;

    #[test]
    async fn test_put_and_get_record() {
        let store = InMemoryAuditStore::new("audit");
        let record = AuditRecord::new("id-1", "u1", "What is X?", Some("X".into()), None);

        store.put(&record).await.unwrap();

        assert_eq!(store.get("id-1").unwrap(), Some(record));
        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(store.table_name(), "audit");
    }

    #[test]
    async fn test_put_overwrites_same_id() {
        let store = InMemoryAuditStore::default();
        let first = AuditRecord::new("id-1", "u1", "first", None, None);
        let second = AuditRecord::new("id-1", "u1", "second", None, None);

        store.put(&first).await.unwrap();
        store.put(&second).await.unwrap();

        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get("id-1").unwrap().unwrap().query, "second");
    }

    #[test]
    async fn test_poisoned_lock_is_storage_error() {
        let store = std::sync::Arc::new(InMemoryAuditStore::default());
        store
            .put(&AuditRecord::new("id-1", "u1", "q", None, None))
            .await
            .unwrap();

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.records.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(AuditError::StorageError(_))));
        assert!(matches!(store.is_empty(), Err(AuditError::StorageError(_))));
        assert!(matches!(store.get("id-1"), Err(AuditError::StorageError(_))));
    }
}
