//! Audit log persistence
//!
//! One `AuditRecord` is written per answered query. The `AuditStore` trait
//! abstracts the key-value table so the request pipeline can run against
//! DynamoDB in production and an in-memory map in tests or local runs.

pub mod adapters;
pub mod errors;
pub mod record;
pub mod store;
pub mod writer;

pub use adapters::{DynamoDbAuditStore, InMemoryAuditStore};
pub use errors::AuditError;
pub use record::{AuditRecord, TIMESTAMP_FORMAT};
pub use store::{AuditStore, AuditStoreRef};
pub use writer::AuditLogWriter;
