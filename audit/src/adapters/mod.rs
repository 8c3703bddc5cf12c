pub mod dynamodb;
pub mod in_memory;

pub use dynamodb::DynamoDbAuditStore;
pub use in_memory::InMemoryAuditStore;
