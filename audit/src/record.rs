use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Minute-granularity timestamp stored with every record, e.g. `2024-05-03:14-07`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d:%H-%M";

/// One persisted query/response interaction.
///
/// Written once per answered query and never mutated by this crate;
/// `was_copied` and `was_liked` are owned by whatever collects user feedback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    pub unique_id: String,
    pub user_id: String,
    pub query: String,
    pub model_response: Option<String>,
    pub query_topic: Option<String>,
    pub timestamp: String,
    pub was_copied: u32,
    pub was_liked: Option<bool>,
}

impl AuditRecord {
    /// Creates a record stamped with the current time
    pub fn new(
        unique_id: impl Into<String>,
        user_id: impl Into<String>,
        query: impl Into<String>,
        model_response: Option<String>,
        query_topic: Option<String>,
    ) -> Self {
        Self::at(Utc::now(), unique_id, user_id, query, model_response, query_topic)
    }

    /// Creates a record stamped with `now`
    pub fn at(
        now: DateTime<Utc>,
        unique_id: impl Into<String>,
        user_id: impl Into<String>,
        query: impl Into<String>,
        model_response: Option<String>,
        query_topic: Option<String>,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            user_id: user_id.into(),
            query: query.into(),
            model_response,
            query_topic,
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            was_copied: 0,
            was_liked: None,
        }
    }

    /// Encodes the record as a DynamoDB attribute map.
    ///
    /// Absent values are written as explicit `NULL` attributes so every
    /// record carries the same set of keys.
    pub fn to_dynamo_item(&self) -> Map<String, Value> {
        let mut item = Map::new();
        item.insert("unique_id".to_string(), string_attr(&self.unique_id));
        item.insert("user_id".to_string(), string_attr(&self.user_id));
        item.insert("query".to_string(), string_attr(&self.query));
        item.insert(
            "model_response".to_string(),
            optional_string_attr(self.model_response.as_deref()),
        );
        item.insert(
            "query_topic".to_string(),
            optional_string_attr(self.query_topic.as_deref()),
        );
        item.insert("timestamp".to_string(), string_attr(&self.timestamp));
        item.insert(
            "was_copied".to_string(),
            json!({ "N": self.was_copied.to_string() }),
        );
        item.insert(
            "was_liked".to_string(),
            match self.was_liked {
                Some(liked) => json!({ "BOOL": liked }),
                None => null_attr(),
            },
        );
        item
    }
}

fn string_attr(value: &str) -> Value {
    json!({ "S": value })
}

fn optional_string_attr(value: Option<&str>) -> Value {
    value.map(string_attr).unwrap_or_else(null_attr)
}

fn null_attr() -> Value {
    json!({ "NULL": true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_record_defaults() {
        let record = AuditRecord::new("id-1", "u1", "What is X?", Some("X is a widget.".into()), None);

        assert_eq!(record.was_copied, 0);
        assert_eq!(record.was_liked, None);
        assert_eq!(record.query_topic, None);
        // YYYY-MM-DD:HH-MM
        assert_eq!(record.timestamp.len(), 16);
        assert_eq!(&record.timestamp[10..11], ":");
    }

    #[test]
    fn test_timestamp_has_minute_granularity() {
        let now = Utc.with_ymd_and_hms(2024, 5, 3, 14, 7, 59).unwrap();
        let record = AuditRecord::at(now, "id-1", "u1", "q", None, None);
        assert_eq!(record.timestamp, "2024-05-03:14-07");
    }

    #[test]
    fn test_dynamo_item_encoding() {
        let now = Utc.with_ymd_and_hms(2024, 5, 3, 14, 7, 0).unwrap();
        let record = AuditRecord::at(
            now,
            "id-1",
            "u1",
            "What is X?",
            Some("X is a widget used for Y.".into()),
            Some("definitions".into()),
        );

        let item = Value::Object(record.to_dynamo_item());
        assert_eq!(
            item,
            json!({
                "unique_id": {"S": "id-1"},
                "user_id": {"S": "u1"},
                "query": {"S": "What is X?"},
                "model_response": {"S": "X is a widget used for Y."},
                "query_topic": {"S": "definitions"},
                "timestamp": {"S": "2024-05-03:14-07"},
                "was_copied": {"N": "0"},
                "was_liked": {"NULL": true}
            })
        );
    }

    #[test]
    fn test_dynamo_item_writes_missing_fields_as_null() {
        let record = AuditRecord::new("id-2", "u2", "q", None, None);
        let item = record.to_dynamo_item();
        assert_eq!(item["model_response"], json!({"NULL": true}));
        assert_eq!(item["query_topic"], json!({"NULL": true}));
    }
}
