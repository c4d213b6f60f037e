//! Queue record types. The serialized form is the persisted wire format
//! shared with the dashboard clients, so field names stay camelCase and
//! enum values stay SCREAMING_SNAKE_CASE.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Mutation kind carried by a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// POST a new record
    Create,
    /// PUT over an existing record
    Update,
    /// DELETE an existing record
    Delete,
}

/// Lifecycle state of a queue item
///
/// Items move `Pending -> InProgress -> {removed | Pending | Failed}`.
/// `Failed` is terminal: nothing transitions out of it except an explicit
/// operator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Waiting for the next sync pass
    Pending,
    /// Currently being applied to the remote authority
    InProgress,
    /// Retry budget exhausted; excluded from automatic passes
    Failed,
}

/// A pending mutation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Unique identifier, stable across retries
    pub id: String,
    /// Mutation kind
    pub operation: Operation,
    /// Target resource type / handler
    pub collection: String,
    /// Collection-defined payload; the core never interprets it beyond
    /// the optional entity key
    pub data: Value,
    /// Enqueue timestamp in milliseconds, strictly monotonic per queue
    pub timestamp: i64,
    /// Failed attempt count
    #[serde(default)]
    pub retry_count: u32,
    /// Current lifecycle state
    pub status: ItemStatus,
    /// Diagnostic message, set only when the item is `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueueItem {
    /// Create a new pending item with a fresh id
    pub fn new(operation: Operation, collection: impl Into<String>, data: Value, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operation,
            collection: collection.into(),
            data,
            timestamp,
            retry_count: 0,
            status: ItemStatus::Pending,
            error: None,
        }
    }

    /// The entity address used for remote reads and PUT/DELETE routing.
    ///
    /// Collections address entities through the payload's `id` field;
    /// payloads without one (opaque create bodies) skip the remote read.
    pub fn entity_key(&self) -> Option<String> {
        match self.data.get("id") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Check whether the retry budget is exhausted
    pub fn exceeded_max_retries(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_persisted_record_format() {
        let mut item = QueueItem::new(
            Operation::Update,
            "residents",
            json!({"id": "res-1", "room": "B12"}),
            1_700_000_000_000,
        );
        item.retry_count = 2;

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["operation"], "UPDATE");
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["collection"], "residents");
        assert_eq!(value["timestamp"], 1_700_000_000_000_i64);
        assert_eq!(value["retryCount"], 2);
        // error is omitted until the item fails
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failed_record_carries_error() {
        let mut item = QueueItem::new(Operation::Delete, "residents", json!({"id": "res-1"}), 1);
        item.status = ItemStatus::Failed;
        item.error = Some("Network error: timeout".to_string());

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["status"], "FAILED");
        assert_eq!(value["error"], "Network error: timeout");

        let back: QueueItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_entity_key() {
        let with_string = QueueItem::new(Operation::Update, "residents", json!({"id": "res-9"}), 1);
        assert_eq!(with_string.entity_key(), Some("res-9".to_string()));

        let with_number = QueueItem::new(Operation::Update, "rooms", json!({"id": 42}), 1);
        assert_eq!(with_number.entity_key(), Some("42".to_string()));

        let without = QueueItem::new(Operation::Create, "notes", json!({"text": "hi"}), 1);
        assert_eq!(without.entity_key(), None);
    }
}
