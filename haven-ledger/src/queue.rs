//! Validate-then-enqueue front for ledger mutations.

use std::sync::Arc;

use haven_sync::{Operation, QueueItem, Result, SyncQueue};

use crate::entry::{validate_entry, LedgerEntry};
use crate::LEDGER_COLLECTION;

/// Ledger-facing wrapper over the generic queue.
///
/// Every mutation passes the balanced-entry gate before it is persisted;
/// a rejected entry never appears in the pending count and is never
/// retried.
#[derive(Debug, Clone)]
pub struct LedgerQueue {
    queue: Arc<SyncQueue>,
}

impl LedgerQueue {
    pub fn new(queue: Arc<SyncQueue>) -> Self {
        Self { queue }
    }

    /// Validate and enqueue a ledger mutation, returning the queue item id
    pub async fn enqueue(&self, operation: Operation, entry: &LedgerEntry) -> Result<String> {
        validate_entry(entry)?;
        let payload = serde_json::to_value(entry)?;
        self.queue.enqueue(operation, LEDGER_COLLECTION, payload).await
    }

    /// Ledger mutations waiting for the next pass
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self
            .queue
            .list_by_status(haven_sync::ItemStatus::Pending)
            .await?
            .into_iter()
            .filter(|item| item.collection == LEDGER_COLLECTION)
            .count())
    }

    /// Terminally failed ledger mutations awaiting the finance team
    pub async fn failed_items(&self) -> Result<Vec<QueueItem>> {
        Ok(self
            .queue
            .failed_items()
            .await?
            .into_iter()
            .filter(|item| item.collection == LEDGER_COLLECTION)
            .collect())
    }

    /// The underlying generic queue
    pub fn inner(&self) -> &Arc<SyncQueue> {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use haven_sync::{MemoryStore, SyncError};

    use crate::entry::LedgerLine;

    fn ledger_queue() -> LedgerQueue {
        LedgerQueue::new(Arc::new(SyncQueue::new(Arc::new(MemoryStore::new()))))
    }

    fn entry(lines: Vec<LedgerLine>) -> LedgerEntry {
        LedgerEntry {
            id: "je-1".to_string(),
            home_id: "home-1".to_string(),
            memo: String::new(),
            posted_at: Utc::now(),
            lines,
        }
    }

    #[tokio::test]
    async fn test_balanced_entry_is_queued() {
        let queue = ledger_queue();
        let entry = entry(vec![
            LedgerLine::debit("cash", 50_00),
            LedgerLine::credit("fees", 50_00),
        ]);

        let id = queue.enqueue(Operation::Create, &entry).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unbalanced_entry_never_enters_the_queue() {
        let queue = ledger_queue();
        let entry = entry(vec![
            LedgerLine::debit("cash", 50_00),
            LedgerLine::credit("fees", 49_00),
        ]);

        let result = queue.enqueue(Operation::Create, &entry).await;
        assert!(matches!(result, Err(SyncError::Validation(_))));
        assert_eq!(queue.pending_count().await.unwrap(), 0);
        assert_eq!(queue.inner().size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pending_count_ignores_other_collections() {
        let queue = ledger_queue();
        queue
            .inner()
            .enqueue(
                Operation::Create,
                "residents",
                serde_json::json!({"id": "res-1"}),
            )
            .await
            .unwrap();

        assert_eq!(queue.pending_count().await.unwrap(), 0);
    }
}
