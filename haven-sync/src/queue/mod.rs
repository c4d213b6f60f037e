//! # Durable Mutation Queue
//!
//! Ordered, persisted log of pending mutations. Callers enqueue while
//! offline and keep working; a sync pass drains the queue once the remote
//! authority is reachable again. Every state change is written through the
//! [`DurableStore`] immediately, so the queue survives process restarts.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::store::DurableStore;

mod clock;
mod item;

pub use item::{ItemStatus, Operation, QueueItem};

use clock::LogicalClock;

/// Default bound on queued mutations
const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// Durable queue over a keyed store
pub struct SyncQueue {
    store: Arc<dyn DurableStore>,
    clock: LogicalClock,
    max_size: usize,
}

impl SyncQueue {
    /// Create a queue over the given store
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            clock: LogicalClock::new(),
            max_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }

    /// Override the queue capacity bound
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Persist a mutation and return its id.
    ///
    /// Returns before any network activity; the caller gets an optimistic
    /// "queued" acknowledgment and the next sync pass does the rest.
    pub async fn enqueue(
        &self,
        operation: Operation,
        collection: &str,
        payload: Value,
    ) -> Result<String> {
        let current = self.size().await?;
        if current >= self.max_size {
            return Err(SyncError::QueueFull(format!(
                "queue holds {} items (max {})",
                current, self.max_size
            )));
        }

        let item = QueueItem::new(operation, collection, payload, self.clock.now_ms());
        self.persist(&item).await?;

        tracing::debug!(
            target: "sync_queue",
            id = %item.id,
            collection = %item.collection,
            queue_size = current + 1,
            "mutation enqueued"
        );

        Ok(item.id)
    }

    /// Fetch a single item by id
    pub async fn get(&self, id: &str) -> Result<Option<QueueItem>> {
        match self.store.get(id).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All items in the given state, ordered by enqueue timestamp ascending
    pub async fn list_by_status(&self, status: ItemStatus) -> Result<Vec<QueueItem>> {
        let mut items: Vec<QueueItem> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|item| item.status == status)
            .collect();
        items.sort_by_key(|item| item.timestamp);
        Ok(items)
    }

    /// Update an item's lifecycle state.
    ///
    /// `retry_count` is overwritten when given; the diagnostic message is
    /// kept only for `Failed` items and cleared on any other transition.
    pub async fn update_status(
        &self,
        id: &str,
        status: ItemStatus,
        retry_count: Option<u32>,
        last_error: Option<String>,
    ) -> Result<()> {
        let mut item = self
            .get(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("queue item {}", id)))?;

        item.status = status;
        if let Some(count) = retry_count {
            item.retry_count = count;
        }
        item.error = match status {
            ItemStatus::Failed => last_error,
            _ => None,
        };

        self.persist(&item).await
    }

    /// Remove an item after confirmed remote application (or discard)
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.store.delete(id).await
    }

    /// Number of items waiting for the next pass
    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.list_by_status(ItemStatus::Pending).await?.len())
    }

    /// Terminally failed items, oldest first
    pub async fn failed_items(&self) -> Result<Vec<QueueItem>> {
        self.list_by_status(ItemStatus::Failed).await
    }

    /// Total number of items in any state
    pub async fn size(&self) -> Result<usize> {
        Ok(self.load_all().await?.len())
    }

    /// Operator action: put a terminally failed item back in play with a
    /// fresh retry budget
    pub async fn retry_failed(&self, id: &str) -> Result<()> {
        let item = self
            .get(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("queue item {}", id)))?;

        if item.status != ItemStatus::Failed {
            return Err(SyncError::InvalidInput(format!(
                "queue item {} is not in a failed state",
                id
            )));
        }

        tracing::info!(target: "sync_queue", id = %id, "failed item requeued by operator");
        self.update_status(id, ItemStatus::Pending, Some(0), None).await
    }

    /// Operator action: drop a terminally failed item
    pub async fn discard_failed(&self, id: &str) -> Result<()> {
        let item = self
            .get(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("queue item {}", id)))?;

        if item.status != ItemStatus::Failed {
            return Err(SyncError::InvalidInput(format!(
                "queue item {} is not in a failed state",
                id
            )));
        }

        tracing::info!(target: "sync_queue", id = %id, "failed item discarded by operator");
        self.remove(id).await
    }

    async fn persist(&self, item: &QueueItem) -> Result<()> {
        let bytes = serde_json::to_vec(item)?;
        self.store.put(&item.id, &bytes).await
    }

    async fn load_all(&self) -> Result<Vec<QueueItem>> {
        let mut items = Vec::new();
        for bytes in self.store.list().await? {
            match serde_json::from_slice::<QueueItem>(&bytes) {
                Ok(item) => items.push(item),
                Err(e) => {
                    // A corrupt record must not wedge the whole queue.
                    tracing::warn!(target: "sync_queue", "skipping unreadable queue record: {}", e);
                }
            }
        }
        Ok(items)
    }
}

impl std::fmt::Debug for SyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncQueue")
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}
