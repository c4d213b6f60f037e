//! # Sync Pass Orchestrator
//!
//! Drains the durable queue against the remote authority. A pass snapshots
//! the pending set, then for each item in enqueue order: mark it in
//! progress, fetch the current remote record, run conflict resolution,
//! execute the resolved operation, and either remove the item or hand it
//! to the retry controller. At most one pass runs per engine instance;
//! triggers arriving mid-pass are coalesced into no-ops.
//!
//! Items are processed sequentially. Two updates to the same entity must
//! never execute out of enqueue order, so there is no per-item parallelism
//! inside a pass, and once a mutation for an entity fails, later mutations
//! for that entity are deferred to the next pass rather than jumping the
//! failed one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::queue::{ItemStatus, Operation, QueueItem, SyncQueue};
use crate::resolver::{LocalVersion, RemoteVersion, Resolution, ResolverRegistry};
use crate::transport::RemoteAuthority;

/// Bounds retries per item and promotes exhausted items to terminal
/// `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 5 }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Whether an item with this many failed attempts is out of budget
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}

/// Post-success extension point.
///
/// Hooks run after an item has been confirmed applied remotely and removed
/// from the queue. Collection-specific side effects (the ledger's balance
/// cache invalidation) live here instead of in the generic core.
#[async_trait]
pub trait SyncHook: Send + Sync {
    async fn on_success(&self, item: &QueueItem);
}

/// Counters for one completed pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Items in the pass snapshot
    pub attempted: usize,
    /// Confirmed applied and removed
    pub synced: usize,
    /// Dropped because the resolver chose the remote copy
    pub discarded: usize,
    /// Returned to `Pending` for the next pass
    pub retried: usize,
    /// Left untouched because an earlier mutation for the same entity
    /// failed in this pass
    pub deferred: usize,
    /// Promoted to terminal `Failed`
    pub failed: usize,
}

/// Result of a sync trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The pass ran to completion over its snapshot
    Completed(PassSummary),
    /// Another pass was already running; this trigger was coalesced
    Skipped,
}

enum ItemOutcome {
    Applied,
    Discarded,
}

/// Orchestrates sync passes over a queue, a remote authority, and a
/// resolver registry
pub struct SyncEngine {
    queue: Arc<SyncQueue>,
    remote: Arc<dyn RemoteAuthority>,
    resolvers: ResolverRegistry,
    retry: RetryPolicy,
    hooks: HashMap<String, Vec<Arc<dyn SyncHook>>>,
    pass_guard: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<SyncQueue>,
        remote: Arc<dyn RemoteAuthority>,
        resolvers: ResolverRegistry,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            queue,
            remote,
            resolvers,
            retry,
            hooks: HashMap::new(),
            pass_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Register a post-success hook for a collection. Call during startup
    /// wiring, before the engine is shared.
    pub fn register_hook(&mut self, collection: impl Into<String>, hook: Arc<dyn SyncHook>) {
        self.hooks.entry(collection.into()).or_default().push(hook);
    }

    /// The queue this engine drains
    pub fn queue(&self) -> &Arc<SyncQueue> {
        &self.queue
    }

    /// Number of items waiting for the next pass
    pub async fn pending_count(&self) -> Result<usize> {
        self.queue.pending_count().await
    }

    /// Terminally failed items awaiting operator attention
    pub async fn failed_items(&self) -> Result<Vec<QueueItem>> {
        self.queue.failed_items().await
    }

    /// Run one sync pass now.
    ///
    /// Single-flight: when a pass is already running the trigger returns
    /// [`PassOutcome::Skipped`] immediately — passes are coalesced, never
    /// queued or run concurrently. Manual and automatic triggers share
    /// these semantics.
    pub async fn sync_now(&self) -> Result<PassOutcome> {
        let _guard = match self.pass_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(target: "sync_engine", "sync pass already running, trigger coalesced");
                return Ok(PassOutcome::Skipped);
            }
        };

        // Snapshot: enqueues racing this pass are picked up next pass.
        let snapshot = self.queue.list_by_status(ItemStatus::Pending).await?;
        let mut summary = PassSummary {
            attempted: snapshot.len(),
            ..Default::default()
        };

        if snapshot.is_empty() {
            return Ok(PassOutcome::Completed(summary));
        }

        debug!(target: "sync_engine", items = snapshot.len(), "sync pass started");

        // Entities with a failed mutation this pass. Later mutations for
        // the same entity must wait for the retry, or a stale retry would
        // overwrite them out of enqueue order.
        let mut blocked: HashSet<(String, String)> = HashSet::new();

        for item in snapshot {
            if let Some(key) = item.entity_key() {
                if blocked.contains(&(item.collection.clone(), key)) {
                    summary.deferred += 1;
                    debug!(
                        target: "sync_engine",
                        id = %item.id,
                        "earlier mutation for this entity failed, deferred to next pass"
                    );
                    continue;
                }
            }

            self.queue
                .update_status(&item.id, ItemStatus::InProgress, None, None)
                .await?;

            match self.process_item(&item).await {
                Ok(ItemOutcome::Applied) => {
                    self.queue.remove(&item.id).await?;
                    self.run_hooks(&item).await;
                    summary.synced += 1;
                    debug!(target: "sync_engine", id = %item.id, "item applied remotely");
                }
                Ok(ItemOutcome::Discarded) => {
                    self.queue.remove(&item.id).await?;
                    summary.discarded += 1;
                    debug!(target: "sync_engine", id = %item.id, "remote wins, local mutation discarded");
                }
                Err(error) => {
                    if let Some(key) = item.entity_key() {
                        blocked.insert((item.collection.clone(), key));
                    }
                    let retries = item.retry_count + 1;
                    if self.retry.is_exhausted(retries) {
                        warn!(
                            target: "sync_engine",
                            id = %item.id,
                            retries,
                            %error,
                            "retry budget exhausted, item failed terminally"
                        );
                        self.queue
                            .update_status(
                                &item.id,
                                ItemStatus::Failed,
                                Some(retries),
                                Some(error.to_string()),
                            )
                            .await?;
                        summary.failed += 1;
                    } else {
                        debug!(target: "sync_engine", id = %item.id, retries, %error, "item will be retried");
                        self.queue
                            .update_status(&item.id, ItemStatus::Pending, Some(retries), None)
                            .await?;
                        summary.retried += 1;
                    }
                }
            }
        }

        info!(
            target: "sync_engine",
            attempted = summary.attempted,
            synced = summary.synced,
            discarded = summary.discarded,
            retried = summary.retried,
            deferred = summary.deferred,
            failed = summary.failed,
            "sync pass finished"
        );

        Ok(PassOutcome::Completed(summary))
    }

    async fn process_item(&self, item: &QueueItem) -> Result<ItemOutcome> {
        let entity_key = item.entity_key();

        let remote_record = match &entity_key {
            Some(key) => self.remote.fetch(&item.collection, key).await?,
            None => None,
        };

        // A delete whose target is already gone has nothing left to do.
        if item.operation == Operation::Delete && entity_key.is_some() && remote_record.is_none() {
            return Ok(ItemOutcome::Applied);
        }

        let payload = match &remote_record {
            Some(record) => {
                let local = LocalVersion {
                    payload: item.data.clone(),
                    enqueued_at: item.timestamp,
                };
                let remote = RemoteVersion {
                    payload: record.payload.clone(),
                    updated_at: record.updated_at,
                };
                match self.resolvers.resolve(&item.collection, &local, &remote)? {
                    Resolution::Remote => return Ok(ItemOutcome::Discarded),
                    Resolution::Local => item.data.clone(),
                    Resolution::Merge(merged) => merged,
                }
            }
            None => item.data.clone(),
        };

        // A create whose record already exists becomes an update, so the
        // same id enqueued twice can never duplicate the entity.
        let operation = if item.operation == Operation::Create && remote_record.is_some() {
            Operation::Update
        } else {
            item.operation
        };

        self.execute(operation, &item.collection, entity_key.as_deref(), &payload)
            .await?;

        Ok(ItemOutcome::Applied)
    }

    async fn execute(
        &self,
        operation: Operation,
        collection: &str,
        entity_key: Option<&str>,
        payload: &Value,
    ) -> Result<()> {
        match operation {
            Operation::Create => self.remote.create(collection, payload).await,
            Operation::Update => {
                let key = entity_key.ok_or_else(|| {
                    SyncError::InvalidInput(format!(
                        "update payload for {} has no entity id",
                        collection
                    ))
                })?;
                self.remote.update(collection, key, payload).await
            }
            Operation::Delete => {
                let key = entity_key.ok_or_else(|| {
                    SyncError::InvalidInput(format!(
                        "delete payload for {} has no entity id",
                        collection
                    ))
                })?;
                self.remote.delete(collection, key).await
            }
        }
    }

    async fn run_hooks(&self, item: &QueueItem) {
        if let Some(hooks) = self.hooks.get(&item.collection) {
            for hook in hooks {
                hook.on_success(item).await;
            }
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("retry", &self.retry)
            .field("resolvers", &self.resolvers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_exhaustion() {
        let policy = RetryPolicy::new(3);
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
        assert!(policy.is_exhausted(4));
    }

    #[test]
    fn test_default_retry_budget() {
        assert_eq!(RetryPolicy::default().max_retries, 5);
    }
}
