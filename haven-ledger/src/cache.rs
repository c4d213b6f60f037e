//! # Balance Cache
//!
//! Cached per-home balance aggregates. Dashboards read these constantly;
//! recomputing them from the full ledger on every render is too slow, so
//! the variant keeps an LRU of recent aggregates and drops the affected
//! home whenever a ledger mutation is confirmed remotely.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;
use serde_json::Value;
use tracing::debug;

use haven_sync::{QueueItem, SyncHook};

/// Default number of cached home aggregates
const DEFAULT_CAPACITY: usize = 128;

/// LRU cache of per-home balances in cents
pub struct BalanceCache {
    inner: Mutex<LruCache<String, i64>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, i64>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cache a computed aggregate
    pub fn put(&self, home_id: impl Into<String>, balance_cents: i64) {
        self.lock().put(home_id.into(), balance_cents);
    }

    /// Cached aggregate for a home, if still present
    pub fn get(&self, home_id: &str) -> Option<i64> {
        self.lock().get(home_id).copied()
    }

    /// Drop one home's aggregate
    pub fn invalidate(&self, home_id: &str) {
        self.lock().pop(home_id);
    }

    /// Drop everything
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BalanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceCache")
            .field("len", &self.len())
            .finish()
    }
}

/// Post-sync cache invalidation.
///
/// Registered on the engine for the ledger collection; runs after an item
/// is confirmed applied remotely. Items whose payload does not name a home
/// clear the whole cache rather than risk a stale aggregate.
pub struct BalanceInvalidationHook {
    cache: Arc<BalanceCache>,
}

impl BalanceInvalidationHook {
    pub fn new(cache: Arc<BalanceCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl SyncHook for BalanceInvalidationHook {
    async fn on_success(&self, item: &QueueItem) {
        match item.data.get("homeId").and_then(Value::as_str) {
            Some(home_id) => {
                self.cache.invalidate(home_id);
                debug!(target: "ledger", home_id = %home_id, "balance cache invalidated");
            }
            None => {
                self.cache.clear();
                debug!(target: "ledger", "ledger payload without home id, balance cache cleared");
            }
        }
    }
}
