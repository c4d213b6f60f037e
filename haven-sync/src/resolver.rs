//! # Conflict Resolver Registry
//!
//! Per-collection strategies deciding what happens when a queued mutation
//! meets a remote record that changed underneath it. Resolvers are pure
//! functions of `(local, remote)`: identical inputs must yield identical
//! outputs, which keeps queue replay safe and makes the policies directly
//! testable.
//!
//! Collections without a registered resolver fall back to "remote wins":
//! the queued mutation is discarded without touching the server.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

/// Outcome of resolving one queued mutation against remote state
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Apply the queued mutation as-is
    Local,
    /// Discard the queued mutation; the remote copy stands
    Remote,
    /// Send this payload instead of the original
    Merge(Value),
}

/// The queued side of a conflict
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVersion {
    pub payload: Value,
    /// Enqueue timestamp in milliseconds
    pub enqueued_at: i64,
}

/// The remote side of a conflict
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteVersion {
    pub payload: Value,
    /// Remote last-modified timestamp in milliseconds, when the record
    /// carries one
    pub updated_at: Option<i64>,
}

/// A per-collection conflict strategy.
///
/// Implementations must be deterministic. Returning an error (typically
/// [`SyncError::Conflict`](crate::SyncError::Conflict)) refuses the write
/// outright and routes the item through the retry controller instead of
/// resolving it — audit-sensitive collections use this to surface
/// conflicting writes rather than hide them.
pub trait ConflictResolver: Send + Sync {
    fn resolve(&self, local: &LocalVersion, remote: &RemoteVersion) -> Result<Resolution>;
}

/// Discard the queued mutation whenever the record already exists remotely
#[derive(Debug, Default)]
pub struct RemoteWins;

impl ConflictResolver for RemoteWins {
    fn resolve(&self, _local: &LocalVersion, _remote: &RemoteVersion) -> Result<Resolution> {
        Ok(Resolution::Remote)
    }
}

/// Always apply the queued mutation
#[derive(Debug, Default)]
pub struct LocalWins;

impl ConflictResolver for LocalWins {
    fn resolve(&self, _local: &LocalVersion, _remote: &RemoteVersion) -> Result<Resolution> {
        Ok(Resolution::Local)
    }
}

/// Newest timestamp wins; a remote record without a timestamp loses
#[derive(Debug, Default)]
pub struct LastWriteWins;

impl ConflictResolver for LastWriteWins {
    fn resolve(&self, local: &LocalVersion, remote: &RemoteVersion) -> Result<Resolution> {
        match remote.updated_at {
            Some(updated_at) if updated_at > local.enqueued_at => Ok(Resolution::Remote),
            _ => Ok(Resolution::Local),
        }
    }
}

/// Collection-keyed resolver lookup.
///
/// Registered once at startup and read-only afterwards, so pass-time
/// lookups need no locking.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<String, Arc<dyn ConflictResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the strategy for a collection, replacing any previous one
    pub fn register(&mut self, collection: impl Into<String>, resolver: Arc<dyn ConflictResolver>) {
        self.resolvers.insert(collection.into(), resolver);
    }

    /// Whether a collection has its own strategy
    pub fn contains(&self, collection: &str) -> bool {
        self.resolvers.contains_key(collection)
    }

    /// Resolve a conflict for a collection, falling back to remote-wins
    pub fn resolve(
        &self,
        collection: &str,
        local: &LocalVersion,
        remote: &RemoteVersion,
    ) -> Result<Resolution> {
        match self.resolvers.get(collection) {
            Some(resolver) => resolver.resolve(local, remote),
            None => Ok(Resolution::Remote),
        }
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("collections", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}
