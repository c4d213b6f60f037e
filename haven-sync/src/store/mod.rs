//! # Durable Store
//!
//! Abstract keyed persistence for the mutation queue. The queue core only
//! needs put/get/list/delete over opaque bytes; concrete backends decide
//! where those bytes live (an embedded SQLite file in production, a plain
//! map for tests and ephemeral sessions).

use async_trait::async_trait;

use crate::error::Result;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Keyed persistence contract for queue records.
///
/// All operations are atomic with respect to a single key. Implementations
/// must be safe to call concurrently from the enqueue path and from a sync
/// pass iterating a snapshot.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Store a value under a key, replacing any previous value
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Fetch the value stored under a key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Return all stored values
    async fn list(&self) -> Result<Vec<Vec<u8>>>;

    /// Remove a key; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key
    async fn clear(&self) -> Result<()>;
}
