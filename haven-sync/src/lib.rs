//! # Haven Sync
//!
//! Client-resident offline synchronization engine for the Haven care-home
//! platform. Users keep working while disconnected; their mutations land
//! in a durable queue and are reconciled against the remote authority once
//! connectivity returns, including conflict detection and resolution.
//!
//! ## Architecture
//!
//! - **Store**: keyed persistence behind [`store::DurableStore`] (SQLite
//!   in production, a map for tests)
//! - **Queue**: ordered, persisted log of pending mutations
//! - **Resolver**: per-collection conflict strategies with a remote-wins
//!   default
//! - **Transport**: the remote authority's CRUD protocol behind
//!   [`transport::RemoteAuthority`]
//! - **Engine**: single-flight sync passes with retry bookkeeping
//! - **Trigger**: reconnect events and a periodic timer
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use haven_sync::{
//!     HttpRemote, Operation, ResolverRegistry, RetryPolicy, SqliteStore,
//!     SyncEngine, SyncQueue,
//! };
//!
//! # async fn example() -> haven_sync::Result<()> {
//! let store = Arc::new(SqliteStore::open("haven-sync.db")?);
//! let queue = Arc::new(SyncQueue::new(store));
//! let remote = Arc::new(HttpRemote::new("https://api.haven.example"));
//! let engine = SyncEngine::new(
//!     queue.clone(),
//!     remote,
//!     ResolverRegistry::new(),
//!     RetryPolicy::default(),
//! );
//!
//! queue
//!     .enqueue(
//!         Operation::Update,
//!         "residents",
//!         serde_json::json!({"id": "res-17", "room": "B12"}),
//!     )
//!     .await?;
//! engine.sync_now().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod queue;
pub mod resolver;
pub mod store;
pub mod transport;
pub mod trigger;

pub mod testing;

pub use config::SyncConfig;
pub use engine::{PassOutcome, PassSummary, RetryPolicy, SyncEngine, SyncHook};
pub use error::{Result, SyncError};
pub use queue::{ItemStatus, Operation, QueueItem, SyncQueue};
pub use resolver::{
    ConflictResolver, LastWriteWins, LocalVersion, LocalWins, RemoteVersion, RemoteWins,
    Resolution, ResolverRegistry,
};
pub use store::{DurableStore, MemoryStore, SqliteStore};
pub use transport::{HttpRemote, RemoteAuthority, RemoteRecord};
pub use trigger::{ConnectivityObserver, HttpProbeConnectivity, ManualConnectivity, SyncScheduler};
