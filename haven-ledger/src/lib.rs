//! # Haven Ledger Sync
//!
//! Audit-hardened specialization of the generic offline sync engine for
//! care-home finance. Three things separate it from the generic core:
//!
//! - Mutations are validated against the double-entry schema *before*
//!   they enter the queue (balanced debits/credits, valid references).
//! - Conflicts are never resolved silently: when the server copy is newer
//!   than the queued mutation the write is rejected with a conflict error
//!   and ends up in the failed-items view.
//! - Confirmed syncs invalidate the cached balance aggregates dashboards
//!   read from.

use std::sync::Arc;

use haven_sync::{ResolverRegistry, SyncEngine};

mod cache;
mod entry;
mod queue;
mod resolver;

pub use cache::{BalanceCache, BalanceInvalidationHook};
pub use entry::{validate_entry, LedgerEntry, LedgerLine, MIN_LINES};
pub use queue::LedgerQueue;
pub use resolver::LedgerResolver;

/// Collection the ledger syncs against
pub const LEDGER_COLLECTION: &str = "ledger-entries";

/// Register the ledger's stale-write rejection policy.
///
/// Call while building the registry, before the engine is constructed.
pub fn register_resolver(registry: &mut ResolverRegistry) {
    registry.register(LEDGER_COLLECTION, Arc::new(LedgerResolver));
}

/// Register the post-sync balance invalidation hook.
///
/// Call during startup wiring, before the engine is shared.
pub fn register_invalidation(engine: &mut SyncEngine, cache: Arc<BalanceCache>) {
    engine.register_hook(LEDGER_COLLECTION, Arc::new(BalanceInvalidationHook::new(cache)));
}
