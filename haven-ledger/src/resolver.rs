//! Stale-write rejection for the ledger collection.
//!
//! Financial records must surface conflicting writes, not hide them: when
//! the server copy is newer than the queued mutation, the resolver refuses
//! outright instead of picking a side or merging. The refusal runs the
//! item through the retry controller and ends in a terminal `Failed` the
//! finance team has to look at.

use haven_sync::{ConflictResolver, LocalVersion, RemoteVersion, Resolution, Result, SyncError};

/// Reject-if-server-newer conflict policy
#[derive(Debug, Default)]
pub struct LedgerResolver;

impl ConflictResolver for LedgerResolver {
    fn resolve(&self, local: &LocalVersion, remote: &RemoteVersion) -> Result<Resolution> {
        if let Some(updated_at) = remote.updated_at {
            if updated_at > local.enqueued_at {
                return Err(SyncError::Conflict(format!(
                    "server has newer version (remote updated {}, local queued {})",
                    updated_at, local.enqueued_at
                )));
            }
        }
        Ok(Resolution::Local)
    }
}
