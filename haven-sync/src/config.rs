//! # Sync Configuration
//!
//! Defaults overlaid by an optional TOML file. The sync interval is a
//! per-deployment choice: seconds for interactive queues, minutes for
//! batch ledger sync.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::RetryPolicy;
use crate::error::{Result, SyncError};

/// Engine and trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Retry budget per queue item before it fails terminally
    pub max_retries: u32,
    /// Periodic trigger interval in seconds
    pub sync_interval_secs: u64,
    /// Queue capacity bound
    pub max_queue_size: usize,
    /// Reachability probe endpoint; `None` disables the probe
    pub probe_url: Option<String>,
    /// Probe interval in seconds
    pub probe_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            sync_interval_secs: 30,
            max_queue_size: 1000,
            probe_url: None,
            probe_interval_secs: 15,
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            SyncError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }
}
