//! # Connectivity & Schedule Triggers
//!
//! Two things start a sync pass: an offline→online transition and a
//! periodic timer. The timer runs regardless of transitions — it covers
//! missed or ambiguous connectivity signals. Going offline never cancels
//! an in-flight pass; the next remote call inside that pass fails and the
//! retry controller takes it from there.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::engine::SyncEngine;

/// Source of online/offline transitions.
///
/// Abstracts over whatever reachability signal the host has: a manual
/// switch, an HTTP probe, or a platform network monitor.
pub trait ConnectivityObserver: Send + Sync {
    /// Subscribe to the current connectivity state; `true` means online
    fn watch(&self) -> watch::Receiver<bool>;
}

/// Host-driven connectivity switch.
///
/// Useful in tests and in hosts that already know when the network comes
/// and goes.
#[derive(Debug)]
pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    pub fn set_online(&self, online: bool) {
        let previous = self.tx.send_replace(online);
        if previous != online {
            debug!(target: "connectivity", online, "connectivity changed");
        }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }
}

impl ConnectivityObserver for ManualConnectivity {
    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Reachability prober.
///
/// Periodically issues a HEAD request against a known endpoint and
/// publishes transitions. Starts pessimistic (offline) until the first
/// probe succeeds.
pub struct HttpProbeConnectivity {
    tx: watch::Sender<bool>,
    client: reqwest::Client,
    probe_url: String,
    probe_interval: Duration,
}

impl HttpProbeConnectivity {
    pub fn new(probe_url: impl Into<String>, probe_interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx,
            client: reqwest::Client::new(),
            probe_url: probe_url.into(),
            probe_interval,
        }
    }

    /// Start the background probe loop
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.probe_interval);
            loop {
                ticker.tick().await;

                let online = self
                    .client
                    .head(&self.probe_url)
                    .send()
                    .await
                    .map(|response| response.status().is_success())
                    .unwrap_or(false);

                let previous = self.tx.send_replace(online);
                if previous != online {
                    info!(target: "connectivity", online, "connectivity changed");
                }
            }
        })
    }
}

impl ConnectivityObserver for HttpProbeConnectivity {
    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Background task invoking sync passes on reconnect and on a fixed
/// interval. Both paths go through [`SyncEngine::sync_now`] and rely on
/// its single-flight coalescing.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    sync_interval: Duration,
    shutdown_tx: std::sync::Mutex<Option<mpsc::Sender<()>>>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, sync_interval: Duration) -> Self {
        Self {
            engine,
            sync_interval,
            shutdown_tx: std::sync::Mutex::new(None),
        }
    }

    /// Start the scheduler loop.
    ///
    /// The first interval tick fires immediately, so spawning also drains
    /// whatever accumulated while the process was down.
    pub fn spawn(&self, observer: &dyn ConnectivityObserver) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let sync_interval = self.sync_interval;
        let mut connectivity = observer.watch();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        if let Ok(mut guard) = self.shutdown_tx.lock() {
            *guard = Some(shutdown_tx);
        }

        tokio::spawn(async move {
            let mut ticker = interval(sync_interval);
            let mut online = *connectivity.borrow();
            let mut observer_open = true;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = engine.sync_now().await {
                            error!(target: "sync_scheduler", "scheduled sync pass failed: {}", e);
                        }
                    }
                    changed = connectivity.changed(), if observer_open => {
                        match changed {
                            Ok(()) => {
                                let now_online = *connectivity.borrow_and_update();
                                if now_online && !online {
                                    info!(target: "sync_scheduler", "connectivity restored, triggering sync");
                                    if let Err(e) = engine.sync_now().await {
                                        error!(target: "sync_scheduler", "reconnect sync pass failed: {}", e);
                                    }
                                }
                                online = now_online;
                            }
                            Err(_) => {
                                // Observer dropped; periodic ticks keep the queue draining.
                                debug!(target: "sync_scheduler", "connectivity observer closed");
                                observer_open = false;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!(target: "sync_scheduler", "scheduler stopped");
                        return;
                    }
                }
            }
        })
    }

    /// Stop the scheduler loop
    pub fn stop(&self) {
        if let Ok(mut guard) = self.shutdown_tx.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.try_send(());
            }
        }
    }
}

impl std::fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("sync_interval", &self.sync_interval)
            .finish_non_exhaustive()
    }
}
