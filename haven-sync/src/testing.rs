//! In-memory fakes for exercising the engine without a server. Used by
//! this crate's own tests and by downstream crates' tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::transport::{RemoteAuthority, RemoteRecord};

/// Scriptable in-memory remote authority.
///
/// Stores records per `(collection, id)`, records every call, and injects
/// failures on demand: `fail_always` models a dead link, `fail_next(n)`
/// models a flaky one, `set_latency` slows calls down so tests can observe
/// an in-flight pass.
#[derive(Default)]
pub struct MockRemote {
    records: Mutex<HashMap<(String, String), Value>>,
    calls: Mutex<Vec<String>>,
    fail_always: AtomicBool,
    fail_remaining: AtomicU32,
    latency: Mutex<Option<Duration>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a remote record
    pub async fn insert(&self, collection: &str, id: &str, payload: Value) {
        self.records
            .lock()
            .await
            .insert((collection.to_string(), id.to_string()), payload);
    }

    /// Current remote state of one entity
    pub async fn record(&self, collection: &str, id: &str) -> Option<Value> {
        self.records
            .lock()
            .await
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    /// Number of records in a collection
    pub async fn collection_len(&self, collection: &str) -> usize {
        self.records
            .lock()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }

    /// Every call made so far, e.g. `"PUT residents/res-1"`
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Fail every call until turned off
    pub fn fail_always(&self, fail: bool) {
        self.fail_always.store(fail, Ordering::SeqCst);
    }

    /// Fail the next `n` calls, then recover
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Delay every call by the given duration
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().await = latency;
    }

    async fn observe(&self, call: String) -> Result<()> {
        self.calls.lock().await.push(call);

        let latency = *self.latency.lock().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_always.load(Ordering::SeqCst) {
            return Err(SyncError::Network("injected failure".to_string()));
        }

        let took_budget = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if took_budget {
            return Err(SyncError::Network("injected failure".to_string()));
        }

        Ok(())
    }

    fn payload_id(payload: &Value) -> String {
        match payload.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl RemoteAuthority for MockRemote {
    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<RemoteRecord>> {
        self.observe(format!("GET {}/{}", collection, id)).await?;
        Ok(self
            .record(collection, id)
            .await
            .map(RemoteRecord::new))
    }

    async fn create(&self, collection: &str, payload: &Value) -> Result<()> {
        let id = Self::payload_id(payload);
        self.observe(format!("POST {} ({})", collection, id)).await?;
        self.insert(collection, &id, payload.clone()).await;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, payload: &Value) -> Result<()> {
        self.observe(format!("PUT {}/{}", collection, id)).await?;
        self.insert(collection, id, payload.clone()).await;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.observe(format!("DELETE {}/{}", collection, id)).await?;
        let removed = self
            .records
            .lock()
            .await
            .remove(&(collection.to_string(), id.to_string()));
        if removed.is_none() {
            return Err(SyncError::Remote {
                status: 404,
                message: format!("{}/{} not found", collection, id),
            });
        }
        Ok(())
    }
}
