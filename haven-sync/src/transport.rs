//! # Remote Authority Transport
//!
//! Read-before-write fetches and the actual create/update/delete calls
//! against the server-side canonical store. The engine only sees the
//! [`RemoteAuthority`] trait; [`HttpRemote`] implements it over the
//! platform's REST protocol (`/api/{collection}/{id}`).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SyncError};

/// Current remote state of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    pub payload: Value,
    /// Last-modified timestamp in milliseconds, when the record carries a
    /// `updatedAt` field
    pub updated_at: Option<i64>,
}

impl RemoteRecord {
    pub fn new(payload: Value) -> Self {
        let updated_at = payload.get("updatedAt").and_then(Value::as_i64);
        Self {
            payload,
            updated_at,
        }
    }
}

/// The server-side canonical store for a collection, seen through its
/// CRUD protocol
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Current remote record, or `None` when the entity does not exist
    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<RemoteRecord>>;

    /// Create a new record
    async fn create(&self, collection: &str, payload: &Value) -> Result<()>;

    /// Replace an existing record; idempotent for the same id
    async fn update(&self, collection: &str, id: &str, payload: &Value) -> Result<()>;

    /// Delete a record
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// REST client for the remote authority
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    /// Create a client for the given base URL (e.g. `https://api.haven.example`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing reqwest client
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/api/{}", self.base_url, collection)
    }

    fn entity_url(&self, collection: &str, id: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, collection, id)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(SyncError::Remote { status, message })
    }
}

#[async_trait]
impl RemoteAuthority for HttpRemote {
    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<RemoteRecord>> {
        let response = self
            .client
            .get(self.entity_url(collection, id))
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::ensure_success(response).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Ok(Some(RemoteRecord::new(payload)))
    }

    async fn create(&self, collection: &str, payload: &Value) -> Result<()> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .json(payload)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, payload: &Value) -> Result<()> {
        let response = self
            .client
            .put(self.entity_url(collection, id))
            .json(payload)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.entity_url(collection, id))
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
