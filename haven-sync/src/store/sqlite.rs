//! # SqliteStore
//!
//! SQLite-backed [`DurableStore`]. SQLite connections are not thread safe,
//! so every operation opens an independent connection inside
//! `spawn_blocking`; the file itself runs in WAL mode so enqueues and a
//! running sync pass never block each other.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, SyncError};
use crate::store::DurableStore;

/// File-backed store for queue records
pub struct SqliteStore {
    db_path: Arc<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = Arc::new(path.as_ref().to_path_buf());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::Storage(format!("Failed to create store directory: {}", e)))?;
        }

        let conn = Self::open_connection(&db_path)?;
        Self::init_schema(&conn)?;
        drop(conn);

        Ok(Self { db_path })
    }

    fn open_connection(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path)
            .map_err(|e| SyncError::Storage(format!("Failed to open store: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA wal_autocheckpoint = 1000;",
        )
        .map_err(|e| SyncError::Storage(format!("Failed to configure WAL: {}", e)))?;

        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS queue_store (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| SyncError::Storage(format!("Failed to create queue_store table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_queue_store_updated ON queue_store(updated_at)",
            [],
        )
        .map_err(|e| SyncError::Storage(format!("Failed to create idx_queue_store_updated: {}", e)))?;

        Ok(())
    }

    fn now_secs() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn db_path(&self) -> PathBuf {
        (*self.db_path).clone()
    }
}

impl Clone for SqliteStore {
    fn clone(&self) -> Self {
        Self {
            db_path: Arc::clone(&self.db_path),
        }
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let key = key.to_string();
        let value = value.to_vec();
        let now = Self::now_secs();
        let db_path = self.db_path();

        tokio::task::spawn_blocking(move || {
            let conn = Self::open_connection(&db_path)?;
            conn.execute(
                "INSERT INTO queue_store (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
                rusqlite::params![key, value, now],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| SyncError::Storage(format!("Put operation failed: {}", e)))?
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        let db_path = self.db_path();

        tokio::task::spawn_blocking(move || {
            let conn = Self::open_connection(&db_path)?;
            let value = conn
                .query_row(
                    "SELECT value FROM queue_store WHERE key = ?1",
                    [&key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
        .map_err(|e| SyncError::Storage(format!("Get operation failed: {}", e)))?
    }

    async fn list(&self) -> Result<Vec<Vec<u8>>> {
        let db_path = self.db_path();

        tokio::task::spawn_blocking(move || {
            let conn = Self::open_connection(&db_path)?;
            let mut stmt = conn.prepare("SELECT value FROM queue_store")?;
            let values = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<Vec<u8>>, rusqlite::Error>>()?;
            Ok(values)
        })
        .await
        .map_err(|e| SyncError::Storage(format!("List operation failed: {}", e)))?
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        let db_path = self.db_path();

        tokio::task::spawn_blocking(move || {
            let conn = Self::open_connection(&db_path)?;
            conn.execute("DELETE FROM queue_store WHERE key = ?1", [&key])?;
            Ok(())
        })
        .await
        .map_err(|e| SyncError::Storage(format!("Delete operation failed: {}", e)))?
    }

    async fn clear(&self) -> Result<()> {
        let db_path = self.db_path();

        tokio::task::spawn_blocking(move || {
            let conn = Self::open_connection(&db_path)?;
            conn.execute("DELETE FROM queue_store", [])?;
            Ok(())
        })
        .await
        .map_err(|e| SyncError::Storage(format!("Clear operation failed: {}", e)))?
    }
}
