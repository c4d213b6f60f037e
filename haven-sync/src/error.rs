//! # Sync Error Types
//!
//! Centralized error handling for the offline sync engine.

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Core error types for the sync engine
#[derive(Error, Debug)]
pub enum SyncError {
    /// Payload rejected before entering the queue
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transient transport failure, absorbed by the retry controller
    #[error("Network error: {0}")]
    Network(String),

    /// Remote authority rejected the request
    #[error("Remote error (status {status}): {message}")]
    Remote { status: u16, message: String },

    /// A conflict resolver explicitly refused the local mutation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Durable store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Queue capacity exhausted
    #[error("Queue full: {0}")]
    QueueFull(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SyncError {
    /// Whether this error came from a resolver refusing a stale write
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let err = SyncError::Conflict("server has newer version".to_string());
        assert!(err.is_conflict());
        assert!(!SyncError::Network("timeout".to_string()).is_conflict());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::Remote {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Remote error (status 503): unavailable");
    }
}
