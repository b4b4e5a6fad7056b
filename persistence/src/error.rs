//! Persistence-local error type. Converts into [`confluence_core::ConfluenceError`]
//! at the boundary callers actually care about (coordinator snapshots, recovery
//! attempt history, analytics pattern records).

use confluence_core::ConfluenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[cfg(feature = "index")]
    #[error("index error: {0}")]
    Index(#[from] rusqlite::Error),

    #[error("record {id} not found in category {category}")]
    NotFound { id: String, category: String },

    #[error("corrupt record at {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

impl From<PersistenceError> for ConfluenceError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::NotFound { .. } => ConfluenceError::InvariantViolation(value.to_string()),
            PersistenceError::Corrupt { .. } => ConfluenceError::Fatal(value.to_string()),
            other => ConfluenceError::Transient(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
