use thiserror::Error;

/// Errors returned by the item store, change log and user store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested item or user does not exist.
    #[error("not found")]
    NotFound,

    #[error("user {0:?} already exists")]
    AlreadyExists(String),

    #[error("user ID mismatch: expected {expected}, actual {actual}")]
    UserIdMismatch { expected: String, actual: String },

    #[error("storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to encode or decode stored JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("invalid stored value: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}
