use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt document: {0}")]
    Corrupt(String),

    #[error("internal lock poisoned")]
    LockPoisoned,

    #[error("document {0} missing after uniqueness conflict")]
    MissingAfterConflict(String),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
