use thiserror::Error;

/// Storage-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Transaction commit failed: {0}")]
    CommitFailed(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Offset regression on partition {partition}: stored {stored}, attempted {attempted}")]
    OffsetRegression {
        partition: u32,
        stored: u64,
        attempted: u64,
    },
}

/// Cache failures are never fatal; callers fall back to the store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}
