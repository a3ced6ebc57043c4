use thiserror::Error;

use crate::domain::DomainError;
use crate::engine::ApplyError;
use crate::storage::StorageError;
use crate::transport::TransportError;

/// A failed worker cycle. The worker logs it and retries at the next poll.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Undecodable record at offset {offset}: {source}")]
    Decode { offset: u64, source: DomainError },

    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("Storage error: {0}")]
    Store(#[from] StorageError),
}

/// Errors from the pool lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Worker pool already started")]
    AlreadyStarted,

    #[error("Worker pool not started")]
    NotStarted,

    #[error("Workers did not become idle in time")]
    IdleTimeout,

    #[error("Workers still running after shutdown timeout: {pending:?}")]
    ShutdownTimeout { pending: Vec<u32> },

    #[error("Worker for partition {0} panicked")]
    WorkerPanicked(u32),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Store(#[from] StorageError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        assert_eq!(
            WorkerError::Decode {
                offset: 7,
                source: DomainError::Decode("expected 12 bytes, got 3".to_string()),
            }
            .to_string(),
            "Undecodable record at offset 7: Malformed delta record: expected 12 bytes, got 3"
        );
        assert_eq!(
            PoolError::ShutdownTimeout { pending: vec![1, 3] }.to_string(),
            "Workers still running after shutdown timeout: [1, 3]"
        );
        assert_eq!(
            PoolError::WorkerPanicked(2).to_string(),
            "Worker for partition 2 panicked"
        );
    }

    #[test]
    fn apply_error_conversion() {
        let err = WorkerError::from(ApplyError::Store(StorageError::CommitFailed(
            "x".to_string(),
        )));

        match err {
            WorkerError::Apply(ApplyError::Store(StorageError::CommitFailed(_))) => {}
            _ => panic!("Expected Apply variant"),
        }
    }
}
