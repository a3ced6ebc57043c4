use thiserror::Error;

use crate::domain::DomainError;
use crate::storage::StorageError;
use crate::transport::TransportError;

/// Errors surfaced to callers of the account service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Rejected before any durable effect
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] DomainError),

    /// The log did not acknowledge the write; the caller must retry
    #[error("Durability failure: {0}")]
    DurabilityFailure(#[from] TransportError),

    #[error("Storage error: {0}")]
    Store(#[from] StorageError),
}
