use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::DomainError;
use crate::io::IoError;
use crate::service::ServiceError;
use crate::storage::StorageError;
use crate::streaming::PoolError;
use crate::transport::TransportError;

/// Top-level application errors unifying all layer errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("CSV IO error: {0}")]
    CsvIo(#[from] IoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The log could not be reached at startup
    #[error("Log transport unreachable: {0}")]
    TransportUnavailable(#[from] TransportError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Records are left in partitions whose worker keeps failing
    #[error("Partitions {partitions:?} stalled with {backlog} records left")]
    Stalled { partitions: Vec<u32>, backlog: u64 },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}
