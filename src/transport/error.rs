use thiserror::Error;

/// Errors raised by the append-only log
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Log transport unavailable: {0}")]
    Unavailable(String),

    #[error("Append not acknowledged for key {0}")]
    NotAcknowledged(String),

    #[error("Unknown partition: {0}")]
    UnknownPartition(u32),
}
