use thiserror::Error;

/// Domain-level errors: argument validation and wire decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Account id can't be negative: {0}")]
    NegativeAccountId(i64),

    #[error("Account id out of range: {0}")]
    AccountIdOutOfRange(i64),

    #[error("Missing delta value")]
    MissingDelta,

    #[error("Partition {partition} out of range (partitions: {partitions})")]
    PartitionOutOfRange { partition: u32, partitions: u32 },

    #[error("Partition count must be positive")]
    NoPartitions,

    #[error("Balance overflow for account {0}")]
    Overflow(u32),

    #[error("Malformed delta record: {0}")]
    Decode(String),
}
