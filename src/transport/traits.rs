use async_trait::async_trait;

use super::error::TransportError;
use crate::domain::PartitionId;

/// A record read back from a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub offset: u64,
    pub payload: Vec<u8>,
}

/// Append-only partitioned record log
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Number of partitions records are routed over
    fn partitions(&self) -> u32;

    /// Append a keyed record. Returns only once the record is durable, with
    /// the partition it was routed to and its offset there.
    async fn append(&self, key: &[u8], payload: Vec<u8>)
    -> Result<(PartitionId, u64), TransportError>;

    /// Read a contiguous run of records starting at `from`, bounded by
    /// `max_bytes` of payload. May be empty.
    async fn fetch(
        &self,
        partition: PartitionId,
        from: u64,
        max_bytes: usize,
    ) -> Result<Vec<LogEntry>, TransportError>;

    /// Offset the next appended record in `partition` will receive
    async fn latest_offset(&self, partition: PartitionId) -> Result<u64, TransportError>;

    /// Startup probe
    async fn health_check(&self) -> Result<(), TransportError>;
}
