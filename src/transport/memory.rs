use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::error::TransportError;
use super::traits::{LogEntry, LogTransport};
use crate::domain::{PartitionId, Partitioner};

/// In-memory partitioned log.
///
/// Appends are stored before `append` returns, which is the durability
/// point for this transport. Availability can be toggled to exercise the
/// failure paths of producers and consumers.
pub struct MemoryLog {
    partitioner: Partitioner,
    partitions: DashMap<u32, Vec<Vec<u8>>>,
    available: AtomicBool,
    failing_appends: AtomicUsize,
}

impl MemoryLog {
    pub fn new(partitioner: Partitioner) -> Self {
        let partitions = DashMap::new();
        for partition in partitioner.all() {
            partitions.insert(partition.get(), Vec::new());
        }

        Self {
            partitioner,
            partitions,
            available: AtomicBool::new(true),
            failing_appends: AtomicUsize::new(0),
        }
    }

    /// Simulate the broker going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Refuse to acknowledge the next `count` appends
    pub fn fail_next_appends(&self, count: usize) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    /// Number of records held in a partition
    pub fn len(&self, partition: PartitionId) -> usize {
        self.partitions
            .get(&partition.get())
            .map(|records| records.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(|records| records.is_empty())
    }

    fn ensure_available(&self) -> Result<(), TransportError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Unavailable("memory log offline".to_string()))
        }
    }

    fn take_append_failure(&self) -> bool {
        self.failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LogTransport for MemoryLog {
    fn partitions(&self) -> u32 {
        self.partitioner.partitions()
    }

    async fn append(
        &self,
        key: &[u8],
        payload: Vec<u8>,
    ) -> Result<(PartitionId, u64), TransportError> {
        self.ensure_available()?;
        if self.take_append_failure() {
            return Err(TransportError::NotAcknowledged(
                String::from_utf8_lossy(key).into_owned(),
            ));
        }

        let partition = self.partitioner.partition_for_key(key);
        let mut records = self
            .partitions
            .get_mut(&partition.get())
            .ok_or(TransportError::UnknownPartition(partition.get()))?;
        let offset = records.len() as u64;
        records.push(payload);

        trace!(partition = partition.get(), offset, "Appended record");
        Ok((partition, offset))
    }

    async fn fetch(
        &self,
        partition: PartitionId,
        from: u64,
        max_bytes: usize,
    ) -> Result<Vec<LogEntry>, TransportError> {
        self.ensure_available()?;
        let records = self
            .partitions
            .get(&partition.get())
            .ok_or(TransportError::UnknownPartition(partition.get()))?;

        let mut batch = Vec::new();
        let mut bytes = 0usize;
        for (offset, payload) in records.iter().enumerate().skip(from as usize) {
            // Always hand out at least one record so an oversized one can't wedge the partition
            if !batch.is_empty() && bytes + payload.len() > max_bytes {
                break;
            }
            bytes += payload.len();
            batch.push(LogEntry {
                offset: offset as u64,
                payload: payload.clone(),
            });
        }

        Ok(batch)
    }

    async fn latest_offset(&self, partition: PartitionId) -> Result<u64, TransportError> {
        self.ensure_available()?;
        Ok(self.len(partition) as u64)
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        self.ensure_available()
    }
}
