//! Per-partition consume/apply loop.
//!
//! Each worker owns exactly one partition and runs its cycles strictly one
//! after another: read the committed offset, fetch, merge and commit, then
//! evict the touched ids from the cache. Routing sends an account to a
//! single partition, so no two workers ever write the same account.
//!
//! Cancellation is only observed while sleeping between cycles. A cycle
//! that has started always runs to the end of its commit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::WorkerError;
use crate::domain::{DeltaRecord, PartitionId};
use crate::engine::BatchApplier;
use crate::service::CacheAside;
use crate::storage::{AccountStore, BalanceCache, OffsetStore};
use crate::transport::LogTransport;

/// Default pause between two cycles of a worker
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default payload budget of one fetch
pub const DEFAULT_FETCH_MAX_BYTES: usize = 100_000;

/// Consecutive failed cycles after which a partition counts as stalled
pub const STALL_FAILURE_THRESHOLD: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Fetching = 1,
    Applying = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => WorkerState::Fetching,
            2 => WorkerState::Applying,
            3 => WorkerState::Stopped,
            _ => WorkerState::Idle,
        }
    }
}

/// Live view of a worker, shared with the pool
#[derive(Debug, Default)]
pub struct WorkerStatus {
    state: AtomicU8,
    idle: AtomicBool,
    batches_applied: AtomicU64,
    records_applied: AtomicU64,
    consecutive_failures: AtomicU64,
    committed_offset: AtomicU64,
}

impl WorkerStatus {
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// True once the last fetch found nothing, or the last cycle failed
    pub fn is_idle(&self) -> bool {
        self.idle.load(Ordering::SeqCst)
    }

    pub fn batches_applied(&self) -> u64 {
        self.batches_applied.load(Ordering::SeqCst)
    }

    pub fn records_applied(&self) -> u64 {
        self.records_applied.load(Ordering::SeqCst)
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Offset as of the last cycle that read or committed it
    pub fn committed_offset(&self) -> u64 {
        self.committed_offset.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn set_idle(&self, idle: bool) {
        self.idle.store(idle, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub fetch_max_bytes: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_max_bytes: DEFAULT_FETCH_MAX_BYTES,
        }
    }
}

/// What one successful cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to read; no store write was issued
    Idle,
    Applied {
        records: usize,
        accounts: usize,
        committed_offset: u64,
    },
}

pub struct PartitionWorker<L, S, C>
where
    L: LogTransport,
    S: AccountStore + OffsetStore,
    C: BalanceCache,
{
    partition: PartitionId,
    log: Arc<L>,
    offsets: Arc<S>,
    applier: BatchApplier<S>,
    reads: CacheAside<S, C>,
    settings: WorkerSettings,
    status: Arc<WorkerStatus>,
}

impl<L, S, C> PartitionWorker<L, S, C>
where
    L: LogTransport,
    S: AccountStore + OffsetStore,
    C: BalanceCache,
{
    pub fn new(
        partition: PartitionId,
        log: Arc<L>,
        store: Arc<S>,
        cache: Arc<C>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            partition,
            log,
            applier: BatchApplier::new(Arc::clone(&store)),
            reads: CacheAside::new(Arc::clone(&store), cache),
            offsets: store,
            settings,
            status: Arc::new(WorkerStatus::default()),
        }
    }

    pub fn partition(&self) -> PartitionId {
        self.partition
    }

    pub fn status(&self) -> Arc<WorkerStatus> {
        Arc::clone(&self.status)
    }

    /// Poll until `cancel` fires, then mark the worker stopped
    pub async fn run(self, cancel: CancellationToken) {
        let partition = self.partition.get();
        info!(
            partition,
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            "Partition worker started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }

            match self.run_cycle().await {
                Ok(_) => {
                    self.status.consecutive_failures.store(0, Ordering::SeqCst);
                }
                Err(e) => {
                    self.status.set_idle(true);
                    let failures = self
                        .status
                        .consecutive_failures
                        .fetch_add(1, Ordering::SeqCst)
                        + 1;
                    error!(partition, error = %e, failures, "Partition cycle failed");

                    if failures == STALL_FAILURE_THRESHOLD {
                        warn!(
                            partition,
                            failures, "Partition keeps failing, retrying every poll interval"
                        );
                    }
                }
            }
            self.status.set_state(WorkerState::Idle);
        }

        self.status.set_state(WorkerState::Stopped);
        info!(
            partition,
            batches = self.status.batches_applied(),
            records = self.status.records_applied(),
            "Partition worker stopped"
        );
    }

    /// One fetch/apply/invalidate pass over the partition
    pub async fn run_cycle(&self) -> Result<CycleOutcome, WorkerError> {
        self.status.set_state(WorkerState::Fetching);

        let committed = self
            .offsets
            .find_offset(self.partition)
            .await?
            .unwrap_or(0);
        self.status
            .committed_offset
            .store(committed, Ordering::SeqCst);

        let entries = self
            .log
            .fetch(self.partition, committed, self.settings.fetch_max_bytes)
            .await?;

        if entries.is_empty() {
            self.status.set_idle(true);
            return Ok(CycleOutcome::Idle);
        }
        self.status.set_idle(false);

        let records = entries
            .iter()
            .map(|entry| {
                DeltaRecord::decode(&entry.payload).map_err(|source| WorkerError::Decode {
                    offset: entry.offset,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.status.set_state(WorkerState::Applying);
        let next_offset = committed + records.len() as u64;
        let touched = self
            .applier
            .apply(&records, self.partition, next_offset)
            .await?;

        self.reads.invalidate(touched.keys().copied());

        self.status
            .committed_offset
            .store(next_offset, Ordering::SeqCst);
        self.status.batches_applied.fetch_add(1, Ordering::SeqCst);
        self.status
            .records_applied
            .fetch_add(records.len() as u64, Ordering::SeqCst);

        debug!(
            partition = self.partition.get(),
            records = records.len(),
            offset = next_offset,
            "Applied batch"
        );

        Ok(CycleOutcome::Applied {
            records: records.len(),
            accounts: touched.len(),
            committed_offset: next_offset,
        })
    }
}
