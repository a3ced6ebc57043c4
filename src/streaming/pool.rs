use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::PoolError;
use super::worker::{PartitionWorker, WorkerSettings, WorkerStatus};
use crate::domain::{PartitionId, Partitioner};
use crate::storage::{AccountStore, BalanceCache, OffsetStore};
use crate::transport::LogTransport;

/// Backlog of one partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionLag {
    pub partition: PartitionId,
    pub committed: u64,
    pub latest: u64,
}

impl PartitionLag {
    pub fn lag(&self) -> u64 {
        self.latest.saturating_sub(self.committed)
    }
}

struct RunningWorker {
    partition: PartitionId,
    status: Arc<WorkerStatus>,
    handle: JoinHandle<()>,
}

struct Running {
    cancel: CancellationToken,
    workers: Vec<RunningWorker>,
}

/// Fixed set of partition workers, one per partition, for the pool's lifetime.
///
/// Partition ownership is static: worker `i` consumes partition `i` and
/// nothing else. There is no rebalancing, so a stalled worker stalls its
/// partition.
pub struct WorkerPool<L, S, C>
where
    L: LogTransport + 'static,
    S: AccountStore + OffsetStore + 'static,
    C: BalanceCache + 'static,
{
    log: Arc<L>,
    store: Arc<S>,
    cache: Arc<C>,
    settings: WorkerSettings,
    running: Option<Running>,
}

impl<L, S, C> WorkerPool<L, S, C>
where
    L: LogTransport + 'static,
    S: AccountStore + OffsetStore + 'static,
    C: BalanceCache + 'static,
{
    pub fn new(log: Arc<L>, store: Arc<S>, cache: Arc<C>, settings: WorkerSettings) -> Self {
        Self {
            log,
            store,
            cache,
            settings,
            running: None,
        }
    }

    /// Spawn one worker per partition
    pub fn start(&mut self) -> Result<(), PoolError> {
        if self.running.is_some() {
            return Err(PoolError::AlreadyStarted);
        }

        let partitioner = Partitioner::new(self.log.partitions())?;
        let cancel = CancellationToken::new();

        let workers: Vec<RunningWorker> = partitioner
            .all()
            .map(|partition| {
                let worker = PartitionWorker::new(
                    partition,
                    Arc::clone(&self.log),
                    Arc::clone(&self.store),
                    Arc::clone(&self.cache),
                    self.settings,
                );
                let status = worker.status();
                let handle = tokio::spawn(worker.run(cancel.child_token()));

                RunningWorker {
                    partition,
                    status,
                    handle,
                }
            })
            .collect();

        info!(partitions = workers.len(), "Worker pool started");
        self.running = Some(Running { cancel, workers });
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// One sampling pass over every idle flag
    pub fn all_idle(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| running.workers.iter().all(|w| w.status.is_idle()))
    }

    /// Wait until one sampling pass sees every worker idle.
    ///
    /// This is approximate: flags are read one by one, so a worker can pick
    /// up new records right after its flag was sampled and the wait returns
    /// while it is busy. Workers that never go idle keep this waiting forever;
    /// use `await_idle_timeout` to bound it.
    pub async fn await_idle(&self, sample_interval: Duration) -> Result<(), PoolError> {
        if self.running.is_none() {
            return Err(PoolError::NotStarted);
        }

        while !self.all_idle() {
            tokio::time::sleep(sample_interval).await;
        }
        Ok(())
    }

    pub async fn await_idle_timeout(
        &self,
        sample_interval: Duration,
        timeout: Duration,
    ) -> Result<(), PoolError> {
        tokio::time::timeout(timeout, self.await_idle(sample_interval))
            .await
            .map_err(|_| PoolError::IdleTimeout)?
    }

    /// Cancel every worker and wait up to `timeout` for all of them to stop.
    ///
    /// Workers finish any in-flight commit first. Workers still running at
    /// the deadline are left detached and reported in the error.
    pub async fn stop(&mut self, timeout: Duration) -> Result<(), PoolError> {
        let Running { cancel, workers } = self.running.take().ok_or(PoolError::NotStarted)?;
        cancel.cancel();

        let deadline = Instant::now() + timeout;
        let mut pending = Vec::new();
        let mut panicked = None;

        for mut worker in workers {
            match tokio::time::timeout_at(deadline, &mut worker.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(partition = worker.partition.get(), error = %e, "Worker task failed");
                    panicked.get_or_insert(worker.partition.get());
                }
                Err(_) => {
                    warn!(
                        partition = worker.partition.get(),
                        "Worker did not stop before shutdown timeout"
                    );
                    pending.push(worker.partition.get());
                }
            }
        }

        if !pending.is_empty() {
            return Err(PoolError::ShutdownTimeout { pending });
        }
        if let Some(partition) = panicked {
            return Err(PoolError::WorkerPanicked(partition));
        }

        info!("Worker pool stopped");
        Ok(())
    }

    /// Status handles of the running workers, in partition order
    pub fn statuses(&self) -> Vec<(PartitionId, Arc<WorkerStatus>)> {
        self.running
            .as_ref()
            .map(|running| {
                running
                    .workers
                    .iter()
                    .map(|w| (w.partition, Arc::clone(&w.status)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records appended but not yet committed, per partition
    pub async fn lag(&self) -> Result<Vec<PartitionLag>, PoolError> {
        let partitioner = Partitioner::new(self.log.partitions())?;
        let mut lags = Vec::with_capacity(partitioner.partitions() as usize);

        for partition in partitioner.all() {
            let latest = self.log.latest_offset(partition).await?;
            let committed = self.store.find_offset(partition).await?.unwrap_or(0);
            lags.push(PartitionLag {
                partition,
                committed,
                latest,
            });
        }

        Ok(lags)
    }
}
