//! Process-wide state with an explicit construct/teardown lifecycle.
//!
//! `Runtime::start` checks the log, spawns the partition workers and the
//! statistics reporter, and hands out the instrumented account service.
//! `Runtime::shutdown` stops them again. Nothing here is global; callers
//! pass the runtime (or the service it exposes) to whatever needs it.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{info, warn};

use super::error::AppError;
use crate::config::Config;
use crate::domain::{Account, Partitioner};
use crate::io::{IoError, RawIntentRecord};
use crate::service::{
    AccountService, InstrumentedService, InvocationStats, LedgerService, ServiceError,
    StatsReporter,
};
use crate::storage::{BalanceCache, ConcurrentCache, MemoryStore};
use crate::streaming::{PartitionLag, STALL_FAILURE_THRESHOLD, WorkerPool};
use crate::transport::{LogTransport, MemoryLog};

pub type LedgerHandle = InstrumentedService<LedgerService<MemoryLog, MemoryStore, ConcurrentCache>>;

/// Outcome of feeding a stream of write intents to the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: u64,
    pub rejected: u64,
}

pub struct Runtime {
    config: Config,
    store: Arc<MemoryStore>,
    cache: Arc<ConcurrentCache>,
    pool: WorkerPool<MemoryLog, MemoryStore, ConcurrentCache>,
    service: Arc<LedgerHandle>,
    stats: Arc<InvocationStats>,
    reporter: StatsReporter,
}

impl Runtime {
    /// Start with a fresh in-memory log sized from `config`
    pub async fn start(config: Config) -> Result<Self, AppError> {
        let partitioner = Partitioner::new(config.partitions)?;
        Self::start_with_log(config, Arc::new(MemoryLog::new(partitioner))).await
    }

    /// Start against an existing log. An unreachable log aborts startup.
    pub async fn start_with_log(config: Config, log: Arc<MemoryLog>) -> Result<Self, AppError> {
        log.health_check().await?;

        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(ConcurrentCache::new());

        let stats = Arc::new(InvocationStats::new());
        if config.stats_logging {
            stats.log_on();
        }
        let reporter = StatsReporter::spawn(Arc::clone(&stats), config.stats_interval);

        let service = Arc::new(InstrumentedService::new(
            LedgerService::new(Arc::clone(&log), Arc::clone(&store), Arc::clone(&cache)),
            Arc::clone(&stats),
        ));

        let mut pool = WorkerPool::new(
            log,
            Arc::clone(&store),
            Arc::clone(&cache),
            config.worker_settings(),
        );
        pool.start()?;

        info!(partitions = config.partitions, "Ledger runtime started");

        Ok(Self {
            config,
            store,
            cache,
            pool,
            service,
            stats,
            reporter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> Arc<LedgerHandle> {
        Arc::clone(&self.service)
    }

    pub fn stats(&self) -> Arc<InvocationStats> {
        Arc::clone(&self.stats)
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    pub fn pool(&self) -> &WorkerPool<MemoryLog, MemoryStore, ConcurrentCache> {
        &self.pool
    }

    /// Issue `add_amount` for every row. Rows the CSV layer or the service
    /// rejects as invalid are logged and skipped; an unacknowledged append
    /// aborts the ingest.
    pub async fn ingest<St>(&self, mut intents: St) -> Result<IngestSummary, AppError>
    where
        St: Stream<Item = Result<RawIntentRecord, IoError>> + Unpin,
    {
        let mut summary = IngestSummary::default();

        while let Some(row) = intents.next().await {
            let intent = match row {
                Ok(intent) => intent,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable row");
                    summary.rejected += 1;
                    continue;
                }
            };

            match self.service.add_amount(intent.account, intent.delta).await {
                Ok(()) => summary.accepted += 1,
                Err(ServiceError::InvalidArgument(e)) => {
                    warn!(account = intent.account, error = %e, "Skipping invalid intent");
                    summary.rejected += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            "Ingest finished"
        );
        Ok(summary)
    }

    /// Wait until every worker is idle and no partition has records left.
    ///
    /// Idle sampling alone can return while a worker is about to pick up
    /// records appended after its last empty fetch, so the backlog is
    /// checked too. A failed cycle is retried at the next poll, so a
    /// partition only counts as stalled once it has failed
    /// `STALL_FAILURE_THRESHOLD` cycles in a row with records left; the
    /// wait then gives up with `AppError::Stalled`.
    pub async fn await_drained(&self) -> Result<(), AppError> {
        let sample = self.config.idle_sample_interval;

        loop {
            self.pool.await_idle(sample).await?;

            let lags = self.pool.lag().await?;
            let backlog: u64 = lags.iter().map(PartitionLag::lag).sum();
            if backlog == 0 {
                return Ok(());
            }

            let statuses = self.pool.statuses();
            let stalled: Vec<u32> = lags
                .iter()
                .filter(|lag| lag.lag() > 0)
                .filter(|lag| {
                    statuses.iter().any(|(partition, status)| {
                        *partition == lag.partition
                            && status.consecutive_failures() >= STALL_FAILURE_THRESHOLD
                    })
                })
                .map(|lag| lag.partition.get())
                .collect();
            if !stalled.is_empty() {
                warn!(?stalled, backlog, "Partitions stalled with records left");
                return Err(AppError::Stalled {
                    partitions: stalled,
                    backlog,
                });
            }

            tokio::time::sleep(sample).await;
        }
    }

    pub async fn lag(&self) -> Result<Vec<PartitionLag>, AppError> {
        Ok(self.pool.lag().await?)
    }

    /// Every committed account, ordered by id
    pub fn snapshot(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.store.accounts()?)
    }

    /// Stop the workers and the reporter, then drop cached balances
    pub async fn shutdown(mut self) -> Result<(), AppError> {
        let stopped = self.pool.stop(self.config.shutdown_timeout).await;
        self.reporter.shutdown().await;
        if let Err(e) = self.cache.clear() {
            warn!(error = %e, "Cache clear failed");
        }

        stopped?;
        info!("Ledger runtime stopped");
        Ok(())
    }
}
