//! Invocation statistics for the account service.
//!
//! `InstrumentedService` wraps any `AccountService` and counts calls per
//! method. `StatsReporter` turns the running totals into per-tick rates on
//! a background task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::account::AccountService;
use super::error::ServiceError;

pub const GET_AMOUNT: &str = "get_amount";
pub const ADD_AMOUNT: &str = "add_amount";

#[derive(Debug, Clone, Copy, Default)]
struct RateWindow {
    total_at_last_tick: u64,
    last_tick: u64,
}

/// Per-method invocation counters and last-tick rates
#[derive(Default)]
pub struct InvocationStats {
    counters: DashMap<&'static str, AtomicU64>,
    rates: Mutex<HashMap<&'static str, RateWindow>>,
    logging: AtomicBool,
}

impl InvocationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, method: &'static str) {
        self.counters
            .entry(method)
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Total invocations of `method` since the last reset
    pub fn method_invocation_count(&self, method: &str) -> u64 {
        self.counters
            .get(method)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Invocations of `method` during the last completed tick
    pub fn method_invocation_rate(&self, method: &str) -> u64 {
        self.lock_rates()
            .get(method)
            .map(|w| w.last_tick)
            .unwrap_or(0)
    }

    pub fn reset_method(&self, method: &str) {
        let mut rates = self.lock_rates();
        self.counters.remove(method);
        rates.remove(method);
    }

    pub fn reset(&self) {
        let mut rates = self.lock_rates();
        self.counters.clear();
        rates.clear();
    }

    pub fn log_on(&self) {
        self.logging.store(true, Ordering::Relaxed);
    }

    pub fn log_off(&self) {
        self.logging.store(false, Ordering::Relaxed);
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging.load(Ordering::Relaxed)
    }

    /// Close the current window: rate = invocations since the previous tick
    pub fn tick(&self) {
        let mut rates = self.lock_rates();
        let logging = self.logging_enabled();

        for entry in self.counters.iter() {
            let method = *entry.key();
            let total = entry.value().load(Ordering::Relaxed);

            let window = match rates.get(method) {
                None => RateWindow {
                    total_at_last_tick: total,
                    last_tick: total,
                },
                Some(prev) => RateWindow {
                    total_at_last_tick: total,
                    last_tick: total.saturating_sub(prev.total_at_last_tick),
                },
            };
            rates.insert(method, window);

            if logging {
                info!(
                    method,
                    total,
                    last_tick = window.last_tick,
                    "Invocation statistics"
                );
            }
        }
    }

    fn lock_rates(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, RateWindow>> {
        self.rates.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Decorator counting every call to the wrapped service
pub struct InstrumentedService<T>
where
    T: AccountService,
{
    inner: T,
    stats: Arc<InvocationStats>,
}

impl<T> InstrumentedService<T>
where
    T: AccountService,
{
    pub fn new(inner: T, stats: Arc<InvocationStats>) -> Self {
        Self { inner, stats }
    }

    pub fn stats(&self) -> &Arc<InvocationStats> {
        &self.stats
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T> AccountService for InstrumentedService<T>
where
    T: AccountService,
{
    async fn get_amount(&self, id: i64) -> Result<i64, ServiceError> {
        self.stats.record(GET_AMOUNT);
        let balance = self.inner.get_amount(id).await?;
        if self.stats.logging_enabled() {
            info!(target: "account_ledger::processing", method = GET_AMOUNT, id, balance);
        }
        Ok(balance)
    }

    async fn add_amount(&self, id: i64, delta: Option<i64>) -> Result<(), ServiceError> {
        self.stats.record(ADD_AMOUNT);
        self.inner.add_amount(id, delta).await?;
        if self.stats.logging_enabled() {
            info!(target: "account_ledger::processing", method = ADD_AMOUNT, id, ?delta);
        }
        Ok(())
    }
}

/// Background task ticking `InvocationStats` at a fixed period
pub struct StatsReporter {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StatsReporter {
    pub fn spawn(stats: Arc<InvocationStats>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => stats.tick(),
                }
            }
            debug!("Statistics reporter stopped");
        });

        Self { cancel, task }
    }

    /// Stop ticking and wait for the task to finish. Returns false if the
    /// ticker task had failed.
    pub async fn shutdown(self) -> bool {
        self.cancel.cancel();
        match self.task.await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Statistics reporter task failed");
                false
            }
        }
    }
}
