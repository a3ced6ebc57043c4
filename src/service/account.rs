use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::cache_aside::CacheAside;
use super::error::ServiceError;
use crate::domain::{AccountId, DeltaRecord, DomainError};
use crate::storage::{AccountStore, BalanceCache};
use crate::transport::LogTransport;

/// Public balance operations
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Current balance, or 0 if no delta was ever applied to `id`
    async fn get_amount(&self, id: i64) -> Result<i64, ServiceError>;

    /// Durably enqueue `delta` for `id`. The balance changes once the
    /// owning partition worker applies it.
    async fn add_amount(&self, id: i64, delta: Option<i64>) -> Result<(), ServiceError>;
}

/// Account service backed by the log (writes) and cache-aside store reads
pub struct LedgerService<L, S, C>
where
    L: LogTransport,
    S: AccountStore,
    C: BalanceCache,
{
    log: Arc<L>,
    reads: CacheAside<S, C>,
}

impl<L, S, C> LedgerService<L, S, C>
where
    L: LogTransport,
    S: AccountStore,
    C: BalanceCache,
{
    pub fn new(log: Arc<L>, store: Arc<S>, cache: Arc<C>) -> Self {
        Self {
            log,
            reads: CacheAside::new(store, cache),
        }
    }
}

#[async_trait]
impl<L, S, C> AccountService for LedgerService<L, S, C>
where
    L: LogTransport,
    S: AccountStore,
    C: BalanceCache,
{
    async fn get_amount(&self, id: i64) -> Result<i64, ServiceError> {
        let id = AccountId::new(id)?;
        Ok(self.reads.get(id).await?)
    }

    async fn add_amount(&self, id: i64, delta: Option<i64>) -> Result<(), ServiceError> {
        let id = AccountId::new(id)?;
        let delta = delta.ok_or(DomainError::MissingDelta)?;

        let record = DeltaRecord::new(id, delta);
        let (partition, offset) = self
            .log
            .append(id.key().as_bytes(), record.encode())
            .await?;

        debug!(
            account = id.get(),
            delta,
            partition = partition.get(),
            offset,
            "Enqueued delta"
        );
        Ok(())
    }
}

#[async_trait]
impl<T> AccountService for Arc<T>
where
    T: AccountService + ?Sized,
{
    async fn get_amount(&self, id: i64) -> Result<i64, ServiceError> {
        (**self).get_amount(id).await
    }

    async fn add_amount(&self, id: i64, delta: Option<i64>) -> Result<(), ServiceError> {
        (**self).add_amount(id, delta).await
    }
}
