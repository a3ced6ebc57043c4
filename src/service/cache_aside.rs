//! Cache-aside reads and post-commit invalidation.
//!
//! Reads go to the cache first and fall back to the store on a miss,
//! populating the cache with insert-if-absent. Workers evict every id a
//! batch touched right after its commit.
//!
//! There is a known window between a commit and its eviction: a reader
//! that loaded the pre-commit balance can insert it after the eviction
//! ran, and that stale value then stays cached until the next committed
//! write to the same id is invalidated. Writes are queued through the log,
//! so reads are only eventually consistent with them anyway.

use std::sync::Arc;

use tracing::warn;

use crate::domain::AccountId;
use crate::storage::{AccountStore, BalanceCache, StorageError};

pub struct CacheAside<S, C>
where
    S: AccountStore,
    C: BalanceCache,
{
    store: Arc<S>,
    cache: Arc<C>,
}

impl<S, C> Clone for CacheAside<S, C>
where
    S: AccountStore,
    C: BalanceCache,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S, C> CacheAside<S, C>
where
    S: AccountStore,
    C: BalanceCache,
{
    pub fn new(store: Arc<S>, cache: Arc<C>) -> Self {
        Self { store, cache }
    }

    /// Current balance, 0 for an id that never had a delta applied
    pub async fn get(&self, id: AccountId) -> Result<i64, StorageError> {
        match self.cache.get(id) {
            Ok(Some(balance)) => return Ok(balance),
            Ok(None) => {}
            Err(e) => warn!(account = id.get(), error = %e, "Cache read failed, using store"),
        }

        let balance = self
            .store
            .find(id)
            .await?
            .map(|account| account.balance())
            .unwrap_or(0);

        if let Err(e) = self.cache.put_if_absent(id, balance) {
            warn!(account = id.get(), error = %e, "Cache populate failed");
        }

        Ok(balance)
    }

    /// Evict every id so the next read reloads it from the store
    pub fn invalidate<I>(&self, ids: I)
    where
        I: IntoIterator<Item = AccountId>,
    {
        for id in ids {
            if let Err(e) = self.cache.evict(id) {
                warn!(account = id.get(), error = %e, "Cache eviction failed");
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.cache.clear() {
            warn!(error = %e, "Cache clear failed");
        }
    }
}
