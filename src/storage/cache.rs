use dashmap::DashMap;

use super::error::CacheError;
use super::traits::BalanceCache;
use crate::domain::AccountId;

/// DashMap-based balance cache (sharded locking, safe to share across tasks)
#[derive(Default)]
pub struct ConcurrentCache {
    entries: DashMap<AccountId, i64>,
}

impl ConcurrentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BalanceCache for ConcurrentCache {
    fn get(&self, id: AccountId) -> Result<Option<i64>, CacheError> {
        Ok(self.entries.get(&id).map(|r| *r.value()))
    }

    fn put_if_absent(&self, id: AccountId, balance: i64) -> Result<(), CacheError> {
        self.entries.entry(id).or_insert(balance);
        Ok(())
    }

    fn evict(&self, id: AccountId) -> Result<(), CacheError> {
        self.entries.remove(&id);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }
}
