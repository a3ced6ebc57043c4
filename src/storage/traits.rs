use async_trait::async_trait;

use super::error::{CacheError, StorageError};
use crate::domain::{Account, AccountId, PartitionId, PartitionOffset};

/// Durable, transactional balance storage
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load a single account, `None` if no delta was ever applied to it
    async fn find(&self, id: AccountId) -> Result<Option<Account>, StorageError>;

    /// Load every existing account among `ids`; unknown ids are skipped
    async fn find_batch(&self, ids: &[AccountId]) -> Result<Vec<Account>, StorageError>;

    /// Persist `accounts` and the partition checkpoint in one all-or-nothing transaction
    async fn upsert_batch(
        &self,
        accounts: &[Account],
        offset: PartitionOffset,
    ) -> Result<(), StorageError>;
}

/// Per-partition checkpoints, committed alongside account writes
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// Committed offset, `None` before the first successful batch
    async fn find_offset(&self, partition: PartitionId) -> Result<Option<u64>, StorageError>;
}

/// Concurrent id -> balance cache
pub trait BalanceCache: Send + Sync {
    fn get(&self, id: AccountId) -> Result<Option<i64>, CacheError>;

    /// Insert unless a value is already present; the first writer wins
    fn put_if_absent(&self, id: AccountId, balance: i64) -> Result<(), CacheError>;

    fn evict(&self, id: AccountId) -> Result<(), CacheError>;

    fn clear(&self) -> Result<(), CacheError>;
}
