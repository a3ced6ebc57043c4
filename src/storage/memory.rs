use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use super::error::StorageError;
use super::traits::{AccountStore, OffsetStore};
use crate::domain::{Account, AccountId, PartitionId, PartitionOffset};

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, i64>,
    offsets: HashMap<PartitionId, u64>,
}

/// Counts of store calls, for asserting on access patterns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOpCounts {
    pub finds: u64,
    pub batch_finds: u64,
    pub commits: u64,
    pub offset_reads: u64,
}

#[derive(Default)]
struct OpCounters {
    finds: AtomicU64,
    batch_finds: AtomicU64,
    commits: AtomicU64,
    offset_reads: AtomicU64,
}

/// Transactional in-memory account and offset store.
///
/// Both tables sit behind one lock, so a commit is all-or-nothing and
/// readers never observe half of one.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    counters: OpCounters,
    failing_commits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail before writing anything
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    pub fn op_counts(&self) -> StoreOpCounts {
        StoreOpCounts {
            finds: self.counters.finds.load(Ordering::SeqCst),
            batch_finds: self.counters.batch_finds.load(Ordering::SeqCst),
            commits: self.counters.commits.load(Ordering::SeqCst),
            offset_reads: self.counters.offset_reads.load(Ordering::SeqCst),
        }
    }

    /// Every account, ordered by id
    pub fn accounts(&self) -> Result<Vec<Account>, StorageError> {
        let tables = self.read()?;
        let mut accounts: Vec<Account> = tables
            .accounts
            .iter()
            .map(|(id, balance)| Account::new(*id, *balance))
            .collect();
        accounts.sort_by_key(|account| account.id());
        Ok(accounts)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.tables
            .read()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        self.tables
            .write()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))
    }

    fn take_commit_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        self.counters.finds.fetch_add(1, Ordering::SeqCst);
        let tables = self.read()?;
        Ok(tables
            .accounts
            .get(&id)
            .map(|balance| Account::new(id, *balance)))
    }

    async fn find_batch(&self, ids: &[AccountId]) -> Result<Vec<Account>, StorageError> {
        self.counters.batch_finds.fetch_add(1, Ordering::SeqCst);
        let tables = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                tables
                    .accounts
                    .get(id)
                    .map(|balance| Account::new(*id, *balance))
            })
            .collect())
    }

    async fn upsert_batch(
        &self,
        accounts: &[Account],
        offset: PartitionOffset,
    ) -> Result<(), StorageError> {
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        if self.take_commit_failure() {
            return Err(StorageError::CommitFailed("injected failure".to_string()));
        }

        let mut tables = self.write()?;

        // Validate before touching anything so a rejected commit leaves no trace
        if let Some(stored) = tables.offsets.get(&offset.partition).copied()
            && offset.offset < stored
        {
            return Err(StorageError::OffsetRegression {
                partition: offset.partition.get(),
                stored,
                attempted: offset.offset,
            });
        }

        for account in accounts {
            tables.accounts.insert(account.id(), account.balance());
        }
        tables.offsets.insert(offset.partition, offset.offset);

        debug!(
            partition = offset.partition.get(),
            offset = offset.offset,
            accounts = accounts.len(),
            "Committed batch"
        );
        Ok(())
    }
}

#[async_trait]
impl OffsetStore for MemoryStore {
    async fn find_offset(&self, partition: PartitionId) -> Result<Option<u64>, StorageError> {
        self.counters.offset_reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.read()?;
        Ok(tables.offsets.get(&partition).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(raw: i64) -> AccountId {
        AccountId::new(raw).unwrap()
    }

    fn offset(partition: u32, offset: u64) -> PartitionOffset {
        PartitionOffset::new(PartitionId::new(partition, 5).unwrap(), offset)
    }

    #[tokio::test]
    async fn unknown_account_is_absent() {
        let store = MemoryStore::new();
        assert_eq!(store.find(id(1)).await.unwrap(), None);
        assert_eq!(store.op_counts().finds, 1);
    }

    #[tokio::test]
    async fn commit_writes_accounts_and_offset() {
        let store = MemoryStore::new();
        let accounts = [Account::new(id(1), 100), Account::new(id(2), 200)];

        store.upsert_batch(&accounts, offset(3, 12)).await.unwrap();

        assert_eq!(store.find(id(1)).await.unwrap(), Some(accounts[0]));
        assert_eq!(
            store
                .find_offset(PartitionId::new(3, 5).unwrap())
                .await
                .unwrap(),
            Some(12)
        );
    }

    #[tokio::test]
    async fn find_batch_skips_unknown_ids() {
        let store = MemoryStore::new();
        store
            .upsert_batch(&[Account::new(id(1), 5)], offset(0, 1))
            .await
            .unwrap();

        let found = store.find_batch(&[id(1), id(2)]).await.unwrap();
        assert_eq!(found, vec![Account::new(id(1), 5)]);
    }

    #[tokio::test]
    async fn failed_commit_changes_nothing() {
        let store = MemoryStore::new();
        store
            .upsert_batch(&[Account::new(id(1), 5)], offset(0, 1))
            .await
            .unwrap();

        store.fail_next_commits(1);
        let result = store
            .upsert_batch(&[Account::new(id(1), 50), Account::new(id(2), 7)], offset(0, 3))
            .await;

        assert!(matches!(result, Err(StorageError::CommitFailed(_))));
        assert_eq!(store.find(id(1)).await.unwrap().unwrap().balance(), 5);
        assert_eq!(store.find(id(2)).await.unwrap(), None);
        assert_eq!(
            store
                .find_offset(PartitionId::new(0, 5).unwrap())
                .await
                .unwrap(),
            Some(1)
        );
    }

    #[tokio::test]
    async fn offset_regression_is_rejected() {
        let store = MemoryStore::new();
        store.upsert_batch(&[], offset(1, 10)).await.unwrap();

        let result = store
            .upsert_batch(&[Account::new(id(9), 1)], offset(1, 4))
            .await;

        assert_eq!(
            result,
            Err(StorageError::OffsetRegression {
                partition: 1,
                stored: 10,
                attempted: 4
            })
        );
        assert_eq!(store.find(id(9)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn accounts_listed_in_id_order() {
        let store = MemoryStore::new();
        store
            .upsert_batch(
                &[Account::new(id(3), 3), Account::new(id(1), 1)],
                offset(0, 2),
            )
            .await
            .unwrap();

        let ids: Vec<u32> = store
            .accounts()
            .unwrap()
            .iter()
            .map(|a| a.id().get())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn concurrent_commits_on_distinct_partitions() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();

        for partition in 0..5u32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for n in 1..=50u64 {
                    let account = Account::new(id(partition as i64), n as i64);
                    store
                        .upsert_batch(&[account], offset(partition, n))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for partition in 0..5u32 {
            let p = PartitionId::new(partition, 5).unwrap();
            assert_eq!(store.find_offset(p).await.unwrap(), Some(50));
            assert_eq!(
                store.find(id(partition as i64)).await.unwrap().unwrap().balance(),
                50
            );
        }
        assert_eq!(store.op_counts().commits, 250);
    }
}
