use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::error::ApplyError;
use crate::domain::{
    Account, AccountId, DeltaRecord, PartitionId, PartitionOffset, apply_merged, merge_deltas,
};
use crate::storage::AccountStore;

/// Merges a batch of deltas per account and commits the resulting balances
/// together with the partition checkpoint.
///
/// A failed commit leaves balances and offset untouched, so re-running the
/// same batch from the same offset produces the same result.
pub struct BatchApplier<S>
where
    S: AccountStore,
{
    store: Arc<S>,
}

impl<S> Clone for BatchApplier<S>
where
    S: AccountStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> BatchApplier<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Apply `records` read from `partition` and move its checkpoint to `next_offset`.
    ///
    /// Returns the resulting account for every id the batch touched.
    pub async fn apply(
        &self,
        records: &[DeltaRecord],
        partition: PartitionId,
        next_offset: u64,
    ) -> Result<HashMap<AccountId, Account>, ApplyError> {
        if records.is_empty() {
            return Ok(HashMap::new());
        }

        let merged = merge_deltas(records);
        let ids: Vec<AccountId> = merged.keys().copied().collect();

        let mut accounts: HashMap<AccountId, Account> = self
            .store
            .find_batch(&ids)
            .await?
            .into_iter()
            .map(|account| (account.id(), account))
            .collect();

        for (id, total) in &merged {
            let account = accounts.entry(*id).or_insert_with(|| Account::empty(*id));
            apply_merged(account, *total)?;
        }

        let updated: Vec<Account> = accounts.values().copied().collect();
        self.store
            .upsert_batch(&updated, PartitionOffset::new(partition, next_offset))
            .await?;

        debug!(
            partition = partition.get(),
            records = records.len(),
            accounts = updated.len(),
            next_offset,
            "Applied batch"
        );

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::storage::{MemoryStore, OffsetStore, StorageError};

    fn id(raw: i64) -> AccountId {
        AccountId::new(raw).unwrap()
    }

    fn record(raw: i64, delta: i64) -> DeltaRecord {
        DeltaRecord::new(id(raw), delta)
    }

    fn partition(raw: u32) -> PartitionId {
        PartitionId::new(raw, 5).unwrap()
    }

    async fn balance(store: &MemoryStore, raw: i64) -> Option<i64> {
        store.find(id(raw)).await.unwrap().map(|a| a.balance())
    }

    #[tokio::test]
    async fn applies_two_accounts_and_advances_offset() {
        let store = Arc::new(MemoryStore::new());
        let applier = BatchApplier::new(Arc::clone(&store));

        let batch = [record(1, 100), record(2, 200)];
        let result = applier.apply(&batch, partition(0), 10 + 2).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[&id(1)].balance(), 100);
        assert_eq!(balance(&store, 1).await, Some(100));
        assert_eq!(balance(&store, 2).await, Some(200));
        assert_eq!(store.find_offset(partition(0)).await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn merges_deltas_for_same_account() {
        let store = Arc::new(MemoryStore::new());
        let applier = BatchApplier::new(Arc::clone(&store));

        let result = applier
            .apply(&[record(47, 113), record(47, -50)], partition(3), 2)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[&id(47)].balance(), 63);
        assert_eq!(store.op_counts().batch_finds, 1);
        assert_eq!(store.op_counts().commits, 1);
    }

    #[tokio::test]
    async fn adds_to_existing_balance() {
        let store = Arc::new(MemoryStore::new());
        let applier = BatchApplier::new(Arc::clone(&store));

        applier.apply(&[record(5, 10)], partition(0), 1).await.unwrap();
        applier.apply(&[record(5, -3)], partition(0), 2).await.unwrap();

        assert_eq!(balance(&store, 5).await, Some(7));
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let store = Arc::new(MemoryStore::new());
        let applier = BatchApplier::new(Arc::clone(&store));

        let result = applier.apply(&[], partition(0), 0).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(store.op_counts().batch_finds, 0);
        assert_eq!(store.op_counts().commits, 0);
    }

    #[tokio::test]
    async fn failed_commit_leaves_balances_and_offset() {
        let store = Arc::new(MemoryStore::new());
        let applier = BatchApplier::new(Arc::clone(&store));
        applier.apply(&[record(1, 10)], partition(0), 1).await.unwrap();

        store.fail_next_commits(1);
        let err = applier
            .apply(&[record(1, 5), record(2, 7)], partition(0), 3)
            .await
            .unwrap_err();

        assert!(matches!(err, ApplyError::Store(StorageError::CommitFailed(_))));
        assert_eq!(balance(&store, 1).await, Some(10));
        assert_eq!(balance(&store, 2).await, None);
        assert_eq!(store.find_offset(partition(0)).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn retry_after_failure_counts_once() {
        let store = Arc::new(MemoryStore::new());
        let applier = BatchApplier::new(Arc::clone(&store));
        let batch = [record(1, 100), record(1, 1)];

        store.fail_next_commits(1);
        assert!(applier.apply(&batch, partition(0), 2).await.is_err());
        applier.apply(&batch, partition(0), 2).await.unwrap();

        assert_eq!(balance(&store, 1).await, Some(101));
        assert_eq!(store.find_offset(partition(0)).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn overflow_aborts_whole_batch() {
        let store = Arc::new(MemoryStore::new());
        let applier = BatchApplier::new(Arc::clone(&store));
        applier
            .apply(&[record(1, i64::MAX)], partition(0), 1)
            .await
            .unwrap();

        let err = applier
            .apply(&[record(2, 5), record(1, 1)], partition(0), 3)
            .await
            .unwrap_err();

        assert_eq!(err, ApplyError::Domain(DomainError::Overflow(1)));
        assert_eq!(balance(&store, 2).await, None);
        assert_eq!(store.find_offset(partition(0)).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn chunking_does_not_change_result() {
        let deltas = [
            record(1, 40),
            record(2, -7),
            record(1, -15),
            record(3, 9),
            record(2, 30),
            record(1, 2),
        ];

        let whole = Arc::new(MemoryStore::new());
        BatchApplier::new(Arc::clone(&whole))
            .apply(&deltas, partition(0), 6)
            .await
            .unwrap();

        let chunked = Arc::new(MemoryStore::new());
        let applier = BatchApplier::new(Arc::clone(&chunked));
        let mut offset = 0;
        for chunk in deltas.chunks(4) {
            offset += chunk.len() as u64;
            applier.apply(chunk, partition(0), offset).await.unwrap();
        }

        assert_eq!(whole.accounts().unwrap(), chunked.accounts().unwrap());
    }
}
