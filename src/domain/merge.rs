use std::collections::HashMap;

use super::account::{Account, AccountId};
use super::delta::DeltaRecord;
use super::error::DomainError;

/// Sum deltas per account.
///
/// Totals are accumulated in `i128`, so the result does not depend on the
/// order of the records or on how a longer stream was split into batches.
pub fn merge_deltas<'a, I>(records: I) -> HashMap<AccountId, i128>
where
    I: IntoIterator<Item = &'a DeltaRecord>,
{
    let mut merged: HashMap<AccountId, i128> = HashMap::new();
    for record in records {
        *merged.entry(record.account_id()).or_default() += record.delta() as i128;
    }
    merged
}

/// Apply a merged total to an account, failing if the balance leaves `i64`
pub fn apply_merged(account: &mut Account, merged: i128) -> Result<(), DomainError> {
    let next = account.balance() as i128 + merged;
    let next = i64::try_from(next).map_err(|_| DomainError::Overflow(account.id().get()))?;
    account.set_balance(next);
    Ok(())
}
