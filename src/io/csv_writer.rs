use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::error::IoError;
use crate::domain::Account;

#[derive(Serialize)]
struct BalanceRow {
    account: u32,
    balance: i64,
}

/// Write an `account,balance` CSV snapshot and flush `writer`
pub async fn write_snapshot<W>(accounts: &[Account], mut writer: W) -> Result<(), IoError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    csv_writer.write_record(["account", "balance"])?;
    for account in accounts {
        csv_writer.serialize(BalanceRow {
            account: account.id().get(),
            balance: account.balance(),
        })?;
    }

    let buffer = csv_writer
        .into_inner()
        .map_err(|e| IoError::Buffer(e.to_string()))?;

    writer.write_all(&buffer).await?;
    writer.flush().await?;
    Ok(())
}
