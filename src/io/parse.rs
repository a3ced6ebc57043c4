use serde::Deserialize;

/// One `account,delta` row of a write-intent file.
///
/// Values are kept as read; range checks and the missing-delta check are
/// done by the account service so that CSV input and direct callers are
/// validated the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RawIntentRecord {
    pub account: i64,
    pub delta: Option<i64>,
}
