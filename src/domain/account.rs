use std::fmt;
use std::hash::{Hash, Hasher};

use super::error::DomainError;

/// Account identifier, a non-negative 32-bit signed value on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(u32);

impl AccountId {
    pub const MAX: u32 = i32::MAX as u32;

    /// Validate a caller-supplied id
    pub fn new(id: i64) -> Result<Self, DomainError> {
        if id < 0 {
            return Err(DomainError::NegativeAccountId(id));
        }
        if id > Self::MAX as i64 {
            return Err(DomainError::AccountIdOutOfRange(id));
        }
        Ok(Self(id as u32))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Record key used for partition routing
    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

impl TryFrom<i32> for AccountId {
    type Error = DomainError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        Self::new(id as i64)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Balance account. Created on the first applied delta, never deleted.
#[derive(Debug, Clone, Copy)]
pub struct Account {
    id: AccountId,
    balance: i64,
}

impl Account {
    pub fn new(id: AccountId, balance: i64) -> Self {
        Self { id, balance }
    }

    /// Account as seen before any delta was applied
    pub fn empty(id: AccountId) -> Self {
        Self::new(id, 0)
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub(crate) fn set_balance(&mut self, balance: i64) {
        self.balance = balance;
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.balance == other.balance
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.balance.hash(state);
    }
}
