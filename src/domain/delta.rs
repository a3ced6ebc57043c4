use super::account::AccountId;
use super::error::DomainError;

/// Immutable unit of durable intent: apply `delta` to `account_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeltaRecord {
    account_id: AccountId,
    delta: i64,
}

impl DeltaRecord {
    /// Encoded size: i32 account id followed by i64 delta, big-endian
    pub const ENCODED_LEN: usize = 12;

    pub fn new(account_id: AccountId, delta: i64) -> Self {
        Self { account_id, delta }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        buf.extend_from_slice(&(self.account_id.get() as i32).to_be_bytes());
        buf.extend_from_slice(&self.delta.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DomainError> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(DomainError::Decode(format!(
                "expected {} bytes, got {}",
                Self::ENCODED_LEN,
                bytes.len()
            )));
        }

        let (id_bytes, delta_bytes) = bytes.split_at(4);
        let raw_id = i32::from_be_bytes(
            id_bytes
                .try_into()
                .map_err(|_| DomainError::Decode("account id".to_string()))?,
        );
        let delta = i64::from_be_bytes(
            delta_bytes
                .try_into()
                .map_err(|_| DomainError::Decode("delta".to_string()))?,
        );

        let account_id = AccountId::try_from(raw_id)
            .map_err(|e| DomainError::Decode(e.to_string()))?;

        Ok(Self { account_id, delta })
    }
}
