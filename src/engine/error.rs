use thiserror::Error;

use crate::domain::DomainError;
use crate::storage::StorageError;

/// Errors from applying a batch; nothing is committed when one is returned
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Storage error: {0}")]
    Store(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        assert_eq!(
            ApplyError::Domain(DomainError::Overflow(4)).to_string(),
            "Domain error: Balance overflow for account 4"
        );
        assert_eq!(
            ApplyError::Store(StorageError::CommitFailed("timeout".to_string())).to_string(),
            "Storage error: Transaction commit failed: timeout"
        );
    }

    #[test]
    fn storage_error_conversion() {
        let err = ApplyError::from(StorageError::CommitFailed("x".to_string()));

        match err {
            ApplyError::Store(StorageError::CommitFailed(_)) => {}
            _ => panic!("Expected Store variant"),
        }
    }
}
