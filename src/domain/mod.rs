pub mod account;
pub mod delta;
pub mod error;
pub mod merge;
pub mod partition;

// Re-export commonly used types
pub use account::{Account, AccountId};
pub use delta::DeltaRecord;
pub use error::DomainError;
pub use merge::{apply_merged, merge_deltas};
pub use partition::{PartitionId, PartitionOffset, Partitioner};
