pub mod cache;
pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use cache::ConcurrentCache;
pub use error::{CacheError, StorageError};
pub use memory::{MemoryStore, StoreOpCounts};
pub use traits::{AccountStore, BalanceCache, OffsetStore};
