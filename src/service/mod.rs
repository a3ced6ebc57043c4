pub mod account;
pub mod cache_aside;
pub mod error;
pub mod stats;

// Re-export commonly used types
pub use account::{AccountService, LedgerService};
pub use cache_aside::CacheAside;
pub use error::ServiceError;
pub use stats::{InstrumentedService, InvocationStats, StatsReporter};
