pub mod error;
pub mod pool;
pub mod worker;

// Re-export commonly used types
pub use error::{PoolError, WorkerError};
pub use pool::{PartitionLag, WorkerPool};
pub use worker::{
    CycleOutcome, PartitionWorker, STALL_FAILURE_THRESHOLD, WorkerSettings, WorkerState,
    WorkerStatus,
};
