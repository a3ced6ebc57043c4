//! Prelude module for convenient imports
//!
//! Import everything you need with: `use account_ledger::prelude::*;`

// Domain types
pub use crate::domain::{
    Account, AccountId, DeltaRecord, DomainError, PartitionId, PartitionOffset, Partitioner,
};

// Transport types
pub use crate::transport::{LogEntry, LogTransport, MemoryLog, TransportError};

// Storage types
pub use crate::storage::{
    AccountStore, BalanceCache, CacheError, ConcurrentCache, MemoryStore, OffsetStore,
    StorageError, StoreOpCounts,
};

// Engine types
pub use crate::engine::{ApplyError, BatchApplier};

// Streaming types
pub use crate::streaming::{
    CycleOutcome, PartitionLag, PartitionWorker, PoolError, WorkerError, WorkerPool,
    WorkerSettings, WorkerState, WorkerStatus,
};

// Service types
pub use crate::service::{
    AccountService, CacheAside, InstrumentedService, InvocationStats, LedgerService,
    ServiceError, StatsReporter,
};

// IO types
pub use crate::io::{CsvIntentStream, IoError, RawIntentRecord, write_snapshot};

// Config and app types
pub use crate::app::{AppError, CliApp, IngestSummary, LedgerHandle, Runtime};
pub use crate::config::{Config, ConfigError};
