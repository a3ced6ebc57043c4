pub mod cli;
pub mod error;
pub mod runtime;

// Re-export commonly used types
pub use cli::CliApp;
pub use error::AppError;
pub use runtime::{IngestSummary, LedgerHandle, Runtime};
