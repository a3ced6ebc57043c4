pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::TransportError;
pub use memory::MemoryLog;
pub use traits::{LogEntry, LogTransport};
