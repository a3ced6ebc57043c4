pub mod applier;
pub mod error;

// Re-export commonly used types
pub use applier::BatchApplier;
pub use error::ApplyError;
