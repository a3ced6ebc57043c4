//! Account balances maintained from a partitioned log of signed deltas.
//!
//! Writes are appended to the log keyed by account id; one worker per
//! partition merges each fetched batch per account and commits the new
//! balances together with the partition offset. Reads go through a
//! cache-aside layer that is invalidated after every commit.

pub mod app;
pub mod config;
pub mod domain;
pub mod engine;
pub mod io;
pub mod prelude;
pub mod service;
pub mod storage;
pub mod streaming;
pub mod transport;
