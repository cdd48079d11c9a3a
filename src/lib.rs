//! Resilient chunked streaming I/O for remote blob stores.
//!
//! Moves large binary objects (vector dumps, backups) to and from a blob
//! store over an unreliable network: a backoff-controlled retry executor
//! plus pull/push stream sessions that turn bounded ranged fetches and one
//! multipart upload into ordinary byte streams.

pub mod backoff;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod stream;

pub use error::{Error, ErrorClass};
