//! Backoff-controlled retry execution.
//!
//! This module owns the wait-duration math (jitter, capped exponential
//! growth) and the [`Backoff`] executor that wraps a fallible async
//! operation with retries, an overall deadline and cooperative
//! cancellation. The streaming layer drives its ranged fetches through it;
//! any other remote call in the platform can reuse it unchanged.

mod jitter;
mod policy;
mod run;

pub use policy::{Backoff, BackoffConfig};
