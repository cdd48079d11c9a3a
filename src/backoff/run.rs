//! The retry loop: run an async operation until it succeeds, turns out
//! terminal, or the budget/deadline/cancellation stops it.

use std::future::Future;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorClass};

use super::jitter::add_jitter;
use super::policy::Backoff;

impl Backoff {
    /// Run `op` with backoff.
    ///
    /// The first invocation is free: it happens immediately and does not
    /// count against `max_retry_count`. After a retryable failure the
    /// overall deadline is armed and up to `max_retry_count` further
    /// attempts are made, each followed by a three-way race between the
    /// deadline ([`Error::TimeoutExceeded`]), the caller's token
    /// ([`Error::Cancelled`]) and the jittered wait timer (grow and retry).
    ///
    /// Terminal-classified errors are returned without retrying. When the
    /// retry budget runs out, the final attempt's error is returned as-is,
    /// unwrapped.
    pub async fn run<T, F, Fut>(&self, ctx: &CancellationToken, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut last = match op().await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        if last.class() == ErrorClass::Terminal {
            return Err(last);
        }

        let _guard = self.in_flight.enter();

        // Per-call retry state; nothing here outlives this invocation.
        let mut current = self.initial_duration;
        let deadline = sleep(self.backoff_time_limit);
        tokio::pin!(deadline);
        let wait = sleep(add_jitter(current, self.jitter_limit));
        tokio::pin!(wait);

        for attempt in 1..=self.max_retry_count {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if self.error_log {
                        tracing::warn!(attempt, error = %e, "attempt failed");
                    }
                    if e.class() == ErrorClass::Terminal {
                        return Err(e);
                    }
                    last = e;
                }
            }

            tokio::select! {
                biased;
                _ = &mut deadline => {
                    return Err(Error::TimeoutExceeded { source: Box::new(last) });
                }
                _ = ctx.cancelled() => {
                    return Err(Error::Cancelled { source: Box::new(last) });
                }
                _ = &mut wait => {
                    let jittered = self.next_wait(&mut current);
                    wait.as_mut().reset(Instant::now() + jittered);
                }
            }
        }

        Err(last)
    }
}
