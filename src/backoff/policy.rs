//! Backoff parameters and the in-flight join primitive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use super::jitter;

/// Tunable backoff parameters. Invalid fields are ignored at construction
/// (the default is kept), so a partially bad config still yields a usable
/// executor.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// First wait between attempts. Must be non-zero.
    pub initial_duration: Duration,
    /// Ceiling on a single wait.
    pub max_duration: Duration,
    /// Half-width cap for the random jitter applied to each wait.
    pub jitter_limit: Duration,
    /// Multiplier applied to the wait after each failed attempt. Must be > 1.
    pub backoff_factor: f64,
    /// Retries after the free initial attempt; total attempts = this + 1.
    pub max_retry_count: usize,
    /// Overall wall-clock budget for one `run` call, armed after the first
    /// failure.
    pub backoff_time_limit: Duration,
    /// Log each failed attempt at warn level.
    pub error_log: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_duration: Duration::from_millis(10),
            max_duration: Duration::from_secs(3600),
            jitter_limit: Duration::from_secs(60),
            backoff_factor: 1.5,
            max_retry_count: 50,
            backoff_time_limit: Duration::from_secs(300),
            error_log: true,
        }
    }
}

/// Retry executor: wraps a fallible async operation with jittered
/// exponential waits, an overall deadline and cooperative cancellation.
/// See [`Backoff::run`].
///
/// Immutable after construction; `run` may be called concurrently from many
/// tasks. The only shared mutable state is the in-flight counter consumed by
/// [`Backoff::close`].
#[derive(Debug)]
pub struct Backoff {
    pub(super) initial_duration: Duration,
    pub(super) max_duration: Duration,
    /// Growth ceiling: once the wait reaches this, the next wait is pinned
    /// to `max_duration`.
    pub(super) duration_limit: Duration,
    pub(super) jitter_limit: Duration,
    pub(super) backoff_factor: f64,
    pub(super) max_retry_count: usize,
    pub(super) backoff_time_limit: Duration,
    pub(super) error_log: bool,
    pub(super) in_flight: InFlight,
}

impl Backoff {
    /// Build an executor from `config`, field by field. Each invalid field
    /// is logged and replaced with its default rather than failing the
    /// whole construction.
    pub fn new(config: BackoffConfig) -> Self {
        let defaults = BackoffConfig::default();

        let initial_duration = if config.initial_duration.is_zero() {
            tracing::warn!("ignoring zero initial_duration, keeping default");
            defaults.initial_duration
        } else {
            config.initial_duration
        };
        let backoff_factor = if config.backoff_factor <= 1.0 || !config.backoff_factor.is_finite() {
            tracing::warn!(
                factor = config.backoff_factor,
                "ignoring backoff_factor <= 1, keeping default"
            );
            defaults.backoff_factor
        } else {
            config.backoff_factor
        };
        let max_duration = if config.max_duration < initial_duration {
            tracing::warn!("ignoring max_duration below initial_duration, keeping default");
            defaults.max_duration
        } else {
            config.max_duration
        };

        Self {
            initial_duration,
            max_duration,
            duration_limit: max_duration.div_f64(backoff_factor),
            jitter_limit: config.jitter_limit,
            backoff_factor,
            max_retry_count: config.max_retry_count,
            backoff_time_limit: config.backoff_time_limit,
            error_log: config.error_log,
            in_flight: InFlight::new(),
        }
    }

    /// Grow the un-jittered wait in place and return the jittered wait to
    /// actually sleep for.
    pub(super) fn next_wait(&self, current: &mut Duration) -> Duration {
        *current = jitter::grow(
            *current,
            self.backoff_factor,
            self.duration_limit,
            self.max_duration,
        );
        jitter::add_jitter(*current, self.jitter_limit)
    }

    /// Wait until every in-flight [`Backoff::run`] call has finished. Does
    /// not cancel them. Returns immediately when none are running.
    pub async fn close(&self) {
        self.in_flight.wait_idle().await;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

/// Counts in-flight `run` calls so `close` can join them. A plain atomic
/// plus a notify; per-call retry state never lives here.
#[derive(Debug)]
pub(super) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub(super) fn enter(&self) -> InFlightGuard<'_> {
        self.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard { owner: self }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

pub(super) struct InFlightGuard<'a> {
    owner: &'a InFlight,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.owner.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.owner.idle.notify_waiters();
        }
    }
}
