//! Pure wait-duration math: bounded random jitter and capped growth.

use rand::Rng;
use std::time::Duration;

/// Jitter a wait duration: uniform in `[d - half, d + half)` where
/// `half = min(d / 10, limit)`. A zero result means "retry with no delay";
/// callers must not treat it as an error.
pub(crate) fn add_jitter(d: Duration, limit: Duration) -> Duration {
    let half = (d / 10).min(limit);
    if half.is_zero() {
        return d;
    }
    let span_ns = (half.as_nanos() as u64).saturating_mul(2);
    let offset = rand::thread_rng().gen_range(0..span_ns);
    d.saturating_sub(half) + Duration::from_nanos(offset)
}

/// Grow a wait duration by `factor`, saturating at `max_duration` once the
/// previous value reaches `duration_limit` (the ceiling below which one more
/// multiplication still stays under the cap).
pub(crate) fn grow(
    prev: Duration,
    factor: f64,
    duration_limit: Duration,
    max_duration: Duration,
) -> Duration {
    if prev >= duration_limit {
        max_duration
    } else {
        prev.mul_f64(factor)
    }
}
