//! Per-key GCRA limiter.
//!
//! The Generic Cell Rate Algorithm keeps a single "theoretical arrival time"
//! (TAT) per key. A request is admitted when it does not arrive earlier than
//! `TAT - burst_allowance`, after which the TAT advances by one emission
//! interval. This is equivalent to a token bucket but needs only one atomic
//! word of state.

use crate::domain::outcome::RateLimitOutcome;
use std::sync::atomic::{AtomicI64, Ordering};

/// Nanoseconds in the nominal one-second normalisation period.
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

const UNSET: i64 = i64::MIN;

/// Lock-free GCRA limiter for one key.
///
/// Admissions for the same limiter are serialised by a compare-and-swap loop
/// on the TAT. A retry of that loop only happens when another thread advanced
/// the TAT between our read and our swap; no caller ever blocks.
///
/// # Example
/// ```
/// use fluxgate::PerKeyLimiter;
///
/// // 5 permits per second, burst of 5
/// let limiter = PerKeyLimiter::per_second(5.0, 5.0);
/// for _ in 0..5 {
///     assert!(limiter.try_acquire(0).is_allowed());
/// }
/// let blocked = limiter.try_acquire(0);
/// assert_eq!(blocked.retry_after_nanos(), 200_000_000);
/// assert!(limiter.try_acquire(200_000_000).is_allowed());
/// ```
#[derive(Debug)]
pub struct PerKeyLimiter {
    emission_interval: i64,
    burst_allowance: i64,
    permits_per_second: f64,
    burst_tokens: i64,
    tat: AtomicI64,
}

impl PerKeyLimiter {
    /// Create a limiter with an explicit normalisation period.
    ///
    /// `burst_tokens` is rounded up and clamped to at least 1. A degenerate
    /// rate (zero, negative, NaN, infinite) still yields a usable limiter: the
    /// emission interval is clamped to `[1ns, i64::MAX]`.
    pub fn new(period_nanos: i64, permits_per_second: f64, burst_tokens: f64) -> Self {
        // `as` saturates on overflow and maps NaN to 0
        let interval = (period_nanos as f64 / permits_per_second) as i64;
        let emission_interval = interval.max(1);

        let burst = burst_tokens.ceil() as i64;
        let burst_tokens = burst.max(1);
        let burst_allowance = emission_interval.saturating_mul(burst_tokens - 1);

        Self {
            emission_interval,
            burst_allowance,
            permits_per_second,
            burst_tokens,
            tat: AtomicI64::new(UNSET),
        }
    }

    /// Create a limiter over the nominal one-second period.
    pub fn per_second(permits_per_second: f64, burst_tokens: f64) -> Self {
        Self::new(NANOS_PER_SECOND, permits_per_second, burst_tokens)
    }

    /// Try to admit one request at `now_nanos`.
    pub fn try_acquire(&self, now_nanos: i64) -> RateLimitOutcome {
        let mut current = self.tat.load(Ordering::Acquire);
        loop {
            let tat = if current == UNSET { now_nanos } else { current };
            let allow_at = tat.saturating_sub(self.burst_allowance);
            if now_nanos < allow_at {
                let wait = allow_at.saturating_sub(now_nanos);
                return RateLimitOutcome::blocked(wait as u64);
            }

            let next = tat.max(now_nanos).saturating_add(self.emission_interval);
            match self
                .tat
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return RateLimitOutcome::allowed(),
                // Contention: someone else moved the TAT, re-evaluate against it
                Err(observed) => current = observed,
            }
        }
    }

    /// Time between two admissions at the sustained rate.
    pub fn emission_interval_nanos(&self) -> i64 {
        self.emission_interval
    }

    /// Rate the limiter was constructed with.
    pub fn permits_per_second(&self) -> f64 {
        self.permits_per_second
    }

    /// Effective (rounded, clamped) burst size.
    pub fn burst_tokens(&self) -> i64 {
        self.burst_tokens
    }

    /// Current theoretical arrival time, `None` before the first admission.
    pub fn theoretical_arrival_nanos(&self) -> Option<i64> {
        match self.tat.load(Ordering::Acquire) {
            UNSET => None,
            tat => Some(tat),
        }
    }
}
