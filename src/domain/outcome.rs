//! Result of a single admission check.

use std::time::Duration;

/// Allow/block decision with the time after which a retry may succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateLimitOutcome {
    allowed: bool,
    retry_after_nanos: u64,
}

impl RateLimitOutcome {
    /// An admitted request.
    pub const fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after_nanos: 0,
        }
    }

    /// A rejected request that may be retried after `retry_after_nanos`.
    pub const fn blocked(retry_after_nanos: u64) -> Self {
        Self {
            allowed: false,
            retry_after_nanos,
        }
    }

    /// Whether the request was admitted.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Whether the request was rejected.
    pub fn is_blocked(&self) -> bool {
        !self.allowed
    }

    /// Nanoseconds until a retry may be admitted. Zero for admitted requests.
    pub fn retry_after_nanos(&self) -> u64 {
        self.retry_after_nanos
    }

    /// Retry-after as a `Duration`, e.g. for a `Retry-After` header.
    pub fn retry_after(&self) -> Duration {
        Duration::from_nanos(self.retry_after_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed() {
        let outcome = RateLimitOutcome::allowed();
        assert!(outcome.is_allowed());
        assert!(!outcome.is_blocked());
        assert_eq!(outcome.retry_after_nanos(), 0);
        assert_eq!(outcome.retry_after(), Duration::ZERO);
    }

    #[test]
    fn test_blocked() {
        let outcome = RateLimitOutcome::blocked(1_500_000_000);
        assert!(outcome.is_blocked());
        assert_eq!(outcome.retry_after(), Duration::from_millis(1500));
        assert_eq!(outcome.retry_after().as_secs(), 1);
    }
}
