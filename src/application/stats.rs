//! Request statistics exposed read-only to callers.
//!
//! Counts every decision made by the orchestrator and remembers the last
//! adaptive traffic estimate it acted on.

use crate::domain::adaptive::AdaptiveState;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for admission decisions.
///
/// All counters use atomic operations for thread-safe updates and reads.
/// Clones share the same underlying counters.
#[derive(Debug, Clone)]
pub struct Stats {
    inner: Arc<StatsInner>,
}

#[derive(Debug)]
struct StatsInner {
    /// Every checked request, allowed or blocked
    total_requests: AtomicU64,
    /// Requests rejected by a limiter
    blocked_requests: AtomicU64,
    /// Last adaptive estimate the orchestrator observed
    adaptive_state: ArcSwapOption<AdaptiveState>,
}

impl Stats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatsInner {
                total_requests: AtomicU64::new(0),
                blocked_requests: AtomicU64::new(0),
                adaptive_state: ArcSwapOption::empty(),
            }),
        }
    }

    /// Record an admitted request.
    pub(crate) fn record_allowed(&self) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected request.
    pub(crate) fn record_blocked(&self) {
        self.inner.blocked_requests.fetch_add(1, Ordering::Relaxed);
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Remember the latest adaptive estimate.
    pub(crate) fn record_adaptive_state(&self, state: AdaptiveState) {
        self.inner.adaptive_state.store(Some(Arc::new(state)));
    }

    /// Get the total number of checked requests.
    pub fn total_requests(&self) -> u64 {
        self.inner.total_requests.load(Ordering::Relaxed)
    }

    /// Get the number of blocked requests.
    pub fn blocked_requests(&self) -> u64 {
        self.inner.blocked_requests.load(Ordering::Relaxed)
    }

    /// Get the last adaptive estimate, if any was recorded.
    pub fn adaptive_state(&self) -> Option<AdaptiveState> {
        self.inner.adaptive_state.load().as_deref().copied()
    }

    /// Get a snapshot of all statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests(),
            blocked_requests: self.blocked_requests(),
            adaptive_state: self.adaptive_state(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSnapshot {
    /// Every checked request, allowed or blocked
    pub total_requests: u64,
    /// Requests rejected by a limiter
    pub blocked_requests: u64,
    /// Last adaptive estimate observed
    pub adaptive_state: Option<AdaptiveState>,
}

impl StatsSnapshot {
    /// Number of admitted requests.
    pub fn allowed_requests(&self) -> u64 {
        self.total_requests.saturating_sub(self.blocked_requests)
    }

    /// Fraction of requests blocked (0.0 to 1.0), 0.0 when nothing was checked.
    pub fn block_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.blocked_requests as f64 / self.total_requests as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let stats = Stats::new();
        assert_eq!(stats.total_requests(), 0);
        assert_eq!(stats.blocked_requests(), 0);
        assert_eq!(stats.adaptive_state(), None);
    }

    #[test]
    fn test_blocked_counts_toward_total() {
        let stats = Stats::new();
        stats.record_allowed();
        stats.record_allowed();
        stats.record_blocked();

        assert_eq!(stats.total_requests(), 3);
        assert_eq!(stats.blocked_requests(), 1);
        assert_eq!(stats.snapshot().allowed_requests(), 2);
    }

    #[test]
    fn test_block_rate() {
        let stats = Stats::new();
        assert_eq!(stats.snapshot().block_rate(), 0.0);

        stats.record_allowed();
        stats.record_blocked();
        assert!((stats.snapshot().block_rate() - 0.5).abs() < f64::EPSILON);

        stats.record_blocked();
        stats.record_blocked();
        assert!((stats.snapshot().block_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_adaptive_state_is_replaced() {
        let stats = Stats::new();
        stats.record_adaptive_state(AdaptiveState::new(2.0, 4.0, 1));
        stats.record_adaptive_state(AdaptiveState::new(3.0, 9.0, 2));

        let state = stats.adaptive_state().unwrap();
        assert_eq!(state.updated_at_nanos(), 2);
        assert_eq!(stats.snapshot().adaptive_state, Some(state));
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = Stats::new();
        let other = stats.clone();
        other.record_blocked();
        assert_eq!(stats.blocked_requests(), 1);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let stats = Stats::new();
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let s = stats.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_allowed();
                        s.record_blocked();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.total_requests(), 2000);
        assert_eq!(stats.blocked_requests(), 1000);
    }
}
