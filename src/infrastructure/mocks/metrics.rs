//! Metrics observer recording every callback.

use crate::application::ports::MetricsObserver;
use crate::domain::adaptive::AdaptiveState;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Observer counting admissions and remembering adaptive-state updates.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    allowed: AtomicU64,
    blocked: AtomicU64,
    states: Mutex<Vec<AdaptiveState>>,
}

impl RecordingMetrics {
    /// Create an observer with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `record_allowed` calls.
    pub fn allowed(&self) -> u64 {
        self.allowed.load(Ordering::SeqCst)
    }

    /// Number of `record_blocked` calls.
    pub fn blocked(&self) -> u64 {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Every adaptive state reported so far, oldest first.
    pub fn adaptive_states(&self) -> Vec<AdaptiveState> {
        self.states.lock().clone()
    }

    /// The most recently reported adaptive state.
    pub fn last_adaptive_state(&self) -> Option<AdaptiveState> {
        self.states.lock().last().copied()
    }
}

impl MetricsObserver for RecordingMetrics {
    fn record_allowed(&self) {
        self.allowed.fetch_add(1, Ordering::SeqCst);
    }

    fn record_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::SeqCst);
    }

    fn record_adaptive_state(&self, state: &AdaptiveState) {
        self.states.lock().push(*state);
    }
}
