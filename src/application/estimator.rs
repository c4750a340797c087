//! EWMA traffic estimator.
//!
//! Tracks a smoothed local QPS from permits served by this instance and a
//! smoothed cluster QPS from optional gossip samples. The current estimate is
//! an immutable [`AdaptiveState`] snapshot swapped atomically as a whole.

use crate::domain::adaptive::{sanitize_qps, AdaptiveState, MIN_QPS};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Weight of the newest sample in the moving average.
pub const ALPHA: f64 = 0.2;

/// Minimum time between two folds of local permits into the average.
pub const SAMPLE_INTERVAL_NANOS: i64 = 1_000_000_000;

/// Lock-free local/cluster QPS estimator.
///
/// Permits are accumulated with a single atomic add. Once a full sample
/// interval has elapsed, the one caller that wins the compare-and-swap on the
/// sample timestamp drains the accumulator and publishes a new snapshot;
/// everyone else returns immediately with the current snapshot.
#[derive(Debug)]
pub struct TrafficEstimator {
    pending_permits: AtomicU64,
    last_sample_nanos: AtomicI64,
    state: ArcSwap<AdaptiveState>,
}

impl TrafficEstimator {
    /// Create an estimator in the initial (alone in the cluster) state.
    pub fn new() -> Self {
        Self {
            pending_permits: AtomicU64::new(0),
            last_sample_nanos: AtomicI64::new(0),
            state: ArcSwap::from_pointee(AdaptiveState::initial()),
        }
    }

    /// Current snapshot after folding in any due local sample.
    pub fn observe(&self, now_nanos: i64) -> AdaptiveState {
        self.flush_samples(now_nanos);
        self.state()
    }

    /// Account for `permits` served locally.
    pub fn record_local_permits(&self, permits: u64, now_nanos: i64) -> AdaptiveState {
        if permits > 0 {
            self.pending_permits.fetch_add(permits, Ordering::AcqRel);
        }
        self.flush_samples(now_nanos);
        self.state()
    }

    /// Fold a gossiped cluster-wide QPS sample into the cluster estimate.
    ///
    /// Runs independently of the local sampling cadence. The cluster estimate
    /// is kept at or above the local estimate.
    pub fn ingest_cluster_estimate(&self, cluster_qps: f64, now_nanos: i64) -> AdaptiveState {
        let sample = sanitize_qps(cluster_qps);
        self.state.rcu(|current| {
            let smoothed = smooth(current.cluster_qps(), sample);
            let cluster = smoothed.max(current.local_qps());
            AdaptiveState::new(current.local_qps(), cluster, now_nanos)
        });
        self.state()
    }

    /// Current snapshot without sampling.
    pub fn state(&self) -> AdaptiveState {
        **self.state.load()
    }

    /// Share of the current snapshot.
    pub fn share(&self) -> f64 {
        self.state().share()
    }

    fn flush_samples(&self, now_nanos: i64) {
        let last = self.last_sample_nanos.load(Ordering::Acquire);
        let elapsed = now_nanos.saturating_sub(last);
        if elapsed < SAMPLE_INTERVAL_NANOS {
            return;
        }
        if self
            .last_sample_nanos
            .compare_exchange(last, now_nanos, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Another caller owns this interval's flush
            return;
        }

        let interval_seconds = elapsed as f64 / SAMPLE_INTERVAL_NANOS as f64;
        let permits = self.pending_permits.swap(0, Ordering::AcqRel);
        let sampled = sanitize_qps(permits as f64 / interval_seconds);

        let previous = self.state.rcu(|current| {
            let local = smooth(current.local_qps(), sampled);
            let cluster = local.max(current.cluster_qps());
            AdaptiveState::new(local, cluster, now_nanos)
        });

        tracing::trace!(
            permits,
            sampled_qps = sampled,
            previous_local_qps = previous.local_qps(),
            "folded local traffic sample"
        );
    }
}

impl Default for TrafficEstimator {
    fn default() -> Self {
        Self::new()
    }
}

fn smooth(previous: f64, sample: f64) -> f64 {
    let prev = previous.max(MIN_QPS);
    let next = ALPHA * sample.max(MIN_QPS) + (1.0 - ALPHA) * prev;
    if next.is_finite() {
        next
    } else {
        MIN_QPS
    }
}
