//! Rate limit orchestration.
//!
//! The orchestrator composes both tiers for every request: it resolves the
//! policy, scales the limit to this instance's share of cluster traffic, runs
//! the key's GCRA limiter from the hot-key cache and, on admission, feeds the
//! approximate frequency and heavy-hitter trackers.

use crate::application::estimator::TrafficEstimator;
use crate::application::ports::{Clock, MetricsObserver, PolicyLookup};
use crate::application::rotator::WindowRotator;
use crate::application::stats::Stats;
use crate::domain::adaptive::{AdaptiveState, LimitScaler};
use crate::domain::gcra::PerKeyLimiter;
use crate::domain::outcome::RateLimitOutcome;
use crate::domain::policy::Policy;
use crate::infrastructure::builder::RateLimitOrchestratorBuilder;
use crate::infrastructure::cache::HotKeyCache;
use crate::infrastructure::heatmap::HeatmapReporter;
use crate::infrastructure::heavy_hitters::{HeavyHitterEntry, HeavyHitterTracker};
use crate::infrastructure::registry::PolicyRegistry;
use crate::infrastructure::sketch::FrequencyEstimator;
use std::sync::Arc;

/// Coordinates rate limiting decisions.
///
/// Built with [`RateLimitOrchestrator::builder`]. All methods take `&self` and
/// are safe to call from many threads; share the orchestrator behind an `Arc`.
#[derive(Debug)]
pub struct RateLimitOrchestrator {
    pub(crate) cache: HotKeyCache<u64, Arc<PerKeyLimiter>>,
    pub(crate) frequency: Arc<FrequencyEstimator>,
    pub(crate) heavy_hitters: Arc<HeavyHitterTracker>,
    pub(crate) rotator: WindowRotator,
    pub(crate) estimator: TrafficEstimator,
    pub(crate) scaler: LimitScaler,
    pub(crate) observer: Arc<dyn MetricsObserver>,
    pub(crate) stats: Stats,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) policies: Arc<PolicyRegistry>,
}

impl RateLimitOrchestrator {
    /// Create a builder with default settings.
    pub fn builder() -> RateLimitOrchestratorBuilder {
        RateLimitOrchestratorBuilder::new()
    }

    /// Decide whether the request identified by `key_hash` may proceed.
    ///
    /// # Fail-Open Behavior
    /// When `lookup` yields no policy the request is allowed with no side
    /// effects: nothing is cached, counted or reported.
    ///
    /// # Frozen Parameters
    /// A key's limiter is built from the policy and adaptive share seen on its
    /// first miss and keeps those parameters until evicted from the cache.
    ///
    /// # Example
    /// ```
    /// use fluxgate::{Policy, RateLimitOrchestrator};
    ///
    /// let orchestrator = RateLimitOrchestrator::builder().build().unwrap();
    /// let policy = Policy::new("api", 1.0, 1.0, 60).unwrap();
    /// let lookup = move |_key: u64| Some(policy.clone());
    ///
    /// assert!(orchestrator.check(7, &lookup, 0).is_allowed());
    /// let blocked = orchestrator.check(7, &lookup, 0);
    /// assert!(blocked.is_blocked());
    /// assert_eq!(blocked.retry_after_nanos(), 1_000_000_000);
    /// ```
    pub fn check<L>(&self, key_hash: u64, lookup: &L, now_nanos: i64) -> RateLimitOutcome
    where
        L: PolicyLookup + ?Sized,
    {
        let Some(policy) = lookup.lookup(key_hash) else {
            tracing::trace!(key_hash, "no policy for key, failing open");
            return RateLimitOutcome::allowed();
        };

        let before = self.estimator.state();
        let state = self.estimator.observe(now_nanos);
        self.publish_if_changed(&before, state);

        let effective_limit = self.scaler.scale(policy.limit_per_second(), &state);
        let burst = policy.burst_tokens();
        let limiter = self.cache.get_or_compute(key_hash, || {
            Arc::new(PerKeyLimiter::per_second(effective_limit, burst))
        });

        let outcome = limiter.try_acquire(now_nanos);
        if outcome.is_allowed() {
            self.observer.record_allowed();
            self.stats.record_allowed();
            self.frequency.increment(key_hash, now_nanos);
            self.heavy_hitters.offer(key_hash);
            self.rotator.rotate_if_needed(now_nanos);

            let before = self.estimator.state();
            let after = self.estimator.record_local_permits(1, now_nanos);
            self.publish_if_changed(&before, after);
        } else {
            self.observer.record_blocked();
            self.stats.record_blocked();
        }
        outcome
    }

    /// [`check`](Self::check) against the configured clock.
    pub fn check_now<L>(&self, key_hash: u64, lookup: &L) -> RateLimitOutcome
    where
        L: PolicyLookup + ?Sized,
    {
        self.check(key_hash, lookup, self.clock.now_nanos())
    }

    /// [`check`](Self::check) against the orchestrator's own policy registry.
    pub fn check_registered(&self, key_hash: u64, now_nanos: i64) -> RateLimitOutcome {
        self.check(key_hash, self.policies.as_ref(), now_nanos)
    }

    /// Fold a gossiped cluster-wide QPS sample into the adaptive state.
    pub fn ingest_cluster_estimate(&self, cluster_qps: f64, now_nanos: i64) -> AdaptiveState {
        let state = self.estimator.ingest_cluster_estimate(cluster_qps, now_nanos);
        self.stats.record_adaptive_state(state);
        self.observer.record_adaptive_state(&state);
        tracing::debug!(
            cluster_qps = state.cluster_qps(),
            local_qps = state.local_qps(),
            share = state.share(),
            "ingested cluster estimate"
        );
        state
    }

    /// Current adaptive state, folding in any due local sample.
    pub fn adaptive_state(&self, now_nanos: i64) -> AdaptiveState {
        let before = self.estimator.state();
        let state = self.estimator.observe(now_nanos);
        self.publish_if_changed(&before, state);
        state
    }

    /// Whether `key_hash` currently holds a main-segment cache slot.
    pub fn is_hot(&self, key_hash: u64) -> bool {
        self.cache.is_hot(&key_hash)
    }

    /// Approximate admissions of `key_hash` in the current sketch window.
    pub fn frequency_estimate(&self, key_hash: u64) -> u64 {
        self.frequency.estimate(key_hash)
    }

    /// Current heavy hitters, highest count first.
    pub fn top_keys(&self) -> Vec<HeavyHitterEntry> {
        self.heavy_hitters.top_k()
    }

    /// The heavy-hitter tracker fed by admitted requests.
    pub fn heavy_hitters(&self) -> &Arc<HeavyHitterTracker> {
        &self.heavy_hitters
    }

    /// A reporter over this orchestrator's heavy hitters.
    pub fn heatmap_reporter(&self) -> HeatmapReporter {
        HeatmapReporter::new(Arc::clone(&self.heavy_hitters))
    }

    /// Register or replace a policy in the orchestrator's registry.
    pub fn register_policy(&self, policy: Policy) -> Option<Policy> {
        self.policies.register(policy)
    }

    /// The orchestrator's policy registry.
    pub fn policies(&self) -> &Arc<PolicyRegistry> {
        &self.policies
    }

    /// Admission counters and the last published adaptive state.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Limiters resident in the hot-key cache.
    pub fn cache_size(&self) -> usize {
        self.cache.size()
    }

    /// Configured hot-key cache capacity.
    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Limiters evicted from the hot-key cache so far.
    pub fn cache_evictions(&self) -> u64 {
        self.cache.evictions()
    }

    fn publish_if_changed(&self, before: &AdaptiveState, after: AdaptiveState) {
        if *before != after {
            self.stats.record_adaptive_state(after);
            self.observer.record_adaptive_state(&after);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gcra::NANOS_PER_SECOND;
    use crate::infrastructure::mocks::{MockClock, RecordingMetrics};

    const SECOND: i64 = NANOS_PER_SECOND;

    fn orchestrator() -> RateLimitOrchestrator {
        RateLimitOrchestrator::builder()
            .with_shard_capacity(64)
            .with_sketch(4, 1024)
            .with_heavy_keeper(64, 0.9)
            .build()
            .unwrap()
    }

    fn fixed(limit: f64, burst: f64) -> impl Fn(u64) -> Option<Policy> {
        let policy = Policy::new("fixed", limit, burst, 60).unwrap();
        move |_key| Some(policy.clone())
    }

    #[test]
    fn test_missing_policy_fails_open() {
        let metrics = Arc::new(RecordingMetrics::new());
        let orchestrator = RateLimitOrchestrator::builder()
            .with_observer(metrics.clone())
            .with_shard_capacity(16)
            .build()
            .unwrap();

        let outcome = orchestrator.check(9, &|_: u64| None::<Policy>, 0);

        assert!(outcome.is_allowed());
        assert_eq!(outcome.retry_after_nanos(), 0);
        assert_eq!(orchestrator.cache_size(), 0);
        assert_eq!(orchestrator.frequency_estimate(9), 0);
        assert_eq!(orchestrator.stats().total_requests(), 0);
        assert_eq!(metrics.allowed(), 0);
        assert!(orchestrator.top_keys().is_empty());
    }

    #[test]
    fn test_allow_block_allow() {
        let orchestrator = orchestrator();
        let lookup = fixed(1.0, 1.0);

        assert!(orchestrator.check(1, &lookup, 0).is_allowed());

        let blocked = orchestrator.check(1, &lookup, 0);
        assert!(blocked.is_blocked());
        let retry = blocked.retry_after_nanos();
        assert!(retry > 0);

        assert!(orchestrator.check(1, &lookup, retry as i64).is_allowed());
    }

    #[test]
    fn test_burst_then_retry() {
        let orchestrator = orchestrator();
        let lookup = fixed(5.0, 5.0);

        for _ in 0..5 {
            assert!(orchestrator.check(3, &lookup, 0).is_allowed());
        }
        let blocked = orchestrator.check(3, &lookup, 0);
        assert!(blocked.is_blocked());
        assert_eq!(blocked.retry_after_nanos(), (SECOND / 5) as u64);
    }

    #[test]
    fn test_keys_are_independent() {
        let orchestrator = orchestrator();
        let lookup = fixed(1.0, 1.0);

        assert!(orchestrator.check(1, &lookup, 0).is_allowed());
        assert!(orchestrator.check(2, &lookup, 0).is_allowed());
        assert!(orchestrator.check(1, &lookup, 0).is_blocked());
    }

    #[test]
    fn test_cached_limiter_ignores_policy_change() {
        let orchestrator = orchestrator();

        let strict = fixed(1.0, 1.0);
        assert!(orchestrator.check(5, &strict, 0).is_allowed());

        // A far more generous policy does not rebuild the cached limiter
        let generous = fixed(1_000.0, 1_000.0);
        assert!(orchestrator.check(5, &generous, 0).is_blocked());
    }

    #[test]
    fn test_admission_feeds_trackers() {
        let orchestrator = orchestrator();
        let lookup = fixed(100.0, 100.0);

        for _ in 0..3 {
            orchestrator.check(77, &lookup, 10);
        }

        assert!(orchestrator.frequency_estimate(77) >= 3);
        assert_eq!(
            orchestrator.top_keys(),
            vec![HeavyHitterEntry { key: 77, count: 3 }]
        );
        assert!(orchestrator.is_hot(77));
    }

    #[test]
    fn test_blocked_requests_not_tracked() {
        let orchestrator = orchestrator();
        let lookup = fixed(1.0, 1.0);

        orchestrator.check(4, &lookup, 0);
        orchestrator.check(4, &lookup, 0);
        orchestrator.check(4, &lookup, 0);

        assert_eq!(orchestrator.top_keys()[0].count, 1);
        assert_eq!(orchestrator.stats().total_requests(), 3);
        assert_eq!(orchestrator.stats().blocked_requests(), 2);
    }

    #[test]
    fn test_observer_notified() {
        let metrics = Arc::new(RecordingMetrics::new());
        let orchestrator = RateLimitOrchestrator::builder()
            .with_observer(metrics.clone())
            .with_shard_capacity(16)
            .build()
            .unwrap();
        let lookup = fixed(1.0, 1.0);

        orchestrator.check(1, &lookup, 0);
        orchestrator.check(1, &lookup, 0);

        assert_eq!(metrics.allowed(), 1);
        assert_eq!(metrics.blocked(), 1);
    }

    #[test]
    fn test_rotation_clears_frequency() {
        let orchestrator = RateLimitOrchestrator::builder()
            .with_shard_capacity(16)
            .with_sketch(2, 256)
            .with_rotation_period(std::time::Duration::from_millis(100))
            .with_slice_window(std::time::Duration::from_secs(60))
            .build()
            .unwrap();
        let lookup = fixed(1_000.0, 1_000.0);

        orchestrator.check(8, &lookup, 0);
        orchestrator.check(8, &lookup, 0);
        assert!(orchestrator.frequency_estimate(8) >= 2);

        // The admission at the rotation threshold is counted, then the sketch resets
        orchestrator.check(8, &lookup, 100_000_000);
        assert_eq!(orchestrator.frequency_estimate(8), 0);
    }

    #[test]
    fn test_gossip_shrinks_new_limiters() {
        let metrics = Arc::new(RecordingMetrics::new());
        let orchestrator = RateLimitOrchestrator::builder()
            .with_observer(metrics.clone())
            .with_shard_capacity(16)
            .build()
            .unwrap();

        // Repeated gossip pushes the cluster estimate far above local traffic
        for _ in 0..20 {
            orchestrator.ingest_cluster_estimate(1_000_000.0, 0);
        }
        let state = orchestrator.adaptive_state(0);
        assert!(state.share() < 0.01);
        assert_eq!(orchestrator.stats().adaptive_state(), Some(state));
        assert_eq!(metrics.last_adaptive_state(), Some(state));

        // 100 permits/s scaled by the share floors at 1 permit/s
        let lookup = fixed(100.0, 1.0);
        assert!(orchestrator.check(1, &lookup, 0).is_allowed());
        let blocked = orchestrator.check(1, &lookup, 0);
        assert_eq!(blocked.retry_after_nanos(), SECOND as u64);
    }

    #[test]
    fn test_local_permits_flush_into_state() {
        let orchestrator = orchestrator();
        let lookup = fixed(1_000.0, 1_000.0);

        for _ in 0..100 {
            orchestrator.check(1, &lookup, 0);
        }
        let state = orchestrator.adaptive_state(SECOND);

        // 100 permits over one second, folded into the average
        assert!((state.local_qps() - (0.2 * 100.0 + 0.8 * 1.0)).abs() < 1e-9);
        assert_eq!(orchestrator.stats().adaptive_state(), Some(state));
    }

    #[test]
    fn test_check_now_uses_clock() {
        let clock = MockClock::new(0);
        let orchestrator = RateLimitOrchestrator::builder()
            .with_clock(Arc::new(clock.clone()))
            .with_shard_capacity(16)
            .build()
            .unwrap();
        let lookup = fixed(1.0, 1.0);

        assert!(orchestrator.check_now(1, &lookup).is_allowed());
        assert!(orchestrator.check_now(1, &lookup).is_blocked());

        clock.advance(std::time::Duration::from_secs(1));
        assert!(orchestrator.check_now(1, &lookup).is_allowed());
    }

    #[test]
    fn test_registered_policies() {
        let orchestrator = orchestrator();
        orchestrator.register_policy(Policy::new("login", 1.0, 1.0, 60).unwrap());
        orchestrator.policies().bind(11, "login");

        assert!(orchestrator.check_registered(11, 0).is_allowed());
        assert!(orchestrator.check_registered(11, 0).is_blocked());

        // Unbound key, no default: fail open without caching
        assert!(orchestrator.check_registered(12, 0).is_allowed());
        assert!(!orchestrator.is_hot(12));
        assert_eq!(orchestrator.cache_size(), 1);
    }

    #[test]
    fn test_concurrent_checks_respect_burst() {
        use std::thread;

        let orchestrator = Arc::new(orchestrator());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let orchestrator = Arc::clone(&orchestrator);
                thread::spawn(move || {
                    let lookup = fixed(10.0, 20.0);
                    (0..10)
                        .filter(|_| orchestrator.check(42, &lookup, 0).is_allowed())
                        .count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 20);
        assert_eq!(orchestrator.stats().total_requests(), 80);
        assert_eq!(orchestrator.stats().blocked_requests(), 60);
    }
}
