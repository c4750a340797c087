//! Construction and validation of a [`RateLimitOrchestrator`].
//!
//! Every structural parameter is checked eagerly in [`build`]; invalid values
//! are rejected, never clamped.
//!
//! [`build`]: RateLimitOrchestratorBuilder::build

use crate::application::estimator::TrafficEstimator;
use crate::application::limiter::RateLimitOrchestrator;
use crate::application::ports::{Clock, MetricsObserver, NoopMetrics};
use crate::application::rotator::WindowRotator;
use crate::application::stats::Stats;
use crate::domain::adaptive::LimitScaler;
use crate::infrastructure::cache::HotKeyCache;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::heavy_hitters::HeavyHitterTracker;
use crate::infrastructure::registry::PolicyRegistry;
use crate::infrastructure::sketch::FrequencyEstimator;
use std::sync::Arc;
use std::time::Duration;

/// Default number of per-key limiters kept in the hot-key cache.
pub const DEFAULT_SHARD_CAPACITY: usize = 65_536;
/// Default number of rows in the traffic sketch.
pub const DEFAULT_SKETCH_DEPTH: usize = 4;
/// Default buckets per row in the traffic sketch.
pub const DEFAULT_SKETCH_WIDTH: usize = 65_536;
/// Default period between hard resets of the traffic sketch.
pub const DEFAULT_ROTATION_PERIOD: Duration = Duration::from_secs(1);
/// Default length of one lazy-decay window in the traffic sketch.
pub const DEFAULT_SLICE_WINDOW: Duration = Duration::from_secs(10);
/// Default number of heavy-hitter slots.
pub const DEFAULT_HEAVY_KEEPER_CAPACITY: usize = 1024;
/// Default decay applied to colliding heavy-hitter counts.
pub const DEFAULT_HEAVY_KEEPER_DECAY: f64 = 0.9;

/// Error returned when a component configuration is invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Hot-key cache capacity must be greater than zero
    ZeroShardCapacity,
    /// Sketch depth must be greater than zero
    ZeroSketchDepth,
    /// Sketch width must be a non-zero power of two
    SketchWidthNotPowerOfTwo(usize),
    /// Rotation period must be greater than zero
    ZeroRotationPeriod,
    /// Sketch slice window must be greater than zero
    ZeroSliceWindow,
    /// Heavy-hitter capacity must be greater than zero
    ZeroHeavyKeeperCapacity,
    /// Heavy-hitter decay must lie strictly between 0 and 1
    InvalidHeavyKeeperDecay(f64),
    /// Heatmap report interval must be greater than zero
    ZeroReportInterval,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::ZeroShardCapacity => write!(f, "shard capacity must be greater than 0"),
            BuildError::ZeroSketchDepth => write!(f, "sketch depth must be greater than 0"),
            BuildError::SketchWidthNotPowerOfTwo(width) => {
                write!(f, "sketch width must be a power of two, got {}", width)
            }
            BuildError::ZeroRotationPeriod => write!(f, "rotation period must be greater than 0"),
            BuildError::ZeroSliceWindow => write!(f, "slice window must be greater than 0"),
            BuildError::ZeroHeavyKeeperCapacity => {
                write!(f, "heavy keeper capacity must be greater than 0")
            }
            BuildError::InvalidHeavyKeeperDecay(decay) => {
                write!(f, "heavy keeper decay must be in (0, 1), got {}", decay)
            }
            BuildError::ZeroReportInterval => write!(f, "report interval must be greater than 0"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Builder for constructing a [`RateLimitOrchestrator`].
///
/// # Example
/// ```
/// use fluxgate::RateLimitOrchestrator;
/// use std::time::Duration;
///
/// let orchestrator = RateLimitOrchestrator::builder()
///     .with_shard_capacity(1_024)
///     .with_sketch(4, 4_096)
///     .with_rotation_period(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(orchestrator.cache_capacity(), 1_024);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitOrchestratorBuilder {
    shard_capacity: usize,
    sketch_depth: usize,
    sketch_width: usize,
    rotation_period: Duration,
    slice_window: Duration,
    heavy_keeper_capacity: usize,
    heavy_keeper_decay: f64,
    observer: Option<Arc<dyn MetricsObserver>>,
    clock: Option<Arc<dyn Clock>>,
    policies: Option<Arc<PolicyRegistry>>,
}

impl Default for RateLimitOrchestratorBuilder {
    fn default() -> Self {
        Self {
            shard_capacity: DEFAULT_SHARD_CAPACITY,
            sketch_depth: DEFAULT_SKETCH_DEPTH,
            sketch_width: DEFAULT_SKETCH_WIDTH,
            rotation_period: DEFAULT_ROTATION_PERIOD,
            slice_window: DEFAULT_SLICE_WINDOW,
            heavy_keeper_capacity: DEFAULT_HEAVY_KEEPER_CAPACITY,
            heavy_keeper_decay: DEFAULT_HEAVY_KEEPER_DECAY,
            observer: None,
            clock: None,
            policies: None,
        }
    }
}

impl RateLimitOrchestratorBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of per-key limiters kept in memory.
    ///
    /// Default: 65 536
    pub fn with_shard_capacity(mut self, capacity: usize) -> Self {
        self.shard_capacity = capacity;
        self
    }

    /// Set the traffic sketch shape. `width` must be a power of two.
    ///
    /// Default: 4 rows of 65 536 buckets
    pub fn with_sketch(mut self, depth: usize, width: usize) -> Self {
        self.sketch_depth = depth;
        self.sketch_width = width;
        self
    }

    /// Set how often the traffic sketch is hard-reset.
    ///
    /// Default: 1 second
    pub fn with_rotation_period(mut self, period: Duration) -> Self {
        self.rotation_period = period;
        self
    }

    /// Set the lazy-decay window of the traffic sketch.
    ///
    /// Default: 10 seconds
    pub fn with_slice_window(mut self, window: Duration) -> Self {
        self.slice_window = window;
        self
    }

    /// Set the heavy-hitter slot count and collision decay.
    ///
    /// Default: 1024 slots, decay 0.9
    pub fn with_heavy_keeper(mut self, capacity: usize, decay: f64) -> Self {
        self.heavy_keeper_capacity = capacity;
        self.heavy_keeper_decay = decay;
        self
    }

    /// Export admission outcomes to `observer`.
    ///
    /// Default: [`NoopMetrics`]
    pub fn with_observer(mut self, observer: Arc<dyn MetricsObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set the clock used by [`RateLimitOrchestrator::check_now`] (mainly for testing).
    ///
    /// Default: [`SystemClock`]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share an existing policy registry with the orchestrator.
    pub fn with_policy_registry(mut self, policies: Arc<PolicyRegistry>) -> Self {
        self.policies = Some(policies);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    /// Returns `BuildError` if any structural parameter is invalid.
    pub fn build(self) -> Result<RateLimitOrchestrator, BuildError> {
        if self.rotation_period.is_zero() {
            return Err(BuildError::ZeroRotationPeriod);
        }

        let cache = HotKeyCache::new(self.shard_capacity)?;
        let frequency = Arc::new(FrequencyEstimator::new(
            self.sketch_depth,
            self.sketch_width,
            self.slice_window,
        )?);
        let heavy_hitters = Arc::new(HeavyHitterTracker::new(
            self.heavy_keeper_capacity,
            self.heavy_keeper_decay,
        )?);
        let rotator = WindowRotator::new(Arc::clone(&frequency), self.rotation_period);

        tracing::debug!(
            shard_capacity = self.shard_capacity,
            sketch_depth = self.sketch_depth,
            sketch_width = self.sketch_width,
            rotation_period_ms = self.rotation_period.as_millis() as u64,
            slice_window_ms = self.slice_window.as_millis() as u64,
            heavy_keeper_capacity = self.heavy_keeper_capacity,
            heavy_keeper_decay = self.heavy_keeper_decay,
            "built rate limit orchestrator"
        );

        Ok(RateLimitOrchestrator {
            cache,
            frequency,
            heavy_hitters,
            rotator,
            estimator: TrafficEstimator::new(),
            scaler: LimitScaler::new(),
            observer: self.observer.unwrap_or_else(|| Arc::new(NoopMetrics)),
            stats: Stats::new(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            policies: self.policies.unwrap_or_default(),
        })
    }
}
