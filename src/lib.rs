//! # fluxgate
//!
//! Embeddable adaptive rate limiting for request-serving systems.
//!
//! Given a per-request key, fluxgate decides whether the request may proceed
//! and, when it may not, how long the caller should wait. Per-key state stays
//! bounded in memory, and every instance enforces only its share of a
//! fleet-wide quota, derived from observed local versus cluster traffic.
//!
//! ## Quick Start
//!
//! ```rust
//! use fluxgate::{Policy, RateLimitOrchestrator, RequestKey};
//!
//! let orchestrator = RateLimitOrchestrator::builder()
//!     .with_shard_capacity(10_000)
//!     .build()
//!     .unwrap();
//!
//! // 10 requests per second with a burst of 20, for every key
//! let policy = Policy::new("api", 10.0, 20.0, 60).unwrap();
//! let lookup = move |_key: u64| Some(policy.clone());
//!
//! let key = RequestKey::builder()
//!     .ip("203.0.113.7")
//!     .route("/login")
//!     .build("secret");
//!
//! let outcome = orchestrator.check(key.as_u64(), &lookup, 0);
//! assert!(outcome.is_allowed());
//! ```
//!
//! ## Architecture
//!
//! Two tiers cooperate on every [`check`](RateLimitOrchestrator::check):
//!
//! - **Tier A** is exact. Each key owns a lock-free GCRA limiter
//!   ([`PerKeyLimiter`]) kept in a bounded, frequency-aware cache
//!   ([`HotKeyCache`]). One-off keys wait in a small probation segment so a
//!   flood of them cannot push out limiters that see steady traffic.
//! - **Tier B** is approximate. Admitted requests feed a time-windowed
//!   Count-Min sketch ([`FrequencyEstimator`]), reset periodically by a
//!   [`WindowRotator`], and a fixed-size [`HeavyHitterTracker`].
//!
//! Nominal limits are scaled by the instance's share of cluster traffic,
//! tracked by an EWMA [`TrafficEstimator`]. Feed it gossip with
//! [`RateLimitOrchestrator::ingest_cluster_estimate`].
//!
//! ## Policies
//!
//! Policies are resolved per request through the [`PolicyLookup`] port.
//! Closures implement it; [`PolicyRegistry`] is a ready-made in-memory
//! implementation. A lookup returning `None` fails open.
//!
//! ```rust
//! use fluxgate::{Policy, RateLimitOrchestrator};
//!
//! let orchestrator = RateLimitOrchestrator::builder().build().unwrap();
//! orchestrator.register_policy(Policy::new("login", 1.0, 1.0, 60).unwrap());
//! orchestrator.policies().bind(42, "login");
//!
//! assert!(orchestrator.check_registered(42, 0).is_allowed());
//! assert!(orchestrator.check_registered(42, 0).is_blocked());
//!
//! // Unbound key without a default policy: allowed, nothing tracked
//! assert!(orchestrator.check_registered(7, 0).is_allowed());
//! ```
//!
//! A key's limiter keeps the parameters it was created with until the cache
//! evicts it; policy changes apply to keys that are not cached.
//!
//! ## Observability
//!
//! ```rust
//! # use fluxgate::RateLimitOrchestrator;
//! # let orchestrator = RateLimitOrchestrator::builder().build().unwrap();
//! let snapshot = orchestrator.stats().snapshot();
//! println!("Requests: {}", snapshot.total_requests);
//! println!("Block rate: {:.2}%", snapshot.block_rate() * 100.0);
//!
//! // Hex-encoded heavy hitters, one `key:count` per line
//! print!("{}", orchestrator.heatmap_reporter().render_top_keys());
//! ```
//!
//! Export outcomes to your own backend by implementing [`MetricsObserver`].
//! Diagnostics are emitted through `tracing`; the library never installs a
//! subscriber.
//!
//! ## Feature Flags
//!
//! - `async`: periodic heatmap reporting on a tokio runtime
//! - `serde`: (de)serialization of policies, adaptive state and stats
//! - `test-helpers`: exposes `infrastructure::mocks` to downstream tests

// Domain layer - pure values and rate arithmetic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - data structures and adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    adaptive::{AdaptiveState, LimitScaler, MIN_QPS},
    gcra::PerKeyLimiter,
    key::{RequestKey, RequestKeyBuilder},
    outcome::RateLimitOutcome,
    policy::{Policy, PolicyError},
};

pub use application::{
    estimator::TrafficEstimator,
    limiter::RateLimitOrchestrator,
    ports::{Clock, MetricsObserver, NoopMetrics, PolicyLookup},
    rotator::WindowRotator,
    stats::{Stats, StatsSnapshot},
};

pub use infrastructure::{
    builder::{BuildError, RateLimitOrchestratorBuilder},
    cache::HotKeyCache,
    clock::SystemClock,
    heatmap::{HeatmapReporter, ReportConfig},
    heavy_hitters::{HeavyHitterEntry, HeavyHitterTracker},
    registry::PolicyRegistry,
    sketch::FrequencyEstimator,
};
