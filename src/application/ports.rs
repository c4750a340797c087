//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Callers and infrastructure adapters implement these ports.

use crate::domain::adaptive::AdaptiveState;
use crate::domain::policy::Policy;
use std::fmt::Debug;
use std::sync::Arc;

/// Port for resolving the policy that applies to a key.
///
/// Returning `None` means no policy applies and the request is admitted
/// (fail-open). Closures `Fn(u64) -> Option<Policy>` implement this trait.
///
/// # Example
/// ```
/// use fluxgate::{Policy, PolicyLookup};
///
/// let policy = Policy::new("all", 10.0, 10.0, 60).unwrap();
/// let lookup = move |_key: u64| Some(policy.clone());
/// assert!(lookup.lookup(7).is_some());
/// ```
pub trait PolicyLookup {
    /// Resolve the policy for `key_hash`.
    fn lookup(&self, key_hash: u64) -> Option<Policy>;
}

impl<F> PolicyLookup for F
where
    F: Fn(u64) -> Option<Policy>,
{
    fn lookup(&self, key_hash: u64) -> Option<Policy> {
        self(key_hash)
    }
}

/// Port for exporting admission outcomes to a metrics backend.
///
/// Called on the hot path, so implementations should be cheap and non-blocking.
pub trait MetricsObserver: Send + Sync + Debug {
    /// A request was admitted.
    fn record_allowed(&self);

    /// A request was rejected.
    fn record_blocked(&self);

    /// The adaptive traffic estimate changed.
    fn record_adaptive_state(&self, _state: &AdaptiveState) {}
}

/// Observer that discards everything. Used when no backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsObserver for NoopMetrics {
    fn record_allowed(&self) {}

    fn record_blocked(&self) {}
}

impl<T> MetricsObserver for Arc<T>
where
    T: MetricsObserver + ?Sized,
{
    fn record_allowed(&self) {
        (**self).record_allowed()
    }

    fn record_blocked(&self) {
        (**self).record_blocked()
    }

    fn record_adaptive_state(&self, state: &AdaptiveState) {
        (**self).record_adaptive_state(state)
    }
}

/// Port for obtaining the current time as monotonic nanoseconds.
///
/// Only used by the convenience entry points; the core `check` takes `now`
/// explicitly. Infrastructure provides `SystemClock` and `MockClock`.
pub trait Clock: Send + Sync + Debug {
    /// Nanoseconds since an arbitrary, fixed origin.
    fn now_nanos(&self) -> i64;
}
