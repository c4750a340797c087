//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock clock for testing.
///
/// Time only moves when a test moves it, so `check_now` calls become as
/// deterministic as explicit timestamps.
///
/// # Examples
///
/// ```
/// use fluxgate::infrastructure::mocks::MockClock;
/// use fluxgate::Clock;
/// use std::time::Duration;
///
/// let clock = MockClock::new(0);
/// assert_eq!(clock.now_nanos(), 0);
///
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(clock.now_nanos(), 250_000_000);
///
/// clock.set(5);
/// assert_eq!(clock.now_nanos(), 5);
/// ```
///
/// # Thread Safety
///
/// Clones share the same time value, so advancing one clone advances all.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_nanos: Arc<AtomicI64>,
}

impl MockClock {
    /// Create a mock clock reading `start_nanos`.
    pub fn new(start_nanos: i64) -> Self {
        Self {
            now_nanos: Arc::new(AtomicI64::new(start_nanos)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.now_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Set the clock to an absolute reading.
    pub fn set(&self, now_nanos: i64) {
        self.now_nanos.store(now_nanos, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_nanos(&self) -> i64 {
        self.now_nanos.load(Ordering::SeqCst)
    }
}
