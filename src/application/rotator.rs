//! Periodic hard reset of the Tier B frequency sketch.

use crate::infrastructure::sketch::FrequencyEstimator;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Resets a [`FrequencyEstimator`] at most once per rotation period.
///
/// The first rotation is due one full period after time zero. Whichever
/// caller first observes a due rotation and wins the compare-and-swap on the
/// threshold performs the reset; concurrent callers neither wait nor reset.
#[derive(Debug)]
pub struct WindowRotator {
    sketch: Arc<FrequencyEstimator>,
    rotation_period_nanos: i64,
    next_rotation_nanos: AtomicI64,
}

impl WindowRotator {
    /// Create a rotator for `sketch`.
    ///
    /// The builder rejects zero periods; a zero period here rotates on every call.
    pub fn new(sketch: Arc<FrequencyEstimator>, rotation_period: Duration) -> Self {
        let rotation_period_nanos = i64::try_from(rotation_period.as_nanos()).unwrap_or(i64::MAX);
        Self {
            sketch,
            rotation_period_nanos,
            next_rotation_nanos: AtomicI64::new(rotation_period_nanos),
        }
    }

    /// Reset the sketch if the rotation threshold has been reached.
    ///
    /// Returns `true` when this call performed the reset.
    pub fn rotate_if_needed(&self, now_nanos: i64) -> bool {
        let threshold = self.next_rotation_nanos.load(Ordering::Acquire);
        if now_nanos < threshold {
            return false;
        }

        let next = now_nanos.saturating_add(self.rotation_period_nanos);
        if self
            .next_rotation_nanos
            .compare_exchange(threshold, next, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.sketch.reset();
        tracing::debug!(now_nanos, next_rotation_nanos = next, "rotated frequency sketch");
        true
    }

    /// Timestamp at which the next rotation becomes due.
    pub fn next_rotation_nanos(&self) -> i64 {
        self.next_rotation_nanos.load(Ordering::Acquire)
    }

    /// The sketch this rotator resets.
    pub fn sketch(&self) -> &Arc<FrequencyEstimator> {
        &self.sketch
    }
}
