//! Time-windowed Count-Min sketch over the whole traffic stream.
//!
//! Counts how often each key was admitted, in bounded memory. Estimates never
//! undercount (barring lost concurrent updates) but may overcount when keys
//! collide in every row.
//!
//! Two aging mechanisms coexist:
//! - Lazy: every bucket carries the index of the window that last touched it.
//!   An increment landing in a newer window zeroes the bucket first.
//! - Eager: [`FrequencyEstimator::reset`] zeroes everything, driven by the
//!   [`WindowRotator`](crate::application::rotator::WindowRotator).

use crate::infrastructure::builder::BuildError;
use ahash::RandomState;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

// Row hashers are seeded deterministically so estimates are reproducible
const ROW_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Approximate per-key frequency counter with windowed decay.
///
/// Updates use plain relaxed loads and stores rather than read-modify-write
/// atomics, so concurrent increments of one bucket may be lost. Callers only
/// need an approximation.
///
/// # Example
/// ```
/// use fluxgate::FrequencyEstimator;
/// use std::time::Duration;
///
/// let sketch = FrequencyEstimator::new(4, 1024, Duration::from_secs(10)).unwrap();
/// sketch.increment(42, 0);
/// sketch.increment(42, 1);
/// assert!(sketch.estimate(42) >= 2);
/// sketch.reset();
/// assert_eq!(sketch.estimate(42), 0);
/// ```
#[derive(Debug)]
pub struct FrequencyEstimator {
    depth: usize,
    width: usize,
    window_nanos: i64,
    /// `depth` rows of `width` counters, row-major
    counters: Box<[AtomicU64]>,
    /// One epoch per bucket index, shared by all rows
    epochs: Box<[AtomicI64]>,
    hashers: Box<[RandomState]>,
}

impl FrequencyEstimator {
    /// Create a sketch of `depth` rows by `width` buckets.
    ///
    /// # Errors
    /// Returns `BuildError` if `depth` is zero, `width` is not a power of two,
    /// or `window` is zero.
    pub fn new(depth: usize, width: usize, window: Duration) -> Result<Self, BuildError> {
        if depth == 0 {
            return Err(BuildError::ZeroSketchDepth);
        }
        if !width.is_power_of_two() {
            return Err(BuildError::SketchWidthNotPowerOfTwo(width));
        }
        if window.is_zero() {
            return Err(BuildError::ZeroSliceWindow);
        }
        let window_nanos = i64::try_from(window.as_nanos()).unwrap_or(i64::MAX);

        let counters = (0..depth * width).map(|_| AtomicU64::new(0)).collect();
        let epochs = (0..width).map(|_| AtomicI64::new(0)).collect();
        let hashers = (0..depth as u64)
            .map(|row| {
                let seed = ROW_SEED.wrapping_mul(row + 1);
                RandomState::with_seeds(seed, seed.rotate_left(17), seed ^ row, !seed)
            })
            .collect();

        Ok(Self {
            depth,
            width,
            window_nanos,
            counters,
            epochs,
            hashers,
        })
    }

    /// Count one occurrence of `key` at `now_nanos`.
    pub fn increment(&self, key: u64, now_nanos: i64) {
        let window = now_nanos.div_euclid(self.window_nanos);
        for row in 0..self.depth {
            let index = self.index_for(key, row);
            let counter = &self.counters[row * self.width + index];
            let epoch = &self.epochs[index];

            if epoch.load(Ordering::Relaxed) != window {
                counter.store(0, Ordering::Relaxed);
                epoch.store(window, Ordering::Relaxed);
            }

            let count = counter.load(Ordering::Relaxed);
            counter.store(count.saturating_add(1), Ordering::Relaxed);
        }
    }

    /// Estimated count for `key`: the minimum across rows.
    pub fn estimate(&self, key: u64) -> u64 {
        (0..self.depth)
            .map(|row| {
                let index = self.index_for(key, row);
                self.counters[row * self.width + index].load(Ordering::Relaxed)
            })
            .min()
            .unwrap_or(0)
    }

    /// Zero every counter and epoch.
    pub fn reset(&self) {
        for counter in self.counters.iter() {
            counter.store(0, Ordering::Relaxed);
        }
        for epoch in self.epochs.iter() {
            epoch.store(0, Ordering::Relaxed);
        }
    }

    /// Number of rows.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Buckets per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Length of one lazy-decay window.
    pub fn window(&self) -> Duration {
        Duration::from_nanos(self.window_nanos as u64)
    }

    fn index_for(&self, key: u64, row: usize) -> usize {
        // width is a power of two
        (BuildHasher::hash_one(&self.hashers[row], key) as usize) & (self.width - 1)
    }
}
