//! Approximate tracker of the most frequent keys.
//!
//! A fixed array of slots indexed by `hash(key) mod capacity`. Colliding keys
//! never chain: a newcomer decays the resident count and takes the slot over
//! once that count has decayed to one.

use crate::infrastructure::builder::BuildError;
use ahash::RandomState;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

const SLOT_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// One reported key with its approximate count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeavyHitterEntry {
    /// Key hash.
    pub key: u64,
    /// Approximate number of offers.
    pub count: u32,
}

#[derive(Debug, Default)]
struct Slot {
    key: AtomicU64,
    /// Zero marks an empty slot
    count: AtomicU32,
}

/// Fixed-capacity heavy-hitter tracker with deterministic decay.
///
/// Slot updates are plain relaxed loads and stores, so concurrent offers to
/// the same slot may lose updates. Counts are estimates.
///
/// # Example
/// ```
/// use fluxgate::HeavyHitterTracker;
///
/// let tracker = HeavyHitterTracker::new(128, 0.9).unwrap();
/// for _ in 0..10 {
///     tracker.offer(0xbeef);
/// }
/// let top = tracker.top_k();
/// assert_eq!(top[0].key, 0xbeef);
/// assert_eq!(top[0].count, 10);
/// ```
#[derive(Debug)]
pub struct HeavyHitterTracker {
    slots: Box<[Slot]>,
    decay: f64,
    hasher: RandomState,
}

impl HeavyHitterTracker {
    /// Create a tracker with `capacity` slots and a decay factor in `(0, 1)`.
    ///
    /// # Errors
    /// Returns [`BuildError`] for a zero capacity or an out-of-range decay.
    pub fn new(capacity: usize, decay: f64) -> Result<Self, BuildError> {
        if capacity == 0 {
            return Err(BuildError::ZeroHeavyKeeperCapacity);
        }
        if !(decay > 0.0 && decay < 1.0) {
            return Err(BuildError::InvalidHeavyKeeperDecay(decay));
        }

        let [k0, k1, k2, k3] = SLOT_SEEDS;
        Ok(Self {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            decay,
            hasher: RandomState::with_seeds(k0, k1, k2, k3),
        })
    }

    /// Record one occurrence of `key`.
    pub fn offer(&self, key: u64) {
        let slot = &self.slots[self.slot_index(key)];
        let count = slot.count.load(Ordering::Relaxed);

        if count == 0 {
            slot.key.store(key, Ordering::Relaxed);
            slot.count.store(1, Ordering::Relaxed);
            return;
        }
        if slot.key.load(Ordering::Relaxed) == key {
            slot.count.store(count.saturating_add(1), Ordering::Relaxed);
            return;
        }

        let decayed = ((f64::from(count) * self.decay).floor() as u32).max(1);
        if decayed == 1 {
            slot.key.store(key, Ordering::Relaxed);
        }
        slot.count.store(decayed, Ordering::Relaxed);
    }

    /// Occupied slots, highest count first. Ties are ordered by key.
    pub fn top_k(&self) -> Vec<HeavyHitterEntry> {
        let mut entries: Vec<_> = self
            .slots
            .iter()
            .filter_map(|slot| {
                let count = slot.count.load(Ordering::Relaxed);
                (count > 0).then(|| HeavyHitterEntry {
                    key: slot.key.load(Ordering::Relaxed),
                    count,
                })
            })
            .collect();
        entries.sort_unstable_by(|a, b| b.count.cmp(&a.count).then(a.key.cmp(&b.key)));
        entries
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Decay factor applied on collisions.
    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub(crate) fn slot_index(&self, key: u64) -> usize {
        (BuildHasher::hash_one(&self.hasher, key) % self.slots.len() as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_repeated_key() {
        let tracker = HeavyHitterTracker::new(8, 0.5).unwrap();
        for _ in 0..10 {
            tracker.offer(99);
        }

        let top = tracker.top_k();
        assert_eq!(top[0], HeavyHitterEntry { key: 99, count: 10 });
    }

    #[test]
    fn test_collision_decays_then_replaces() {
        // A single slot forces every key to collide
        let tracker = HeavyHitterTracker::new(1, 0.5).unwrap();
        for _ in 0..4 {
            tracker.offer(1);
        }

        tracker.offer(2);
        assert_eq!(tracker.top_k(), vec![HeavyHitterEntry { key: 1, count: 2 }]);

        tracker.offer(2);
        assert_eq!(tracker.top_k(), vec![HeavyHitterEntry { key: 2, count: 1 }]);

        tracker.offer(2);
        assert_eq!(tracker.top_k(), vec![HeavyHitterEntry { key: 2, count: 2 }]);
    }

    #[test]
    fn test_decay_floor_is_one() {
        let tracker = HeavyHitterTracker::new(1, 0.1).unwrap();
        tracker.offer(1);
        tracker.offer(1);
        tracker.offer(3);

        // floor(2 * 0.1) = 0, raised to 1: key replaced
        assert_eq!(tracker.top_k(), vec![HeavyHitterEntry { key: 3, count: 1 }]);
    }

    #[test]
    fn test_top_k_sorted_descending() {
        let tracker = HeavyHitterTracker::new(1024, 0.9).unwrap();
        let keys: Vec<u64> = (0..64).collect();
        let distinct: Vec<u64> = keys
            .iter()
            .copied()
            .fold(Vec::<u64>::new(), |mut picked, key| {
                let taken = picked
                    .iter()
                    .any(|&other| tracker.slot_index(other) == tracker.slot_index(key));
                if !taken && picked.len() < 3 {
                    picked.push(key);
                }
                picked
            });
        assert_eq!(distinct.len(), 3);

        for (i, key) in distinct.iter().enumerate() {
            for _ in 0..(i + 1) * 3 {
                tracker.offer(*key);
            }
        }

        let counts: Vec<u32> = tracker.top_k().iter().map(|e| e.count).collect();
        assert_eq!(counts, vec![9, 6, 3]);
    }

    #[test]
    fn test_empty_tracker() {
        let tracker = HeavyHitterTracker::new(4, 0.5).unwrap();
        assert!(tracker.top_k().is_empty());
        assert_eq!(tracker.capacity(), 4);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert_eq!(
            HeavyHitterTracker::new(0, 0.5).unwrap_err(),
            BuildError::ZeroHeavyKeeperCapacity
        );
        for decay in [0.0, 1.0, -0.5, 1.5] {
            assert_eq!(
                HeavyHitterTracker::new(4, decay).unwrap_err(),
                BuildError::InvalidHeavyKeeperDecay(decay)
            );
        }
        assert!(matches!(
            HeavyHitterTracker::new(4, f64::NAN),
            Err(BuildError::InvalidHeavyKeeperDecay(_))
        ));
    }
}
