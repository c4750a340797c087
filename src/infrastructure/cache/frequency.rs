//! Small Count-Min sketch scoring cache admission candidates.

use ahash::RandomState;
use std::hash::{BuildHasher, Hash};

const DEPTH: usize = 4;
const WIDTH: usize = 1 << 12;

/// Fixed-size frequency counter owned by the cache's critical section.
///
/// Counters saturate at `u32::MAX` and are never aged; the cache is sized far
/// below the sketch so collisions only inflate scores slightly.
#[derive(Debug)]
pub(crate) struct FrequencySketch {
    counters: Box<[u32]>,
    hashers: [RandomState; DEPTH],
}

impl FrequencySketch {
    pub(crate) fn new() -> Self {
        Self {
            counters: vec![0; DEPTH * WIDTH].into_boxed_slice(),
            hashers: std::array::from_fn(|_| RandomState::new()),
        }
    }

    /// Count one access and return the updated estimate.
    pub(crate) fn increment<Q: Hash + ?Sized>(&mut self, key: &Q) -> u32 {
        let mut estimate = u32::MAX;
        for row in 0..DEPTH {
            let index = self.index_for(key, row);
            let counter = &mut self.counters[index];
            *counter = counter.saturating_add(1);
            estimate = estimate.min(*counter);
        }
        estimate
    }

    pub(crate) fn estimate<Q: Hash + ?Sized>(&self, key: &Q) -> u32 {
        (0..DEPTH)
            .map(|row| self.counters[self.index_for(key, row)])
            .min()
            .unwrap_or(0)
    }

    fn index_for<Q: Hash + ?Sized>(&self, key: &Q, row: usize) -> usize {
        let hash = BuildHasher::hash_one(&self.hashers[row], key) as usize;
        row * WIDTH + (hash & (WIDTH - 1))
    }
}
