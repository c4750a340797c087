//! Bounded, frequency-aware cache of per-key limiters.
//!
//! The cache is split into a small probation segment, where first-time keys
//! wait, and a main segment holding keys that proved themselves. Promotion and
//! eviction compare entries by an admission score built from access frequency
//! and age, so a flood of one-off keys cannot flush frequently used limiters.

mod frequency;
mod segment;

use crate::infrastructure::builder::BuildError;
use frequency::FrequencySketch;
use parking_lot::Mutex;
use segment::{CacheEntry, Segment};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

/// Main-segment entries inspected when looking for an eviction victim.
const VICTIM_SAMPLE_SIZE: usize = 16;

/// Weight of one recorded access in the admission score.
const FREQUENCY_WEIGHT: i64 = 100;

/// Two-segment cache with TinyLFU-style admission.
///
/// Every operation runs inside one short critical section. Values are cloned
/// out, so `V` is typically an `Arc`.
///
/// # Example
/// ```
/// use fluxgate::HotKeyCache;
///
/// let cache: HotKeyCache<u64, &str> = HotKeyCache::new(64).unwrap();
/// cache.get_or_compute(7, || "limiter");
/// assert!(cache.is_probationary(&7));
///
/// cache.get_or_compute(7, || unreachable!());
/// assert!(cache.is_hot(&7));
/// ```
#[derive(Debug)]
pub struct HotKeyCache<K, V> {
    capacity: usize,
    probation_capacity: usize,
    main_capacity: usize,
    inner: Mutex<Inner<K, V>>,
    evictions: AtomicU64,
}

#[derive(Debug)]
struct Inner<K, V> {
    tick: u64,
    probation: Segment<K, V>,
    main: Segment<K, V>,
    sketch: FrequencySketch,
}

impl<K, V> HotKeyCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache holding about `capacity` entries.
    ///
    /// One eighth (at least one slot) is reserved for probation and the rest
    /// (at least one slot) for the main segment.
    ///
    /// # Errors
    /// Returns [`BuildError::ZeroShardCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, BuildError> {
        if capacity == 0 {
            return Err(BuildError::ZeroShardCapacity);
        }
        let probation_capacity = (capacity / 8).max(1);
        let main_capacity = capacity.saturating_sub(probation_capacity).max(1);

        Ok(Self {
            capacity,
            probation_capacity,
            main_capacity,
            inner: Mutex::new(Inner {
                tick: 0,
                probation: Segment::new(),
                main: Segment::new(),
                sketch: FrequencySketch::new(),
            }),
            evictions: AtomicU64::new(0),
        })
    }

    /// Return the cached value for `key`, building it with `factory` on a miss.
    ///
    /// The factory runs at most once per residency of the key: a key evicted
    /// and requested again is built afresh.
    pub fn get_or_compute<F>(&self, key: K, factory: F) -> V
    where
        F: FnOnce() -> V,
    {
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let now = inner.tick;
        inner.sketch.increment(&key);

        if let Some(value) = inner.main.touch(&key, now) {
            return value.clone();
        }

        let (entry, from_probation) = match inner.probation.remove(&key) {
            Some(mut entry) => {
                entry.last_access_tick = now;
                (entry, true)
            }
            None => (CacheEntry::new(factory(), now), false),
        };
        let value = entry.value.clone();

        self.evaluate(&mut inner, key, entry, from_probation, now);
        value
    }

    /// Whether `key` lives in the main segment.
    pub fn is_hot(&self, key: &K) -> bool {
        self.inner.lock().main.contains(key)
    }

    /// Whether `key` is waiting in probation.
    pub fn is_probationary(&self, key: &K) -> bool {
        self.inner.lock().probation.contains(key)
    }

    /// Entries across both segments.
    pub fn size(&self) -> usize {
        let inner = self.inner.lock();
        inner.main.len() + inner.probation.len()
    }

    /// Entries in the main segment.
    pub fn hot_size(&self) -> usize {
        self.inner.lock().main.len()
    }

    /// Entries in probation.
    pub fn probation_size(&self) -> usize {
        self.inner.lock().probation.len()
    }

    /// Configured capacity.
    ///
    /// With a capacity of 1 both segments still get one slot, so up to two
    /// entries can be resident.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries dropped from either segment since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Admission-sketch estimate of how often `key` was requested.
    pub fn frequency(&self, key: &K) -> u32 {
        self.inner.lock().sketch.estimate(key)
    }

    fn evaluate(
        &self,
        inner: &mut Inner<K, V>,
        key: K,
        entry: CacheEntry<V>,
        from_probation: bool,
        now: u64,
    ) {
        if inner.main.len() < self.main_capacity {
            if from_probation || inner.sketch.estimate(&key) > 1 {
                self.admit(inner, key, entry, now);
            } else {
                self.to_probation(inner, key, entry);
            }
            return;
        }

        let candidate_score = score(inner.sketch.estimate(&key), &entry, now);
        match sample_victim(inner, now) {
            Some((victim, victim_score)) if candidate_score > victim_score => {
                inner.main.remove(&victim);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(candidate_score, victim_score, "evicted hot key for candidate");
                self.admit(inner, key, entry, now);
            }
            _ => self.to_probation(inner, key, entry),
        }
    }

    fn admit(&self, inner: &mut Inner<K, V>, key: K, entry: CacheEntry<V>, now: u64) {
        inner.main.insert_newest(key, entry);
        tracing::trace!(hot_size = inner.main.len(), "admitted key to main segment");

        while inner.main.len() > self.main_capacity {
            let evicted = match sample_victim(inner, now) {
                Some((victim, _)) => inner.main.remove(&victim).is_some(),
                None => inner.main.pop_oldest().is_some(),
            };
            if !evicted {
                break;
            }
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn to_probation(&self, inner: &mut Inner<K, V>, key: K, entry: CacheEntry<V>) {
        inner.probation.insert_newest(key, entry);
        while inner.probation.len() > self.probation_capacity {
            if inner.probation.pop_oldest().is_none() {
                break;
            }
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("evicted oldest probationary key");
        }
    }
}

/// Lowest-scored entry among the least recently used part of main.
fn sample_victim<K, V>(inner: &Inner<K, V>, now: u64) -> Option<(K, i64)>
where
    K: Hash + Eq + Clone,
{
    inner
        .main
        .oldest(VICTIM_SAMPLE_SIZE)
        .map(|(key, entry)| (key, score(inner.sketch.estimate(key), entry, now)))
        .min_by_key(|(_, score)| *score)
        .map(|(key, score)| (key.clone(), score))
}

/// `100 * frequency - idle ticks - resident ticks`
fn score<V>(frequency: u32, entry: &CacheEntry<V>, now: u64) -> i64 {
    let idle = now.saturating_sub(entry.last_access_tick);
    let age = now.saturating_sub(entry.admission_tick);
    let idle = i64::try_from(idle).unwrap_or(i64::MAX);
    let age = i64::try_from(age).unwrap_or(i64::MAX);
    (i64::from(frequency) * FREQUENCY_WEIGHT)
        .saturating_sub(idle)
        .saturating_sub(age)
}
