//! Access-ordered segment used for both halves of the hot-key cache.

use ahash::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Cached value plus the logical ticks used for admission scoring.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<V> {
    pub(crate) value: V,
    pub(crate) admission_tick: u64,
    pub(crate) last_access_tick: u64,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, tick: u64) -> Self {
        Self {
            value,
            admission_tick: tick,
            last_access_tick: tick,
        }
    }
}

#[derive(Debug)]
struct Slot<V> {
    entry: CacheEntry<V>,
    seq: u64,
}

/// Map plus recency order. Oldest entries come first in `order`.
#[derive(Debug)]
pub(crate) struct Segment<K, V> {
    entries: HashMap<K, Slot<V>, RandomState>,
    order: BTreeMap<u64, K>,
    next_seq: u64,
}

impl<K, V> Segment<K, V>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::with_hasher(RandomState::new()),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert `key` as the most recently used entry, replacing any previous one.
    pub(crate) fn insert_newest(&mut self, key: K, entry: CacheEntry<V>) {
        self.remove(&key);
        let seq = self.bump_seq();
        self.order.insert(seq, key.clone());
        self.entries.insert(key, Slot { entry, seq });
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot.entry)
    }

    /// Mark `key` as accessed at `tick` and move it to the newest position.
    pub(crate) fn touch(&mut self, key: &K, tick: u64) -> Option<&V> {
        let seq = self.bump_seq();
        let slot = self.entries.get_mut(key)?;
        self.order.remove(&slot.seq);
        self.order.insert(seq, key.clone());
        slot.seq = seq;
        slot.entry.last_access_tick = tick;
        Some(&slot.entry.value)
    }

    pub(crate) fn pop_oldest(&mut self) -> Option<(K, CacheEntry<V>)> {
        let (_, key) = self.order.pop_first()?;
        let slot = self.entries.remove(&key)?;
        Some((key, slot.entry))
    }

    /// Up to `limit` entries, least recently used first.
    pub(crate) fn oldest(&self, limit: usize) -> impl Iterator<Item = (&K, &CacheEntry<V>)> {
        self.order
            .values()
            .take(limit)
            .filter_map(move |key| self.entries.get(key).map(|slot| (key, &slot.entry)))
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
