//! Storage strategies for per-block abstract states.
//!
//! A state maps [`ValueId`]s to abstract values. Small functions use the
//! unbounded [`DefaultStatePool`]; mid-sized functions switch to
//! [`ActiveStatePool`], which caps the number of tracked values and evicts
//! the least recently written entries when the cap is hit. An evicted entry
//! simply reads as absent, which the state interprets as Top, so eviction
//! loses precision but never soundness.

use std::collections::{HashMap, VecDeque};

use crate::chir::ValueId;

/// Eviction trigger for [`ActiveStatePool`].
pub const MAX_STATE_POOL_SIZE: usize = 120;

/// Entry count an [`ActiveStatePool`] is trimmed back to on eviction.
pub const BASE_STATE_POOL_SIZE: usize = 80;

/// Key-value storage behind a [`State`](super::state::State).
pub trait StatePool<V>: Clone + Default {
    /// Reads the entry for `key`, if tracked.
    fn get(&self, key: ValueId) -> Option<&V>;

    /// Writes the entry for `key`, possibly evicting older entries.
    fn insert(&mut self, key: ValueId, value: V);

    /// Removes and returns the entry for `key`.
    fn remove(&mut self, key: ValueId) -> Option<V>;

    /// Number of tracked entries.
    fn len(&self) -> usize;

    /// Returns `true` when nothing is tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all tracked entries, in no particular order.
    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = (ValueId, &'a V)> + 'a>
    where
        V: 'a;

    /// Drops all entries.
    fn clear(&mut self);
}

/// Unbounded pool: a plain hash map.
#[derive(Debug, Clone)]
pub struct DefaultStatePool<V> {
    entries: HashMap<ValueId, V>,
}

impl<V> Default for DefaultStatePool<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: Clone> StatePool<V> for DefaultStatePool<V> {
    fn get(&self, key: ValueId) -> Option<&V> {
        self.entries.get(&key)
    }

    fn insert(&mut self, key: ValueId, value: V) {
        self.entries.insert(key, value);
    }

    fn remove(&mut self, key: ValueId) -> Option<V> {
        self.entries.remove(&key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = (ValueId, &'a V)> + 'a>
    where
        V: 'a,
    {
        Box::new(self.entries.iter().map(|(k, v)| (*k, v)))
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Bounded pool with write-recency eviction.
///
/// Each write stamps its key; the queue holds keys in stamp order, and a key
/// whose queued stamp no longer matches its map stamp is stale and skipped
/// during eviction. When an insert pushes the entry count past
/// [`MAX_STATE_POOL_SIZE`], the oldest live entries are dropped until
/// [`BASE_STATE_POOL_SIZE`] remain.
#[derive(Debug, Clone)]
pub struct ActiveStatePool<V> {
    entries: HashMap<ValueId, (V, u64)>,
    queue: VecDeque<(ValueId, u64)>,
    stamp: u64,
}

impl<V> Default for ActiveStatePool<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            queue: VecDeque::new(),
            stamp: 0,
        }
    }
}

impl<V: Clone> ActiveStatePool<V> {
    fn evict_to_base(&mut self) {
        while self.entries.len() > BASE_STATE_POOL_SIZE {
            let Some((key, stamp)) = self.queue.pop_front() else {
                // Queue exhausted while entries remain: impossible, every
                // entry has a queued stamp.
                debug_assert!(false, "eviction queue out of sync");
                return;
            };
            match self.entries.get(&key) {
                Some((_, live)) if *live == stamp => {
                    self.entries.remove(&key);
                }
                _ => {} // stale queue entry
            }
        }
    }
}

impl<V: Clone> StatePool<V> for ActiveStatePool<V> {
    fn get(&self, key: ValueId) -> Option<&V> {
        self.entries.get(&key).map(|(v, _)| v)
    }

    fn insert(&mut self, key: ValueId, value: V) {
        self.stamp += 1;
        self.entries.insert(key, (value, self.stamp));
        self.queue.push_back((key, self.stamp));
        if self.entries.len() > MAX_STATE_POOL_SIZE {
            self.evict_to_base();
        }
    }

    fn remove(&mut self, key: ValueId) -> Option<V> {
        self.entries.remove(&key).map(|(v, _)| v)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = (ValueId, &'a V)> + 'a>
    where
        V: 'a,
    {
        Box::new(self.entries.iter().map(|(k, (v, _))| (*k, v)))
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.queue.clear();
    }
}
