//! # Query Result Cache
//!
//! This module implements the fixed-capacity LRU cache that tables use to
//! memoize query results.
//!
//! ## Eviction
//!
//! The cache keeps a strict recency order: both `get` and `insert` mark the
//! touched key most-recently-used, and when an insert pushes the cache past
//! its capacity, the entry that has gone unused longest is evicted. There is
//! no side-effect-free membership check; callers probe with `get`, so a probe
//! counts as a use. Keeping lookups and recency coupled means the entries
//! that keep getting asked for are exactly the entries that survive.
//!
//! ## Capacity Zero
//!
//! A capacity of zero is valid and turns the cache into a no-op: inserts are
//! discarded and `get` never hits. Tables use this to switch query caching
//! off without changing any call sites.
//!
//! ## Thread Safety
//!
//! `LruCache` is not internally synchronized. The owning table wraps it in a
//! `parking_lot::Mutex` and holds the lock only for the duration of a single
//! lookup or insert.

use std::collections::VecDeque;
use std::hash::Hash;

use hashbrown::HashMap;

/// Fixed-capacity map evicting the least-recently-used entry on overflow.
pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, V>,
    // Recency list: front is the coldest key, back the hottest.
    order: VecDeque<K>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up `key`, marking it most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key)
    }

    /// Inserts or overwrites `key`, marking it most-recently-used. If the
    /// cache then holds more than `capacity` entries, the coldest entry is
    /// evicted.
    pub fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
        } else {
            self.order.push_back(key);
        }

        while self.entries.len() > self.capacity {
            if let Some(coldest) = self.order.pop_front() {
                self.entries.remove(&coldest);
            }
        }
    }

    /// Drops every entry in one call.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}
