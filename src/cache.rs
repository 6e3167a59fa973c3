//! Bounded and unbounded caches shared across requests (spec §5, §9).
//!
//! The teacher crate reaches for `dashmap` wherever it needs a lock-free
//! concurrent map, but never bounds it — this engine needs a bounded LRU for
//! the `TokenTrieBuilder` cache, so it pairs `lru::LruCache` with a
//! `parking_lot::Mutex` the same way `inference/candle_adapter.rs` guards its
//! backend state, and keeps `dashmap::DashMap` for the read-mostly global
//! tokenizer-instance cache.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;

/// A bounded, thread-safe LRU cache. Used for the `(tokenizer fingerprint,
/// sorted-keys-joined) -> TokenTrie` cache (spec §4.2, §9).
pub struct BoundedCache<K, V> {
    inner: Mutex<LruCache<K, Arc<V>>>,
}

impl<K: Hash + Eq + Clone, V> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().get(key).cloned()
    }

    pub fn get_or_insert_with(&self, key: K, build: impl FnOnce() -> V) -> Arc<V> {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = Arc::new(build());
        self.inner.lock().put(key, Arc::clone(&value));
        value
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded, read-mostly shared cache. Used for the one-tokenizer-instance-
/// per-model-id cache and the once-computed special-token discovery memo
/// (spec §5 "Global").
pub struct SharedCache<K, V> {
    inner: DashMap<K, Arc<V>>,
}

impl<K: Hash + Eq + Clone, V> SharedCache<K, V> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn get_or_insert_with(&self, key: K, build: impl FnOnce() -> V) -> Arc<V> {
        if let Some(hit) = self.inner.get(&key) {
            return Arc::clone(hit.value());
        }
        let value = Arc::new(build());
        self.inner.insert(key, Arc::clone(&value));
        value
    }
}

impl<K: Hash + Eq + Clone, V> Default for SharedCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
