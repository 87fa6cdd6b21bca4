//! Whole-cache memoization for aggregate results

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// Invalidation hook for caches that can only be dropped wholesale.
pub trait FullInvalidate: Send + Sync {
    /// Drop every cached entry
    fn clear(&self);
}

/// Cache for aggregate computations with no per-package key.
///
/// "All modules of all installed packages" has no natural partial
/// invalidation key: once any package could have changed, the whole
/// aggregate is suspect. The only invalidation this cache offers is
/// dropping the entire map; entries are rebuilt lazily afterwards.
#[derive(Debug)]
pub struct FullCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> FullCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, computing it on first access.
    ///
    /// `compute` runs under the cache lock, so it must not call back
    /// into the same cache.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> V {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_insert_with(compute).clone()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for FullCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FullInvalidate for FullCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_computes_once() {
        let cache: FullCache<u32, u32> = FullCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache.get_or_compute(1, || {
                calls.fetch_add(1, Ordering::SeqCst);
                9
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_forces_rebuild() {
        let cache: FullCache<u32, u32> = FullCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            9
        };

        cache.get_or_compute(1, compute);
        cache.clear();
        assert!(cache.is_empty());

        cache.get_or_compute(1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            9
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_len() {
        let cache: FullCache<u32, u32> = FullCache::new();
        cache.get_or_compute(1, || 1);
        cache.get_or_compute(2, || 2);
        assert_eq!(cache.len(), 2);
    }
}
