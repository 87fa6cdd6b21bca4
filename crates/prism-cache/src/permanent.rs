//! Permanent memoization for process-lifetime facts

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// Cache whose entries live for the whole process.
///
/// There is deliberately no way to remove an entry: this flavor is only
/// for facts that cannot change while the process runs, such as host
/// platform detection. Anything invalidatable belongs in a
/// [`ScopedCache`](crate::ScopedCache) or [`FullCache`](crate::FullCache).
#[derive(Debug)]
pub struct PermanentCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> PermanentCache<K, V>
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

impl<K, V> Default for PermanentCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
