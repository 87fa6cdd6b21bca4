//! Per-scope memoization with fine-grained invalidation

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// Invalidation hooks for caches partitioned by a scope key.
///
/// The scope key is a package name: re-scanning one package must drop
/// exactly that package's cached results everywhere without disturbing
/// results for other packages.
pub trait ScopeInvalidate: Send + Sync {
    /// Drop every entry cached under `scope`
    fn invalidate_scope(&self, scope: &str);

    /// Drop all entries for all scopes
    fn invalidate_all(&self);
}

/// Cache keyed by `(scope, key)` where the scope is a package name.
///
/// Entries for one scope can be invalidated independently of every
/// other scope, which is what keeps a single-package re-scan from
/// invalidating the whole session.
#[derive(Debug)]
pub struct ScopedCache<K, V> {
    scopes: Mutex<HashMap<String, HashMap<K, V>>>,
}

impl<K, V> ScopedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Return the value cached under `(scope, key)`, computing it on
    /// first access.
    ///
    /// `compute` runs under the cache lock, so it must not call back
    /// into the same cache.
    pub fn get_or_compute(&self, scope: &str, key: K, compute: impl FnOnce() -> V) -> V {
        let mut scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        scopes
            .entry(scope.to_string())
            .or_default()
            .entry(key)
            .or_insert_with(compute)
            .clone()
    }

    /// Peek at a cached value without computing
    pub fn get(&self, scope: &str, key: &K) -> Option<V> {
        let scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        scopes.get(scope).and_then(|m| m.get(key)).cloned()
    }

    /// Number of entries cached under `scope`
    pub fn scope_len(&self, scope: &str) -> usize {
        let scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        scopes.get(scope).map_or(0, HashMap::len)
    }
}

impl<K, V> Default for ScopedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ScopeInvalidate for ScopedCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn invalidate_scope(&self, scope: &str) {
        let mut scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        scopes.remove(scope);
    }

    fn invalidate_all(&self) {
        let mut scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        scopes.clear();
    }
}
