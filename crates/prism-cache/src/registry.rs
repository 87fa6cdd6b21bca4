//! Registry fanning invalidation out to every engine cache

use crate::full::{FullCache, FullInvalidate};
use crate::scoped::{ScopeInvalidate, ScopedCache};
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

/// Holds weak handles to every scoped and full cache the engine built,
/// so a single clear call reaches all of them.
///
/// Caches are held weakly: dropping a cache unregisters it on the next
/// clear, no explicit deregistration needed.
#[derive(Default)]
pub struct CacheRegistry {
    scoped: Mutex<Vec<Weak<dyn ScopeInvalidate>>>,
    full: Mutex<Vec<Weak<dyn FullInvalidate>>>,
}

impl CacheRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scoped cache registered with this registry
    pub fn scoped<K, V>(&self) -> Arc<ScopedCache<K, V>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
    {
        let cache = Arc::new(ScopedCache::new());
        self.register_scoped(cache.clone());
        cache
    }

    /// Create a full cache registered with this registry
    pub fn full<K, V>(&self) -> Arc<FullCache<K, V>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
    {
        let cache = Arc::new(FullCache::new());
        self.register_full(cache.clone());
        cache
    }

    /// Register an externally constructed scoped cache
    pub fn register_scoped(&self, cache: Arc<dyn ScopeInvalidate>) {
        let mut scoped = self.scoped.lock().unwrap_or_else(|e| e.into_inner());
        scoped.push(Arc::downgrade(&cache));
    }

    /// Register an externally constructed full cache
    pub fn register_full(&self, cache: Arc<dyn FullInvalidate>) {
        let mut full = self.full.lock().unwrap_or_else(|e| e.into_inner());
        full.push(Arc::downgrade(&cache));
    }

    /// Clear cached state.
    ///
    /// With `Some(scope)`, purges that scope key from every scoped
    /// cache. With `None`, purges all scopes from every scoped cache.
    /// Full (aggregate) caches have no partial-invalidation key, so
    /// they are dropped wholesale in both cases.
    pub fn clear(&self, scope: Option<&str>) {
        match scope {
            Some(scope) => {
                debug!(scope, "clearing scoped caches");
                for cache in Self::live(&self.scoped) {
                    cache.invalidate_scope(scope);
                }
            }
            None => {
                debug!("clearing all caches");
                for cache in Self::live(&self.scoped) {
                    cache.invalidate_all();
                }
            }
        }
        for cache in Self::live(&self.full) {
            cache.clear();
        }
    }

    /// Collect live handles, pruning entries whose cache was dropped
    fn live<T: ?Sized>(slot: &Mutex<Vec<Weak<T>>>) -> Vec<Arc<T>> {
        let mut entries = slot.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|weak| weak.strong_count() > 0);
        entries.iter().filter_map(Weak::upgrade).collect()
    }
}
