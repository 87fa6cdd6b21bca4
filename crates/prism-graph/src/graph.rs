//! Direct dependency edges for modules and packages
//!
//! Edges are derived on every call from tracking records and package
//! metadata, never stored: the record store and the manifests are the
//! single source of truth, and memoization above this layer keeps the
//! recomputation cheap.

use crate::catalog::{Catalog, RUNTIME_PACKAGE};
use crate::scanner::SourceScanner;
use crate::GraphResult;
use prism_store::{ModuleName, PackageName, Platform, TrackingStore};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Lazily materialized adjacency over modules and packages
pub struct DependencyGraph {
    catalog: Arc<Catalog>,
    store: Arc<TrackingStore>,
    scanner: Arc<dyn SourceScanner>,
}

impl DependencyGraph {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<TrackingStore>,
        scanner: Arc<dyn SourceScanner>,
    ) -> Self {
        Self {
            catalog,
            store,
            scanner,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    /// Modules observed to be required when (module, package) loads.
    ///
    /// A record carrying a load error contributes nothing: a module
    /// that failed to load is assumed to have had no further effect.
    pub fn direct_load_deps(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> BTreeSet<ModuleName> {
        self.store.record(module, package, platform).effective_loads()
    }

    /// Statically detected names not already observed at load time.
    ///
    /// Load-time observation is ground truth; the scanner only
    /// supplements it, so traced names are subtracted from whatever the
    /// scanner reports.
    pub fn direct_runtime_deps(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> BTreeSet<ModuleName> {
        let traced = self.direct_load_deps(module, package, platform);
        self.scanner
            .scan(module, package)
            .into_iter()
            .filter(|name| !traced.contains(name) && name != module)
            .collect()
    }

    /// Load-time ∪ statically detected ∪ declared lazy auto-loads
    pub fn direct_all_deps(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> BTreeSet<ModuleName> {
        let record = self.store.record(module, package, platform);
        let mut deps = record.effective_loads();
        deps.extend(self.direct_runtime_deps(module, package, platform));
        deps.extend(record.autoload_targets());
        deps.remove(module);
        deps
    }

    /// Declared binary dependencies of a package for one platform, plus
    /// the implicit base-runtime dependency for packages shipping
    /// compiled modules on platforms that dynamically link against it.
    pub fn direct_binary_deps(
        &self,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<PackageName>> {
        let pkg = self.catalog.package(package)?;
        let mut deps = pkg.manifest.binary_deps_for(platform.as_key());
        if pkg.name != RUNTIME_PACKAGE
            && pkg.has_compiled_modules()
            && platform.needs_runtime_linkage()
        {
            deps.insert(RUNTIME_PACKAGE.to_string());
        }
        Ok(deps)
    }

}
