//! Query facade over the catalog, tracking store and caches

use crate::catalog::Catalog;
use crate::closure::{closure_keys, closure_tree, DepTree};
use crate::graph::DependencyGraph;
use crate::plan::{plan_order, plan_stages, reduce_stages};
use crate::reverse::{self, Dependents};
use crate::scanner::{NullScanner, SourceScanner};
use crate::{GraphError, GraphResult};
use prism_cache::{CacheRegistry, FullCache, PermanentCache, ScopedCache};
use prism_store::{
    AcquireReport, ModuleName, PackageName, Platform, TraceRequest, TrackingStore,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

type DepsCache = ScopedCache<(ModuleName, Platform), BTreeSet<ModuleName>>;
type PlanOutcome = Result<Vec<PackageName>, Vec<PackageName>>;

/// The resolution engine.
///
/// Owns the package catalog (immutable per query session), the tracking
/// store, and every cache. All queries are synchronous and, for a fixed
/// cache state, pure: identical calls return identical results
/// regardless of call order. The only blocking operations are record
/// acquisition ([`Engine::acquire`]) and snapshot persistence.
pub struct Engine {
    catalog: Arc<Catalog>,
    store: Arc<TrackingStore>,
    graph: DependencyGraph,
    registry: CacheRegistry,
    host: PermanentCache<(), Platform>,
    load_deps: Arc<DepsCache>,
    runtime_deps: Arc<DepsCache>,
    all_deps: Arc<DepsCache>,
    binary_deps: Arc<ScopedCache<Platform, BTreeSet<PackageName>>>,
    // aggregate over every installed package: no per-package
    // invalidation key, dropped wholesale on any clear
    build_orders: Arc<FullCache<Platform, PlanOutcome>>,
}

impl Engine {
    /// Create an engine with no source scanner
    pub fn new(catalog: Catalog, store: TrackingStore) -> Self {
        Self::with_scanner(catalog, store, Arc::new(NullScanner))
    }

    /// Create an engine with a source-text scanner collaborator
    pub fn with_scanner(
        catalog: Catalog,
        store: TrackingStore,
        scanner: Arc<dyn SourceScanner>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let store = Arc::new(store);
        let registry = CacheRegistry::new();
        // the record store invalidates like a scoped cache: clearing a
        // package drops its records and forces re-tracing
        registry.register_scoped(store.clone());

        let graph = DependencyGraph::new(catalog.clone(), store.clone(), scanner);
        Self {
            load_deps: registry.scoped(),
            runtime_deps: registry.scoped(),
            all_deps: registry.scoped(),
            binary_deps: registry.scoped(),
            build_orders: registry.full(),
            catalog,
            store,
            graph,
            registry,
            host: PermanentCache::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    /// Platform of the running process (memoized for process lifetime)
    pub fn host_platform(&self) -> Platform {
        self.host.get_or_compute((), Platform::current)
    }

    /// Drop cached state.
    ///
    /// With a package name, purges that package from every scoped cache
    /// (its records will be re-traced on next access) while other
    /// packages' cached results stay warm. Without one, everything is
    /// dropped. Aggregate caches are rebuilt from scratch either way.
    pub fn clear_cache(&self, package: Option<&str>) {
        info!(?package, "clearing engine caches");
        self.registry.clear(package);
    }

    // ----- direct queries -------------------------------------------------

    /// Load-time module dependencies of (module, package)
    pub fn direct_load_deps(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<ModuleName>> {
        self.catalog.package(package)?;
        Ok(self
            .load_deps
            .get_or_compute(package, (module.to_string(), platform), || {
                self.graph.direct_load_deps(module, package, platform)
            }))
    }

    /// Statically detected run-time dependencies not seen at load time
    pub fn direct_runtime_deps(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<ModuleName>> {
        self.catalog.package(package)?;
        Ok(self
            .runtime_deps
            .get_or_compute(package, (module.to_string(), platform), || {
                self.graph.direct_runtime_deps(module, package, platform)
            }))
    }

    /// Load-time ∪ run-time ∪ auto-load dependencies
    pub fn direct_all_deps(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<ModuleName>> {
        self.catalog.package(package)?;
        Ok(self
            .all_deps
            .get_or_compute(package, (module.to_string(), platform), || {
                self.graph.direct_all_deps(module, package, platform)
            }))
    }

    /// Declared plus implicit binary dependencies of a package
    pub fn direct_binary_deps(
        &self,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<PackageName>> {
        self.catalog.package(package)?;
        Ok(self.binary_deps.get_or_compute(package, platform, || {
            self.graph
                .direct_binary_deps(package, platform)
                .unwrap_or_default()
        }))
    }

    // ----- closures -------------------------------------------------------

    /// Transitive load-time closure of (module, package), seed excluded
    pub fn load_closure(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<ModuleName>> {
        self.catalog.package(package)?;
        Ok(closure_keys(module, |name| {
            self.load_edges(name, module, package, platform)
        }))
    }

    /// Transitive all-time closure of (module, package), seed excluded
    pub fn all_closure(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<ModuleName>> {
        self.catalog.package(package)?;
        Ok(self.all_closure_unchecked(module, package, platform))
    }

    /// Load-time closure restricted to modules owned by the seed's package
    pub fn internal_load_closure(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<ModuleName>> {
        Ok(self.partition(self.load_closure(module, package, platform)?, package).0)
    }

    /// Load-time closure restricted to modules outside the seed's package
    pub fn external_load_closure(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<ModuleName>> {
        Ok(self.partition(self.load_closure(module, package, platform)?, package).1)
    }

    /// All-time closure restricted to modules owned by the seed's package
    pub fn internal_all_closure(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<ModuleName>> {
        Ok(self.partition(self.all_closure(module, package, platform)?, package).0)
    }

    /// All-time closure restricted to modules outside the seed's package
    pub fn external_all_closure(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<ModuleName>> {
        Ok(self.partition(self.all_closure(module, package, platform)?, package).1)
    }

    /// Load-time dependency tree for display
    pub fn load_tree(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<DepTree> {
        self.catalog.package(package)?;
        Ok(closure_tree(module, |name| {
            self.load_edges(name, module, package, platform)
        }))
    }

    /// All-time dependency tree for display
    pub fn all_tree(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> GraphResult<DepTree> {
        self.catalog.package(package)?;
        Ok(closure_tree(module, |name| {
            self.all_edges(name, module, package, platform)
        }))
    }

    /// Transitive binary-dependency closure of a package.
    ///
    /// Names that are not known packages (plain system libraries) are
    /// kept in the closure but contribute no further edges.
    pub fn binary_closure(
        &self,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<PackageName>> {
        self.catalog.package(package)?;
        Ok(closure_keys(package, |name| {
            if self.catalog.get(name).is_some() {
                self.direct_binary_deps(name, platform).unwrap_or_default()
            } else {
                BTreeSet::new()
            }
        }))
    }

    // ----- reverse queries ------------------------------------------------

    /// Modules and packages whose all-time closure contains `module`
    pub fn dependents(
        &self,
        module: &str,
        exclude_package: Option<&str>,
        platform: Platform,
    ) -> GraphResult<Dependents> {
        if let Some(excluded) = exclude_package {
            self.catalog.package(excluded)?;
        }
        Ok(reverse::dependents(
            &self.catalog,
            module,
            exclude_package,
            |m, p| self.all_closure_unchecked(m, p, platform),
        ))
    }

    /// Packages whose binary closure contains `package`
    pub fn package_dependents(
        &self,
        package: &str,
        platform: Platform,
    ) -> GraphResult<BTreeSet<PackageName>> {
        self.catalog.package(package)?;
        Ok(reverse::package_dependents(&self.catalog, package, |p| {
            self.binary_closure(p, platform).unwrap_or_default()
        }))
    }

    // ----- planning -------------------------------------------------------

    /// Build order over every installed package (cached per platform).
    ///
    /// Graph assembly happens outside the cache so its errors keep
    /// their own kind; only the reduction outcome is cached.
    pub fn build_order_all(&self, platform: Platform) -> GraphResult<Vec<PackageName>> {
        let names = self.catalog.installed_names();
        let graph = self.plan_graph(&names, platform)?;
        let outcome = self.build_orders.get_or_compute(platform, || {
            reduce_stages(&graph).map(|stages| stages.into_iter().flatten().collect())
        });
        outcome.map_err(|remaining| GraphError::CyclicDependency { remaining })
    }

    /// Build order over an explicit package set
    pub fn build_order_of(
        &self,
        packages: &[PackageName],
        platform: Platform,
    ) -> GraphResult<Vec<PackageName>> {
        plan_order(&self.plan_graph(packages, platform)?)
    }

    /// Parallel build stages over every installed package
    pub fn build_stages_all(&self, platform: Platform) -> GraphResult<Vec<Vec<PackageName>>> {
        let names = self.catalog.installed_names();
        plan_stages(&self.plan_graph(&names, platform)?)
    }

    /// Parallel build stages over an explicit package set
    pub fn build_stages_of(
        &self,
        packages: &[PackageName],
        platform: Platform,
    ) -> GraphResult<Vec<Vec<PackageName>>> {
        plan_stages(&self.plan_graph(packages, platform)?)
    }

    // ----- platform support & acquisition ---------------------------------

    /// Platforms a module can be used on: the manifest must allow the
    /// platform and no record may carry the intentional
    /// platform-unsupported signal. Generic load failures do not revoke
    /// support; they are reported through the record itself.
    pub fn supported_platforms(
        &self,
        module: &str,
        package: &str,
    ) -> GraphResult<BTreeSet<Platform>> {
        let pkg = self.catalog.package(package)?;
        Ok(Platform::ALL
            .iter()
            .copied()
            .filter(|platform| pkg.manifest.supports(platform.as_key()))
            .filter(|&platform| {
                !self
                    .store
                    .record(module, package, platform)
                    .is_platform_unsupported()
            })
            .collect())
    }

    /// Acquire records for every tracked module of every installed
    /// package on the given platforms. Blocking; one concurrent task
    /// per platform; failures are isolated and reported per platform.
    pub fn acquire(&self, platforms: &[Platform]) -> AcquireReport {
        let requests: Vec<TraceRequest> = self
            .catalog
            .installed()
            .flat_map(|p| {
                p.tracked_modules()
                    .map(move |m| TraceRequest::new(m.name.clone(), p.name.clone()))
            })
            .collect();
        self.store.acquire_all(&requests, platforms)
    }

    /// Persist the tracking snapshot
    pub fn persist(&self) -> GraphResult<()> {
        Ok(self.store.save()?)
    }

    // ----- internals ------------------------------------------------------

    /// Load-time edges during a closure walk, routed through the scoped
    /// caches so repeated walks never re-invoke the collaborators.
    /// Scoping each node under its owner keeps per-package invalidation
    /// exact. Built-ins and unresolvable names contribute no edges.
    fn load_edges(
        &self,
        name: &str,
        seed: &str,
        seed_package: &str,
        platform: Platform,
    ) -> BTreeSet<ModuleName> {
        match self.edge_owner(name, seed, seed_package) {
            Some(owner) => self
                .direct_load_deps(name, &owner, platform)
                .unwrap_or_default(),
            None => BTreeSet::new(),
        }
    }

    fn all_edges(
        &self,
        name: &str,
        seed: &str,
        seed_package: &str,
        platform: Platform,
    ) -> BTreeSet<ModuleName> {
        match self.edge_owner(name, seed, seed_package) {
            Some(owner) => self
                .direct_all_deps(name, &owner, platform)
                .unwrap_or_default(),
            None => BTreeSet::new(),
        }
    }

    /// Owning package of a closure node. Only the seed carries a known
    /// package; every other node recovers its owner through the catalog.
    fn edge_owner(&self, name: &str, seed: &str, seed_package: &str) -> Option<PackageName> {
        if name == seed {
            Some(seed_package.to_string())
        } else {
            self.catalog.owner_of(name).cloned()
        }
    }

    fn all_closure_unchecked(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> BTreeSet<ModuleName> {
        closure_keys(module, |name| self.all_edges(name, module, package, platform))
    }

    /// Split a closure into (internal, external) by owning package
    fn partition(
        &self,
        closure: BTreeSet<ModuleName>,
        package: &str,
    ) -> (BTreeSet<ModuleName>, BTreeSet<ModuleName>) {
        closure.into_iter().partition(|name| {
            self.catalog
                .owner_of(name)
                .is_some_and(|owner| owner.as_str() == package)
        })
    }

    /// Assemble the planner input: validate names, prune packages not
    /// buildable for the platform, attach binary dependency sets.
    /// Dependencies on pruned or outside-set packages are dropped by
    /// the planner itself.
    fn plan_graph(
        &self,
        packages: &[PackageName],
        platform: Platform,
    ) -> GraphResult<BTreeMap<PackageName, BTreeSet<PackageName>>> {
        let mut graph = BTreeMap::new();
        for name in packages {
            let package = self.catalog.package(name)?;
            if !package.manifest.supports(platform.as_key()) {
                continue;
            }
            graph.insert(name.clone(), self.direct_binary_deps(name, platform)?);
        }
        Ok(graph)
    }
}
