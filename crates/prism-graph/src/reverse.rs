//! Reverse dependency queries ("who depends on X")
//!
//! No reverse adjacency is persisted: the forward graph is the single
//! source of truth, so dependents are found by scanning every installed
//! package's modules and testing forward-closure membership. Slower
//! than an index, but immune to drift.

use crate::catalog::Catalog;
use prism_store::{ModuleName, PackageName};
use std::collections::BTreeSet;

/// Result of a reverse module query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependents {
    /// Modules whose forward closure contains the target
    pub modules: BTreeSet<ModuleName>,
    /// Packages owning those modules
    pub packages: BTreeSet<PackageName>,
}

/// Modules (and their owning packages) depending on `target`.
///
/// `closure_of(module, package)` is the chosen forward closure;
/// `exclude_package` drops one package from the scan, typically the
/// target's own owner.
pub fn dependents<F>(
    catalog: &Catalog,
    target: &str,
    exclude_package: Option<&str>,
    mut closure_of: F,
) -> Dependents
where
    F: FnMut(&str, &str) -> BTreeSet<ModuleName>,
{
    let mut result = Dependents::default();
    for package in catalog.installed() {
        if exclude_package == Some(package.name.as_str()) {
            continue;
        }
        for module in package.tracked_modules() {
            if module.name == target {
                continue;
            }
            if closure_of(&module.name, &package.name).contains(target) {
                result.modules.insert(module.name.clone());
                result.packages.insert(package.name.clone());
            }
        }
    }
    result
}

/// Packages whose binary-dependency closure contains `target`.
///
/// `closure_of(package)` is the package-level forward closure.
pub fn package_dependents<F>(
    catalog: &Catalog,
    target: &str,
    mut closure_of: F,
) -> BTreeSet<PackageName>
where
    F: FnMut(&str) -> BTreeSet<PackageName>,
{
    catalog
        .installed()
        .filter(|p| p.name != target)
        .filter(|p| closure_of(&p.name).contains(target))
        .map(|p| p.name.clone())
        .collect()
}
