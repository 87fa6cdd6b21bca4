//! Installed-package catalog and module classification

use crate::{GraphError, GraphResult};
use prism_manifest::manifest::MANIFEST_FILE;
use prism_manifest::PackageManifest;
use prism_store::{ModuleName, PackageName};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// The base runtime package compiled modules implicitly link against
pub const RUNTIME_PACKAGE: &str = "prism-runtime";

/// Source module file extension
pub const SOURCE_EXT: &str = "prm";

/// Module name suffixes marking auxiliary scripts, excluded from
/// dependency tracking
const SCRIPT_SUFFIXES: [&str; 4] = ["_demo", "_test", "_bench", "_app"];

/// What kind of loadable unit a module is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Plain source module
    Source,
    /// Compiled/native module (shared library)
    Compiled,
    /// Demo/test/bench/app script; not tracked
    Script,
}

/// Where a module's code lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    File(PathBuf),
    /// Shipped with the runtime, owned by no package
    Builtin,
}

/// A named loadable unit owned by a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: ModuleName,
    pub kind: ModuleKind,
    pub source: ModuleSource,
}

impl Module {
    /// Whether this module participates in dependency tracking
    pub fn is_tracked(&self) -> bool {
        self.kind != ModuleKind::Script
    }
}

/// A named, independently buildable unit of modules plus metadata
#[derive(Debug, Clone)]
pub struct Package {
    pub name: PackageName,
    pub root: PathBuf,
    /// Known packages appear in metadata; only installed ones have a
    /// scanned module tree and participate in reverse-index scans
    pub installed: bool,
    pub manifest: PackageManifest,
    pub modules: BTreeMap<ModuleName, Module>,
    /// Every file under the package root
    pub files: BTreeSet<PathBuf>,
}

impl Package {
    /// Scan a package directory: read its manifest and classify every
    /// file into modules
    pub fn scan(root: &Path) -> GraphResult<Self> {
        let manifest = PackageManifest::from_file(&root.join(MANIFEST_FILE))?;
        let name = manifest.package.name.clone();

        let mut modules = BTreeMap::new();
        let mut files = BTreeSet::new();
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            files.insert(relative.clone());

            if let Some(module) = classify_module(&name, &relative, path) {
                modules.insert(module.name.clone(), module);
            }
        }

        debug!(package = %name, modules = modules.len(), "scanned package");
        Ok(Self {
            name,
            root: root.to_path_buf(),
            installed: true,
            manifest,
            modules,
            files,
        })
    }

    /// Build a package from parts (tests, known-but-not-installed)
    pub fn from_parts(manifest: PackageManifest, modules: Vec<Module>) -> Self {
        let name = manifest.package.name.clone();
        Self {
            name,
            root: PathBuf::new(),
            installed: true,
            manifest,
            modules: modules.into_iter().map(|m| (m.name.clone(), m)).collect(),
            files: BTreeSet::new(),
        }
    }

    /// Mark the package as known from metadata only
    pub fn not_installed(mut self) -> Self {
        self.installed = false;
        self
    }

    /// Modules participating in dependency tracking
    pub fn tracked_modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values().filter(|m| m.is_tracked())
    }

    /// Whether the package ships any compiled (non-source) modules
    pub fn has_compiled_modules(&self) -> bool {
        self.modules.values().any(|m| m.kind == ModuleKind::Compiled)
    }
}

/// Derive a module from a file path, if the file is a module at all
fn classify_module(package: &str, relative: &Path, full: &Path) -> Option<Module> {
    let extension = relative.extension()?.to_str()?;
    let kind = match extension {
        SOURCE_EXT => ModuleKind::Source,
        "so" | "dylib" | "dll" => ModuleKind::Compiled,
        _ => return None,
    };

    let stem = relative.with_extension("");
    let dotted: Vec<String> = stem
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let name = format!("{package}.{}", dotted.join("."));

    let kind = if is_script_name(&name) {
        ModuleKind::Script
    } else {
        kind
    };

    Some(Module {
        name,
        kind,
        source: ModuleSource::File(full.to_path_buf()),
    })
}

/// Naming convention: demos, tests, benchmarks and apps are scripts
fn is_script_name(name: &str) -> bool {
    SCRIPT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// All packages known to the session, indexed for owner lookups.
///
/// Immutable for the duration of a query session; a re-scan builds a
/// fresh catalog and the caller clears caches.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    packages: BTreeMap<PackageName, Package>,
    builtins: BTreeSet<ModuleName>,
    /// Fast owner index over installed packages' tracked modules
    owners: BTreeMap<ModuleName, PackageName>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already-scanned packages
    pub fn from_packages(packages: impl IntoIterator<Item = Package>) -> Self {
        let mut catalog = Self::new();
        for package in packages {
            catalog.insert(package);
        }
        catalog
    }

    /// Scan every package directory under an installation root.
    ///
    /// A package directory is any direct child carrying a manifest.
    pub fn scan(root: &Path) -> GraphResult<Self> {
        let mut catalog = Self::new();
        let entries = std::fs::read_dir(root).map_err(|e| GraphError::io(root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| GraphError::io(root, e))?;
            let dir = entry.path();
            if dir.is_dir() && dir.join(MANIFEST_FILE).is_file() {
                catalog.insert(Package::scan(&dir)?);
            }
        }
        Ok(catalog)
    }

    /// Add a package, indexing its tracked modules
    pub fn insert(&mut self, package: Package) {
        if package.installed {
            for module in package.tracked_modules() {
                self.owners
                    .insert(module.name.clone(), package.name.clone());
            }
        }
        self.packages.insert(package.name.clone(), package);
    }

    /// Register a built-in module owned by no package
    pub fn add_builtin(&mut self, module: impl Into<ModuleName>) {
        self.builtins.insert(module.into());
    }

    /// Whether the module ships with the runtime
    pub fn is_builtin(&self, module: &str) -> bool {
        self.builtins.contains(module)
    }

    /// Look up a package, failing on unknown names
    pub fn package(&self, name: &str) -> GraphResult<&Package> {
        self.packages
            .get(name)
            .ok_or_else(|| GraphError::unknown_package(name))
    }

    /// Look up a package without failing
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// All packages, name-ordered
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    /// Installed packages, name-ordered
    pub fn installed(&self) -> impl Iterator<Item = &Package> {
        self.packages.values().filter(|p| p.installed)
    }

    /// Names of all installed packages
    pub fn installed_names(&self) -> Vec<PackageName> {
        self.installed().map(|p| p.name.clone()).collect()
    }

    /// Find the owning package of a module.
    ///
    /// Fast index first; on a miss, fall back to scanning every known
    /// package's full module table. The slow path keeps owner lookup
    /// total over module names the index never saw (scripts, modules of
    /// not-installed packages). Built-ins have no owner.
    pub fn owner_of(&self, module: &str) -> Option<&PackageName> {
        if self.builtins.contains(module) {
            return None;
        }
        if let Some(owner) = self.owners.get(module) {
            return Some(owner);
        }
        self.packages
            .values()
            .find(|p| p.modules.contains_key(module))
            .map(|p| &p.name)
    }
}
