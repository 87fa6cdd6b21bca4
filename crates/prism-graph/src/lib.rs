//! Prism dependency graph and build-order resolution
//!
//! Answers reflection queries over an installed package tree: what each
//! module pulls in at load time and at run time, the transitive closure
//! of those edges, who depends on a given module, and the order in
//! which packages must be built so every binary dependency is satisfied
//! first. Raw facts come from `prism-store` records and `prism-manifest`
//! metadata; every expensive lookup is memoized through `prism-cache`.
//!
//! Entry point is [`Engine`], which owns the package [`Catalog`], the
//! tracking store, and the cache registry.

pub mod catalog;
pub mod closure;
pub mod engine;
pub mod graph;
pub mod plan;
pub mod reverse;
pub mod scanner;

pub use catalog::{Catalog, Module, ModuleKind, ModuleSource, Package, RUNTIME_PACKAGE};
pub use closure::{closure_keys, closure_tree, DepNode, DepTree};
pub use engine::Engine;
pub use graph::DependencyGraph;
pub use plan::{plan_order, plan_stages};
pub use reverse::Dependents;
pub use scanner::SourceScanner;

use std::path::PathBuf;
use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

/// Resolution errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Unknown package: {name}")]
    UnknownPackage { name: String },

    #[error(transparent)]
    UnknownPlatform(#[from] prism_store::PlatformParseError),

    #[error("Cyclic binary dependency among packages: {}", remaining.join(", "))]
    CyclicDependency { remaining: Vec<String> },

    #[error("Manifest error: {0}")]
    Manifest(#[from] prism_manifest::ManifestError),

    #[error("Store error: {0}")]
    Store(#[from] prism_store::StoreError),

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl GraphError {
    /// Create an unknown-package error
    pub fn unknown_package(name: impl Into<String>) -> Self {
        Self::UnknownPackage { name: name.into() }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}
