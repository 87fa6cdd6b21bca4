//! Per-(module, package, platform) dependency records

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Dotted/qualified module name, e.g. `imaging.codecs.png`
pub type ModuleName = String;

/// Unique package name
pub type PackageName = String;

/// Load-error fragments that mean "this module intentionally does not
/// support this platform" rather than a genuine failure
const UNSUPPORTED_MARKERS: [&str; 2] = ["not supported on this platform", "unsupported platform"];

/// Everything the tracer observed for one (module, package, platform).
///
/// Records are immutable once stored: cache invalidation replaces them
/// wholesale, never field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    /// Modules observed to be required at load time
    #[serde(default)]
    pub loads: BTreeSet<ModuleName>,
    /// Native library identifier → whether it loaded successfully
    #[serde(default)]
    pub native_libs: BTreeMap<String, bool>,
    /// Declared lazy-load associations: symbol → providing module
    #[serde(default)]
    pub autoloads: BTreeMap<String, ModuleName>,
    /// Error message if the traced load failed
    #[serde(default)]
    pub load_error: Option<String>,
}

impl TrackingRecord {
    /// Record with no observations (also used when acquisition is not
    /// permitted or a collaborator is unavailable)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record for a module whose traced load failed
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            load_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Record with the given load-time dependencies
    pub fn with_loads<I, S>(loads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ModuleName>,
    {
        Self {
            loads: loads.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Whether the record carries no observations at all
    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
            && self.native_libs.is_empty()
            && self.autoloads.is_empty()
            && self.load_error.is_none()
    }

    /// Load-time dependencies this record contributes to the graph.
    ///
    /// A module that failed to load is assumed to have had no further
    /// effect, so a failed record contributes nothing; reporting its
    /// partial observations would produce phantom edges.
    pub fn effective_loads(&self) -> BTreeSet<ModuleName> {
        if self.load_error.is_some() {
            BTreeSet::new()
        } else {
            self.loads.clone()
        }
    }

    /// Modules reachable through declared lazy-load associations
    pub fn autoload_targets(&self) -> BTreeSet<ModuleName> {
        self.autoloads.values().cloned().collect()
    }

    /// Whether the load error is an intentional platform-unsupported
    /// signal rather than a genuine failure
    pub fn is_platform_unsupported(&self) -> bool {
        match &self.load_error {
            Some(message) => {
                let lower = message.to_lowercase();
                UNSUPPORTED_MARKERS.iter().any(|m| lower.contains(m))
            }
            None => false,
        }
    }
}
