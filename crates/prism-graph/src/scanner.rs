//! Source-text scanning collaborator

use prism_store::ModuleName;
use std::collections::BTreeSet;

/// Detects dependency hints by inspecting a module's source text.
///
/// Static detection is a best-effort supplement to load-time tracing,
/// never a replacement: the engine subtracts traced load-time names
/// from whatever a scanner reports. Implementations live outside this
/// crate (regex scan, parser, none at all).
pub trait SourceScanner: Send + Sync {
    /// Module names referenced by the source of (module, package)
    fn scan(&self, module: &str, package: &str) -> BTreeSet<ModuleName>;
}

/// Scanner that detects nothing; queries fall back to load-time facts
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScanner;

impl SourceScanner for NullScanner {
    fn scan(&self, _module: &str, _package: &str) -> BTreeSet<ModuleName> {
        BTreeSet::new()
    }
}
