//! Collaborator traits for dependency-fact acquisition
//!
//! The engine never knows how dependency facts are obtained. Locally
//! they come from a [`Tracer`] that loads the module in an isolated
//! interpreter; for platforms the local process cannot evaluate, a
//! [`RemoteExecutor`] runs the same acquisition on a differently
//! targeted instance.

use crate::platform::Platform;
use crate::record::{ModuleName, PackageName, TrackingRecord};
use crate::snapshot::PlatformPartition;
use thiserror::Error;

/// Acquisition failures. These are isolated per platform and surface as
/// inert "no data" results, never as aborted sibling acquisitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("Tracer unavailable: {0}")]
    Unavailable(String),

    #[error("Remote target unreachable for {platform}: {message}")]
    RemoteUnreachable { platform: Platform, message: String },

    #[error("Trace failed: {0}")]
    Failed(String),
}

/// One module to acquire a record for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRequest {
    pub module: ModuleName,
    pub package: PackageName,
}

impl TraceRequest {
    pub fn new(module: impl Into<ModuleName>, package: impl Into<PackageName>) -> Self {
        Self {
            module: module.into(),
            package: package.into(),
        }
    }
}

/// Executes a module in an isolated environment and reports what it
/// pulled in.
///
/// Implementations must be idempotent per key and must not leak state
/// between calls. A module that fails to load is a successful trace
/// whose record carries `load_error`; `Err` means the tracer itself
/// could not run.
pub trait Tracer: Send + Sync {
    fn trace(&self, module: &str, package: &str) -> Result<TrackingRecord, TraceError>;
}

/// Runs an acquisition batch on an instance targeting another platform.
pub trait RemoteExecutor: Send + Sync {
    fn acquire(
        &self,
        platform: Platform,
        requests: &[TraceRequest],
    ) -> Result<PlatformPartition, TraceError>;
}
