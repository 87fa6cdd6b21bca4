//! Tracking-record store for the Prism reflection engine
//!
//! Raw dependency facts are produced per (module, package, platform) by
//! an external tracer and kept in a persisted snapshot. This crate owns:
//!
//! - the [`Platform`] model (operating system × word size),
//! - the [`TrackingRecord`] data model,
//! - the [`Snapshot`] persisted as platform → package → module → record,
//!   written via atomic replace,
//! - the [`Tracer`] / [`RemoteExecutor`] collaborator traits,
//! - the [`TrackingStore`] front door: snapshot hit, tracer acquisition
//!   when permitted, empty record otherwise,
//! - the concurrent per-platform acquisition pass ([`TrackingStore::acquire_all`]).

pub mod acquire;
pub mod platform;
pub mod record;
pub mod snapshot;
pub mod store;
pub mod tracer;

pub use acquire::AcquireReport;
pub use platform::{OsFamily, Platform, PlatformParseError};
pub use record::{ModuleName, PackageName, TrackingRecord};
pub use snapshot::{PlatformPartition, Snapshot};
pub use store::{StoreConfig, TrackingStore};
pub use tracer::{RemoteExecutor, TraceError, TraceRequest, Tracer};

use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Snapshot format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Snapshot version {found} is newer than supported version {supported}")]
    Version { found: u32, supported: u32 },

    #[error("No snapshot path configured")]
    NoSnapshotPath,
}

impl StoreError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}
