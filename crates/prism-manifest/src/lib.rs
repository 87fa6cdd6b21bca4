//! Prism package manifest system
//!
//! Parses `package.toml` manifests: package metadata, per-platform
//! binary dependency tables, and the supported-platform list the
//! build-order planner prunes against.

pub mod manifest;

pub use manifest::{ManifestName, PackageManifest, PackageMetadata};

/// Manifest errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize manifest: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Semver error: {0}")]
    SemverError(#[from] semver::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value: {field} - {reason}")]
    InvalidField { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ManifestError>;
