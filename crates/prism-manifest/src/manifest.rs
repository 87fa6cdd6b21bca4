//! Package manifest parsing and types (package.toml)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// File name every installed package carries at its root
pub const MANIFEST_FILE: &str = "package.toml";

/// Convenience alias used in binary-dependency tables
pub type ManifestName = String;

/// Package manifest (package.toml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageManifest {
    pub package: PackageMetadata,
    /// Platform key → native/binary dependency names declared for it.
    /// Platform keys are parsed by the engine; unknown keys surface as
    /// unknown-platform errors there, not here.
    #[serde(default, rename = "binary-deps")]
    pub binary_deps: BTreeMap<String, BTreeSet<ManifestName>>,
    /// Platforms the package can be built for. Absent means all.
    #[serde(default, rename = "supported-platforms")]
    pub supported_platforms: Option<BTreeSet<String>>,
}

impl PackageManifest {
    /// Parse manifest from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load manifest from file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_str(&content)?)
    }

    /// Serialize to TOML string
    pub fn to_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Declared binary dependencies for one platform key
    pub fn binary_deps_for(&self, platform_key: &str) -> BTreeSet<ManifestName> {
        self.binary_deps
            .get(platform_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the manifest allows building for the given platform key
    pub fn supports(&self, platform_key: &str) -> bool {
        match &self.supported_platforms {
            Some(platforms) => platforms.contains(platform_key),
            None => true,
        }
    }
}

/// Package metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: semver::Version,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
}
