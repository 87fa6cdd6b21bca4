//! Persisted tracking snapshot (platform → package → module → record)

use crate::platform::Platform;
use crate::record::{ModuleName, PackageName, TrackingRecord};
use crate::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// One platform's worth of records: package → module → record
pub type PlatformPartition = BTreeMap<PackageName, BTreeMap<ModuleName, TrackingRecord>>;

/// The persisted tracking state for an installation.
///
/// Partitions for different platforms are disjoint; merging into one
/// partition never touches another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,
    /// Per-platform record partitions
    #[serde(default)]
    pub platforms: BTreeMap<Platform, PlatformPartition>,
}

impl Snapshot {
    /// Current snapshot format version
    pub const VERSION: u32 = 1;

    /// Create a new empty snapshot
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            platforms: BTreeMap::new(),
        }
    }

    /// Look up a record by its full key
    pub fn get(
        &self,
        platform: Platform,
        package: &str,
        module: &str,
    ) -> Option<&TrackingRecord> {
        self.platforms
            .get(&platform)?
            .get(package)?
            .get(module)
    }

    /// Insert a single record, replacing any existing one wholesale
    pub fn insert(
        &mut self,
        platform: Platform,
        package: impl Into<PackageName>,
        module: impl Into<ModuleName>,
        record: TrackingRecord,
    ) {
        self.platforms
            .entry(platform)
            .or_default()
            .entry(package.into())
            .or_default()
            .insert(module.into(), record);
    }

    /// Merge a batch of records into one platform partition.
    ///
    /// Union at the package and module level; an incoming record
    /// replaces an existing record for the same module key. Commutative
    /// across platforms since partitions are disjoint.
    pub fn merge(&mut self, platform: Platform, partition: PlatformPartition) {
        let target = self.platforms.entry(platform).or_default();
        for (package, modules) in partition {
            target.entry(package).or_default().extend(modules);
        }
    }

    /// Drop every record for one package across all platforms
    pub fn remove_package(&mut self, package: &str) {
        for partition in self.platforms.values_mut() {
            partition.remove(package);
        }
    }

    /// Drop all records
    pub fn clear(&mut self) {
        self.platforms.clear();
    }

    /// Total number of records across all platforms
    pub fn record_count(&self) -> usize {
        self.platforms
            .values()
            .flat_map(|p| p.values())
            .map(BTreeMap::len)
            .sum()
    }

    /// Load a snapshot from disk.
    ///
    /// A missing file is an empty snapshot, not an error; a snapshot
    /// written by a newer format version is refused.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no snapshot on disk, starting empty");
                return Ok(Self::new());
            }
            Err(error) => return Err(StoreError::io(path, error)),
        };
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        if snapshot.version > Self::VERSION {
            return Err(StoreError::Version {
                found: snapshot.version,
                supported: Self::VERSION,
            });
        }
        Ok(snapshot)
    }

    /// Write the snapshot to disk atomically.
    ///
    /// Serializes to a temporary file in the target directory and
    /// renames it over the destination, so a crash mid-write cannot
    /// leave a torn snapshot behind.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| StoreError::io(parent, e))?;
        let content = serde_json::to_string_pretty(self)?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| StoreError::io(tmp.path().to_path_buf(), e))?;
        tmp.persist(path)
            .map_err(|e| StoreError::io(path, e.error))?;

        debug!(path = %path.display(), records = self.record_count(), "snapshot saved");
        Ok(())
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn partition(entries: &[(&str, &str, TrackingRecord)]) -> PlatformPartition {
        let mut partition = PlatformPartition::new();
        for (package, module, record) in entries {
            partition
                .entry(package.to_string())
                .or_default()
                .insert(module.to_string(), record.clone());
        }
        partition
    }

    #[test]
    fn test_insert_and_get() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            Platform::Linux64,
            "imaging",
            "imaging.core",
            TrackingRecord::with_loads(["core.fs"]),
        );

        let record = snapshot
            .get(Platform::Linux64, "imaging", "imaging.core")
            .unwrap();
        assert!(record.loads.contains("core.fs"));
        assert!(snapshot.get(Platform::Win64, "imaging", "imaging.core").is_none());
    }

    #[test]
    fn test_merge_unions_per_module() {
        let mut snapshot = Snapshot::new();
        snapshot.merge(
            Platform::Linux64,
            partition(&[("imaging", "imaging.core", TrackingRecord::empty())]),
        );
        snapshot.merge(
            Platform::Linux64,
            partition(&[
                ("imaging", "imaging.codecs", TrackingRecord::empty()),
                ("sound", "sound.core", TrackingRecord::empty()),
            ]),
        );

        assert_eq!(snapshot.record_count(), 3);

        // replacement is wholesale per module key
        snapshot.merge(
            Platform::Linux64,
            partition(&[(
                "imaging",
                "imaging.core",
                TrackingRecord::with_loads(["core.str"]),
            )]),
        );
        let record = snapshot
            .get(Platform::Linux64, "imaging", "imaging.core")
            .unwrap();
        assert!(record.loads.contains("core.str"));
    }

    #[test]
    fn test_merge_platforms_disjoint() {
        let mut snapshot = Snapshot::new();
        snapshot.merge(
            Platform::Linux64,
            partition(&[("imaging", "imaging.core", TrackingRecord::empty())]),
        );
        snapshot.merge(
            Platform::Win64,
            partition(&[("imaging", "imaging.core", TrackingRecord::failed("dll missing"))]),
        );

        assert!(snapshot
            .get(Platform::Linux64, "imaging", "imaging.core")
            .unwrap()
            .load_error
            .is_none());
        assert!(snapshot
            .get(Platform::Win64, "imaging", "imaging.core")
            .unwrap()
            .load_error
            .is_some());
    }

    #[test]
    fn test_remove_package_spans_platforms() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(Platform::Linux64, "imaging", "imaging.core", TrackingRecord::empty());
        snapshot.insert(Platform::Win64, "imaging", "imaging.core", TrackingRecord::empty());
        snapshot.insert(Platform::Linux64, "sound", "sound.core", TrackingRecord::empty());

        snapshot.remove_package("imaging");

        assert_eq!(snapshot.record_count(), 1);
        assert!(snapshot.get(Platform::Linux64, "sound", "sound.core").is_some());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::load(&dir.path().join("tracking.json")).unwrap();
        assert_eq!(snapshot, Snapshot::new());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");

        let mut snapshot = Snapshot::new();
        snapshot.insert(
            Platform::Mac64,
            "imaging",
            "imaging.core",
            TrackingRecord::with_loads(["core.fs"]),
        );
        snapshot.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");

        let mut snapshot = Snapshot::new();
        snapshot.save(&path).unwrap();
        snapshot.insert(Platform::Linux64, "imaging", "imaging.core", TrackingRecord::empty());
        snapshot.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded.record_count(), 1);
    }

    #[test]
    fn test_load_refuses_newer_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(&path, r#"{"version": 99, "platforms": {}}"#).unwrap();

        let result = Snapshot::load(&path);
        assert!(matches!(
            result,
            Err(StoreError::Version { found: 99, .. })
        ));
    }
}
