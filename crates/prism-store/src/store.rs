//! Tracking store: snapshot-backed record access with on-demand tracing

use crate::platform::Platform;
use crate::record::TrackingRecord;
use crate::snapshot::{PlatformPartition, Snapshot};
use crate::tracer::{RemoteExecutor, Tracer};
use crate::StoreResult;
use prism_cache::ScopeInvalidate;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Store options
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether a snapshot miss may invoke the tracer. When false,
    /// misses yield empty records.
    pub auto_acquire: bool,
    /// Where the snapshot is persisted. `None` keeps the store
    /// memory-only.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            auto_acquire: true,
            snapshot_path: None,
        }
    }
}

impl StoreConfig {
    /// Config persisting to the given snapshot path
    pub fn persisted(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Disable on-demand tracer acquisition
    pub fn without_auto_acquire(mut self) -> Self {
        self.auto_acquire = false;
        self
    }
}

/// Snapshot-backed access to tracking records.
///
/// Lookup order for `record()`: snapshot hit, then tracer acquisition
/// (host platform only, and only when configured), then the empty
/// record. Tracer failures are inert: they log, return the empty
/// record, and leave the snapshot untouched so a later call can retry.
pub struct TrackingStore {
    config: StoreConfig,
    host: Platform,
    snapshot: Mutex<Snapshot>,
    tracer: Arc<dyn Tracer>,
    remote: Option<Arc<dyn RemoteExecutor>>,
}

impl TrackingStore {
    /// Create a store with an empty in-memory snapshot
    pub fn new(config: StoreConfig, tracer: Arc<dyn Tracer>) -> Self {
        Self {
            config,
            host: Platform::current(),
            snapshot: Mutex::new(Snapshot::new()),
            tracer,
            remote: None,
        }
    }

    /// Create a store, loading the persisted snapshot if one is
    /// configured and present
    pub fn open(config: StoreConfig, tracer: Arc<dyn Tracer>) -> StoreResult<Self> {
        let snapshot = match &config.snapshot_path {
            Some(path) => Snapshot::load(path)?,
            None => Snapshot::new(),
        };
        let mut store = Self::new(config, tracer);
        store.snapshot = Mutex::new(snapshot);
        Ok(store)
    }

    /// Attach a remote executor for non-host platforms
    pub fn with_remote(mut self, remote: Arc<dyn RemoteExecutor>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Override the host platform (tests trace for arbitrary platforms)
    pub fn with_host(mut self, host: Platform) -> Self {
        self.host = host;
        self
    }

    /// Platform records the local tracer can produce
    pub fn host(&self) -> Platform {
        self.host
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteExecutor>> {
        self.remote.as_ref()
    }

    pub fn tracer(&self) -> &Arc<dyn Tracer> {
        &self.tracer
    }

    /// Fetch the record for (module, package, platform).
    ///
    /// Never fails: anything unobtainable is the empty record.
    pub fn record(&self, module: &str, package: &str, platform: Platform) -> TrackingRecord {
        if let Some(record) = self.lookup(module, package, platform) {
            return record;
        }
        if !self.config.auto_acquire || platform != self.host {
            return TrackingRecord::empty();
        }

        match self.tracer.trace(module, package) {
            Ok(record) => {
                debug!(module, package, %platform, "traced on demand");
                let mut snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
                snapshot.insert(platform, package, module, record.clone());
                record
            }
            Err(error) => {
                warn!(module, package, %platform, %error, "tracer failed, treating as no data");
                TrackingRecord::empty()
            }
        }
    }

    /// Snapshot lookup without acquisition
    pub fn lookup(
        &self,
        module: &str,
        package: &str,
        platform: Platform,
    ) -> Option<TrackingRecord> {
        let snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        snapshot.get(platform, package, module).cloned()
    }

    /// Merge a batch of records into one platform partition
    pub fn merge(&self, platform: Platform, partition: PlatformPartition) {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        snapshot.merge(platform, partition);
    }

    /// Persist the snapshot to its configured path
    pub fn save(&self) -> StoreResult<()> {
        let path = self
            .config
            .snapshot_path
            .as_ref()
            .ok_or(crate::StoreError::NoSnapshotPath)?;
        let snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        snapshot.save(path)
    }

    /// Total records currently resident
    pub fn record_count(&self) -> usize {
        let snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        snapshot.record_count()
    }
}

impl ScopeInvalidate for TrackingStore {
    /// Dropping a package's records forces re-tracing on next access
    fn invalidate_scope(&self, scope: &str) {
        debug!(package = scope, "dropping tracked records");
        let mut snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        snapshot.remove_package(scope);
    }

    fn invalidate_all(&self) {
        debug!("dropping all tracked records");
        let mut snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        snapshot.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::TraceError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tracer that counts invocations and serves canned records
    struct CountingTracer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingTracer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Tracer for CountingTracer {
        fn trace(&self, module: &str, _package: &str) -> Result<TrackingRecord, TraceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TraceError::Unavailable("interpreter missing".to_string()));
            }
            Ok(TrackingRecord::with_loads([format!("{module}.dep")]))
        }
    }

    fn store_with(tracer: Arc<CountingTracer>) -> TrackingStore {
        TrackingStore::new(StoreConfig::default(), tracer).with_host(Platform::Linux64)
    }

    #[test]
    fn test_record_traces_once_then_hits_snapshot() {
        let tracer = Arc::new(CountingTracer::new());
        let store = store_with(tracer.clone());

        let first = store.record("imaging.core", "imaging", Platform::Linux64);
        let second = store.record("imaging.core", "imaging", Platform::Linux64);

        assert_eq!(first, second);
        assert!(first.loads.contains("imaging.core.dep"));
        assert_eq!(tracer.calls(), 1);
    }

    #[test]
    fn test_record_without_auto_acquire_is_empty() {
        let tracer = Arc::new(CountingTracer::new());
        let store = TrackingStore::new(
            StoreConfig::default().without_auto_acquire(),
            tracer.clone(),
        )
        .with_host(Platform::Linux64);

        let record = store.record("imaging.core", "imaging", Platform::Linux64);
        assert!(record.is_empty());
        assert_eq!(tracer.calls(), 0);
    }

    #[test]
    fn test_record_for_foreign_platform_is_empty() {
        let tracer = Arc::new(CountingTracer::new());
        let store = store_with(tracer.clone());

        let record = store.record("imaging.core", "imaging", Platform::Win64);
        assert!(record.is_empty());
        assert_eq!(tracer.calls(), 0);
    }

    #[test]
    fn test_tracer_failure_is_inert_and_retryable() {
        let tracer = Arc::new(CountingTracer::failing());
        let store = store_with(tracer.clone());

        assert!(store.record("imaging.core", "imaging", Platform::Linux64).is_empty());
        assert!(store.record("imaging.core", "imaging", Platform::Linux64).is_empty());

        // not cached: each access retried the tracer
        assert_eq!(tracer.calls(), 2);
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn test_invalidate_scope_forces_retrace() {
        let tracer = Arc::new(CountingTracer::new());
        let store = store_with(tracer.clone());

        store.record("imaging.core", "imaging", Platform::Linux64);
        store.record("sound.core", "sound", Platform::Linux64);
        assert_eq!(tracer.calls(), 2);

        store.invalidate_scope("imaging");

        store.record("imaging.core", "imaging", Platform::Linux64);
        store.record("sound.core", "sound", Platform::Linux64);
        // imaging re-traced, sound untouched
        assert_eq!(tracer.calls(), 3);
    }

    #[test]
    fn test_open_and_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");
        let tracer = Arc::new(CountingTracer::new());

        let store = TrackingStore::open(StoreConfig::persisted(&path), tracer.clone())
            .unwrap()
            .with_host(Platform::Linux64);
        store.record("imaging.core", "imaging", Platform::Linux64);
        store.save().unwrap();

        let reopened = TrackingStore::open(StoreConfig::persisted(&path), tracer.clone())
            .unwrap()
            .with_host(Platform::Linux64);
        let record = reopened.record("imaging.core", "imaging", Platform::Linux64);
        assert!(record.loads.contains("imaging.core.dep"));
        // served from the persisted snapshot, not the tracer
        assert_eq!(tracer.calls(), 1);
    }

    #[test]
    fn test_save_without_path_errors() {
        let store = store_with(Arc::new(CountingTracer::new()));
        assert!(matches!(
            store.save(),
            Err(crate::StoreError::NoSnapshotPath)
        ));
    }
}
