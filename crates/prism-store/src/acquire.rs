//! Concurrent per-platform record acquisition

use crate::platform::Platform;
use crate::snapshot::PlatformPartition;
use crate::store::TrackingStore;
use crate::tracer::{TraceError, TraceRequest};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Outcome of an acquisition pass: how many records landed per
/// platform, and which platforms failed (with why).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquireReport {
    pub merged: BTreeMap<Platform, usize>,
    pub failures: BTreeMap<Platform, String>,
}

impl AcquireReport {
    /// Whether every requested platform produced a partition
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl TrackingStore {
    /// Acquire records for the given modules on every listed platform.
    ///
    /// One task runs per platform: the host platform traces locally,
    /// every other platform goes through the remote executor. A failed
    /// platform does not abort its siblings; partitions that did
    /// complete are merged and the failure is reported per platform.
    /// Merging happens on the calling thread after the fan-out joins,
    /// so each partition has a single writer.
    pub fn acquire_all(&self, requests: &[TraceRequest], platforms: &[Platform]) -> AcquireReport {
        let outcomes: Vec<(Platform, Result<PlatformPartition, TraceError>)> = platforms
            .par_iter()
            .map(|&platform| (platform, self.acquire_platform(requests, platform)))
            .collect();

        let mut report = AcquireReport::default();
        for (platform, outcome) in outcomes {
            match outcome {
                Ok(partition) => {
                    let count = partition.values().map(BTreeMap::len).sum();
                    debug!(%platform, records = count, "merging acquired partition");
                    self.merge(platform, partition);
                    report.merged.insert(platform, count);
                }
                Err(error) => {
                    warn!(%platform, %error, "platform acquisition failed");
                    report.failures.insert(platform, error.to_string());
                }
            }
        }
        report
    }

    fn acquire_platform(
        &self,
        requests: &[TraceRequest],
        platform: Platform,
    ) -> Result<PlatformPartition, TraceError> {
        if platform == self.host() {
            return self.trace_locally(requests);
        }
        match self.remote() {
            Some(remote) => remote.acquire(platform, requests),
            None => Err(TraceError::RemoteUnreachable {
                platform,
                message: "no remote executor configured".to_string(),
            }),
        }
    }

    /// Trace every request with the local tracer.
    ///
    /// Individual tracer errors fail the platform as a whole but keep
    /// the records observed before the failure out of the merge — a
    /// partial local pass is indistinguishable from an unreachable
    /// remote one to callers.
    fn trace_locally(&self, requests: &[TraceRequest]) -> Result<PlatformPartition, TraceError> {
        let mut partition = PlatformPartition::new();
        for request in requests {
            let record = self.tracer().trace(&request.module, &request.package)?;
            partition
                .entry(request.package.clone())
                .or_default()
                .insert(request.module.clone(), record);
        }
        Ok(partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TrackingRecord;
    use crate::store::StoreConfig;
    use crate::tracer::{RemoteExecutor, Tracer};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct StubTracer;

    impl Tracer for StubTracer {
        fn trace(&self, module: &str, _package: &str) -> Result<TrackingRecord, TraceError> {
            Ok(TrackingRecord::with_loads([format!("{module}.dep")]))
        }
    }

    /// Remote that serves some platforms and refuses others
    struct PartialRemote {
        reachable: Vec<Platform>,
    }

    impl RemoteExecutor for PartialRemote {
        fn acquire(
            &self,
            platform: Platform,
            requests: &[TraceRequest],
        ) -> Result<PlatformPartition, TraceError> {
            if !self.reachable.contains(&platform) {
                return Err(TraceError::RemoteUnreachable {
                    platform,
                    message: "target offline".to_string(),
                });
            }
            let mut partition = PlatformPartition::new();
            for request in requests {
                partition
                    .entry(request.package.clone())
                    .or_default()
                    .insert(request.module.clone(), TrackingRecord::empty());
            }
            Ok(partition)
        }
    }

    fn requests() -> Vec<TraceRequest> {
        vec![
            TraceRequest::new("imaging.core", "imaging"),
            TraceRequest::new("imaging.codecs", "imaging"),
            TraceRequest::new("sound.core", "sound"),
        ]
    }

    #[test]
    fn test_acquire_host_platform_locally() {
        let store = TrackingStore::new(StoreConfig::default(), Arc::new(StubTracer))
            .with_host(Platform::Linux64);

        let report = store.acquire_all(&requests(), &[Platform::Linux64]);

        assert!(report.is_complete());
        assert_eq!(report.merged.get(&Platform::Linux64), Some(&3));
        assert!(store
            .lookup("imaging.codecs", "imaging", Platform::Linux64)
            .is_some());
    }

    #[test]
    fn test_failures_isolated_per_platform() {
        let store = TrackingStore::new(StoreConfig::default(), Arc::new(StubTracer))
            .with_host(Platform::Linux64)
            .with_remote(Arc::new(PartialRemote {
                reachable: vec![Platform::Win64],
            }));

        let report = store.acquire_all(
            &requests(),
            &[Platform::Linux64, Platform::Win64, Platform::Mac64],
        );

        // two platforms merged, the unreachable one reported
        assert_eq!(report.merged.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures.contains_key(&Platform::Mac64));

        // completed partitions landed despite the sibling failure
        assert!(store.lookup("sound.core", "sound", Platform::Win64).is_some());
        assert!(store.lookup("sound.core", "sound", Platform::Mac64).is_none());
    }

    #[test]
    fn test_no_remote_configured_reports_unreachable() {
        let store = TrackingStore::new(StoreConfig::default(), Arc::new(StubTracer))
            .with_host(Platform::Linux64);

        let report = store.acquire_all(&requests(), &[Platform::Win64]);

        assert!(!report.is_complete());
        assert!(report.failures[&Platform::Win64].contains("no remote executor"));
        assert_eq!(store.record_count(), 0);
    }
}
