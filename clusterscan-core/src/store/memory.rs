use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    fmt,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::debug;

use clusterscan_model::prelude::{
    ClusterScan, ClusterScanProfile, ClusterScanReport, ConfigArtifact,
    DeletePropagation, ReportName, RunObjectKey, ScanName, ScanRun,
};

use super::{
    ArtifactRepository, ProfileRepository, ReportRepository, ResourceKind,
    RunObjectEvent, RunObjectRepository, ScanRepository, StoreError,
    StoreResult,
};

/// Store calls that can be counted and made to fail on demand.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StoreOperation {
    GetScan,
    UpdateScanStatus,
    GetRunObject,
    ListRunObjects,
    DeleteRunObject,
    CreateReport,
    ReplaceReport,
    GetReport,
    GetConfigArtifact,
    GetProfile,
}

impl StoreOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::GetScan => "get_scan",
            StoreOperation::UpdateScanStatus => "update_scan_status",
            StoreOperation::GetRunObject => "get_run_object",
            StoreOperation::ListRunObjects => "list_run_objects",
            StoreOperation::DeleteRunObject => "delete_run_object",
            StoreOperation::CreateReport => "create_report",
            StoreOperation::ReplaceReport => "replace_report",
            StoreOperation::GetReport => "get_report",
            StoreOperation::GetConfigArtifact => "get_config_artifact",
            StoreOperation::GetProfile => "get_profile",
        }
    }
}

/// One completed run-object deletion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionRecord {
    pub key: RunObjectKey,
    pub propagation: DeletePropagation,
    pub deleted_at: DateTime<Utc>,
}

/// Initial store contents, typically loaded from a JSON fixture.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreSeed {
    pub scans: Vec<ClusterScan>,
    pub profiles: Vec<ClusterScanProfile>,
    pub artifacts: Vec<ConfigArtifact>,
    pub runs: Vec<ScanRun>,
}

#[derive(Debug, Default)]
struct StoreState {
    scans: BTreeMap<ScanName, ClusterScan>,
    runs: BTreeMap<RunObjectKey, ScanRun>,
    reports: BTreeMap<ReportName, ClusterScanReport>,
    artifacts: BTreeMap<(String, String), ConfigArtifact>,
    profiles: BTreeMap<String, ClusterScanProfile>,
    deletions: Vec<DeletionRecord>,
    last_resource_version: u64,
}

impl StoreState {
    fn next_version(&mut self) -> u64 {
        self.last_resource_version += 1;
        self.last_resource_version
    }
}

#[derive(Debug, Default)]
struct Instrumentation {
    calls: HashMap<StoreOperation, u64>,
    faults: HashMap<StoreOperation, VecDeque<StoreError>>,
}

/// Process-local resource store.
///
/// Writes bump a store-wide resource version, scan status updates are
/// guarded by that version, and run-object changes fan out over a broadcast
/// channel the same way a watch would deliver them.
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    instrumentation: Mutex<Instrumentation>,
    events: broadcast::Sender<RunObjectEvent>,
    channel_capacity: usize,
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("InMemoryStore");
        debug
            .field("channel_capacity", &self.channel_capacity)
            .field("watchers", &self.events.receiver_count());

        match self.state.try_read() {
            Ok(state) => {
                debug
                    .field("scans", &state.scans.len())
                    .field("runs", &state.runs.len())
                    .field("reports", &state.reports.len())
                    .field("resource_version", &state.last_resource_version);
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }

        debug.finish()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(256)
    }
}

impl InMemoryStore {
    pub fn new(channel_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            state: RwLock::new(StoreState::default()),
            instrumentation: Mutex::new(Instrumentation::default()),
            events,
            channel_capacity,
        }
    }

    pub async fn seed(&self, seed: StoreSeed) {
        for profile in seed.profiles {
            self.put_profile(profile).await;
        }
        for artifact in seed.artifacts {
            self.put_config_artifact(artifact).await;
        }
        for scan in seed.scans {
            self.apply_scan(scan).await;
        }
        for run in seed.runs {
            self.apply_run_object(run).await;
        }
    }

    /// Creates or replaces a scan wholesale, as the scheduling collaborator
    /// would, returning the stored copy.
    pub async fn apply_scan(&self, mut scan: ClusterScan) -> ClusterScan {
        let mut state = self.state.write().await;
        scan.resource_version = state.next_version();
        state.scans.insert(scan.name.clone(), scan.clone());
        scan
    }

    pub async fn remove_scan(&self, name: &ScanName) -> Option<ClusterScan> {
        self.state.write().await.scans.remove(name)
    }

    /// Creates or replaces a run-object and notifies watchers.
    pub async fn apply_run_object(&self, mut run: ScanRun) -> ScanRun {
        {
            let mut state = self.state.write().await;
            run.resource_version = state.next_version();
            state.runs.insert(run.key.clone(), run.clone());
        }
        let _ = self.events.send(RunObjectEvent::Applied(run.clone()));
        run
    }

    /// Stamps a deletion marker on a run-object without removing it.
    pub async fn mark_run_deleting(
        &self,
        key: &RunObjectKey,
    ) -> Option<ScanRun> {
        let run = {
            let mut state = self.state.write().await;
            let version = state.next_version();
            let run = state.runs.get_mut(key)?;
            run.deletion_timestamp = Some(Utc::now());
            run.resource_version = version;
            run.clone()
        };
        let _ = self.events.send(RunObjectEvent::Applied(run.clone()));
        Some(run)
    }

    pub async fn put_config_artifact(&self, artifact: ConfigArtifact) {
        let mut state = self.state.write().await;
        state.artifacts.insert(
            (artifact.namespace.clone(), artifact.name.clone()),
            artifact,
        );
    }

    pub async fn put_profile(&self, profile: ClusterScanProfile) {
        let mut state = self.state.write().await;
        state.profiles.insert(profile.name.clone(), profile);
    }

    pub async fn scan(&self, name: &ScanName) -> Option<ClusterScan> {
        self.state.read().await.scans.get(name).cloned()
    }

    pub async fn run_object(&self, key: &RunObjectKey) -> Option<ScanRun> {
        self.state.read().await.runs.get(key).cloned()
    }

    pub async fn reports(&self) -> Vec<ClusterScanReport> {
        self.state.read().await.reports.values().cloned().collect()
    }

    pub async fn deletions(&self) -> Vec<DeletionRecord> {
        self.state.read().await.deletions.clone()
    }

    /// Queues `error` as the result of the next call to `operation`.
    /// Repeated calls queue further failures in order.
    pub async fn fail_next(&self, operation: StoreOperation, error: StoreError) {
        let mut instrumentation = self.instrumentation.lock().await;
        instrumentation
            .faults
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Number of calls made to `operation`, including injected failures.
    pub async fn calls(&self, operation: StoreOperation) -> u64 {
        let instrumentation = self.instrumentation.lock().await;
        instrumentation
            .calls
            .get(&operation)
            .copied()
            .unwrap_or_default()
    }

    pub async fn reset_calls(&self) {
        self.instrumentation.lock().await.calls.clear();
    }

    async fn enter(&self, operation: StoreOperation) -> StoreResult<()> {
        let mut instrumentation = self.instrumentation.lock().await;
        *instrumentation.calls.entry(operation).or_default() += 1;
        match instrumentation
            .faults
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => {
                debug!(
                    target: "clusterscan::store",
                    operation = operation.as_str(),
                    error = %error,
                    "injected store failure"
                );
                Err(error)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ScanRepository for InMemoryStore {
    async fn get_scan(&self, name: &ScanName) -> StoreResult<ClusterScan> {
        self.enter(StoreOperation::GetScan).await?;
        self.state.read().await.scans.get(name).cloned().ok_or_else(|| {
            StoreError::NotFound {
                kind: ResourceKind::ClusterScan,
                name: name.to_string(),
            }
        })
    }

    async fn update_scan_status(
        &self,
        scan: &ClusterScan,
    ) -> StoreResult<ClusterScan> {
        self.enter(StoreOperation::UpdateScanStatus).await?;
        let mut state = self.state.write().await;
        let version = state.last_resource_version + 1;
        let current = state.scans.get_mut(&scan.name).ok_or_else(|| {
            StoreError::NotFound {
                kind: ResourceKind::ClusterScan,
                name: scan.name.to_string(),
            }
        })?;

        if current.resource_version != scan.resource_version {
            return Err(StoreError::Conflict {
                kind: ResourceKind::ClusterScan,
                name: scan.name.to_string(),
                expected: scan.resource_version,
                actual: current.resource_version,
            });
        }

        current.status = scan.status.clone();
        current.resource_version = version;
        let updated = current.clone();
        state.last_resource_version = version;
        Ok(updated)
    }
}

#[async_trait]
impl RunObjectRepository for InMemoryStore {
    async fn get_run_object(
        &self,
        key: &RunObjectKey,
    ) -> StoreResult<Option<ScanRun>> {
        self.enter(StoreOperation::GetRunObject).await?;
        Ok(self.state.read().await.runs.get(key).cloned())
    }

    async fn list_run_objects(&self) -> StoreResult<Vec<ScanRun>> {
        self.enter(StoreOperation::ListRunObjects).await?;
        Ok(self.state.read().await.runs.values().cloned().collect())
    }

    async fn delete_run_object(
        &self,
        key: &RunObjectKey,
        propagation: DeletePropagation,
    ) -> StoreResult<()> {
        self.enter(StoreOperation::DeleteRunObject).await?;
        let removed = {
            let mut state = self.state.write().await;
            let removed = state.runs.remove(key).ok_or_else(|| {
                StoreError::NotFound {
                    kind: ResourceKind::ScanRun,
                    name: key.to_string(),
                }
            })?;
            state.next_version();
            state.deletions.push(DeletionRecord {
                key: key.clone(),
                propagation,
                deleted_at: Utc::now(),
            });
            removed
        };
        let _ = self.events.send(RunObjectEvent::Deleted(removed));
        Ok(())
    }

    fn watch_run_objects(&self) -> broadcast::Receiver<RunObjectEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ReportRepository for InMemoryStore {
    async fn create_report(
        &self,
        report: &ClusterScanReport,
    ) -> StoreResult<ClusterScanReport> {
        self.enter(StoreOperation::CreateReport).await?;
        let mut state = self.state.write().await;
        if state.reports.contains_key(&report.name) {
            return Err(StoreError::AlreadyExists {
                kind: ResourceKind::ClusterScanReport,
                name: report.name.to_string(),
            });
        }

        let mut stored = report.clone();
        stored.resource_version = state.next_version();
        stored.created_at = Some(Utc::now());
        state.reports.insert(stored.name.clone(), stored.clone());
        Ok(stored)
    }

    async fn replace_report(
        &self,
        report: &ClusterScanReport,
    ) -> StoreResult<ClusterScanReport> {
        self.enter(StoreOperation::ReplaceReport).await?;
        let mut state = self.state.write().await;
        let version = state.next_version();
        let Some(existing) = state.reports.get_mut(&report.name) else {
            return Err(StoreError::NotFound {
                kind: ResourceKind::ClusterScanReport,
                name: report.name.to_string(),
            });
        };

        existing.spec = report.spec.clone();
        existing.resource_version = version;
        Ok(existing.clone())
    }

    async fn get_report(
        &self,
        name: &ReportName,
    ) -> StoreResult<ClusterScanReport> {
        self.enter(StoreOperation::GetReport).await?;
        self.state.read().await.reports.get(name).cloned().ok_or_else(
            || StoreError::NotFound {
                kind: ResourceKind::ClusterScanReport,
                name: name.to_string(),
            },
        )
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryStore {
    async fn get_config_artifact(
        &self,
        namespace: &str,
        name: &str,
    ) -> StoreResult<ConfigArtifact> {
        self.enter(StoreOperation::GetConfigArtifact).await?;
        self.state
            .read()
            .await
            .artifacts
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: ResourceKind::ConfigArtifact,
                name: format!("{namespace}/{name}"),
            })
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn get_profile(&self, name: &str) -> StoreResult<ClusterScanProfile> {
        self.enter(StoreOperation::GetProfile).await?;
        self.state.read().await.profiles.get(name).cloned().ok_or_else(
            || StoreError::NotFound {
                kind: ResourceKind::ClusterScanProfile,
                name: name.to_string(),
            },
        )
    }
}
