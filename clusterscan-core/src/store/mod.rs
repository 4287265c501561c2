//! Ports onto the resource store the controller reads from and writes to.
//!
//! Each repository trait covers one resource type. [`ResourceStore`] bundles
//! them for components that need the whole surface; anything implementing
//! every port gets it for free.

pub mod memory;

use std::{fmt, future::Future};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use clusterscan_model::prelude::{
    ClusterScan, ClusterScanProfile, ClusterScanReport, ConfigArtifact,
    DeletePropagation, ReportName, RunObjectKey, ScanName, ScanRun,
};

pub use memory::{DeletionRecord, InMemoryStore, StoreOperation, StoreSeed};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    ClusterScan,
    ScanRun,
    ClusterScanReport,
    ConfigArtifact,
    ClusterScanProfile,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::ClusterScan => write!(f, "clusterscan"),
            ResourceKind::ScanRun => write!(f, "scan run"),
            ResourceKind::ClusterScanReport => write!(f, "clusterscanreport"),
            ResourceKind::ConfigArtifact => write!(f, "config artifact"),
            ResourceKind::ClusterScanProfile => write!(f, "clusterscanprofile"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error(
        "conflict writing {kind} {name}: resource version {expected} is stale (current {actual})"
    )]
    Conflict {
        kind: ResourceKind,
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("store operation {operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("store operation {operation} cancelled")]
    Cancelled { operation: &'static str },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Change notification for a run-object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunObjectEvent {
    Applied(ScanRun),
    Deleted(ScanRun),
}

impl RunObjectEvent {
    pub fn run(&self) -> &ScanRun {
        match self {
            RunObjectEvent::Applied(run) | RunObjectEvent::Deleted(run) => run,
        }
    }

    pub fn key(&self) -> &RunObjectKey {
        &self.run().key
    }
}

#[async_trait]
pub trait ScanRepository: Send + Sync {
    async fn get_scan(&self, name: &ScanName) -> StoreResult<ClusterScan>;

    /// Replaces the status block of the stored scan. Rejected with
    /// [`StoreError::Conflict`] when `scan.resource_version` is stale.
    async fn update_scan_status(
        &self,
        scan: &ClusterScan,
    ) -> StoreResult<ClusterScan>;
}

#[async_trait]
pub trait RunObjectRepository: Send + Sync {
    async fn get_run_object(
        &self,
        key: &RunObjectKey,
    ) -> StoreResult<Option<ScanRun>>;

    async fn list_run_objects(&self) -> StoreResult<Vec<ScanRun>>;

    async fn delete_run_object(
        &self,
        key: &RunObjectKey,
        propagation: DeletePropagation,
    ) -> StoreResult<()>;

    /// At-least-once stream of run-object changes. Consumers filter by label.
    fn watch_run_objects(&self) -> broadcast::Receiver<RunObjectEvent>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Create-only; an existing report with the same name yields
    /// [`StoreError::AlreadyExists`].
    async fn create_report(
        &self,
        report: &ClusterScanReport,
    ) -> StoreResult<ClusterScanReport>;

    /// Overwrites the spec of an existing report, keeping its creation time.
    /// A missing report yields [`StoreError::NotFound`].
    async fn replace_report(
        &self,
        report: &ClusterScanReport,
    ) -> StoreResult<ClusterScanReport>;

    async fn get_report(
        &self,
        name: &ReportName,
    ) -> StoreResult<ClusterScanReport>;
}

#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    async fn get_config_artifact(
        &self,
        namespace: &str,
        name: &str,
    ) -> StoreResult<ConfigArtifact>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, name: &str) -> StoreResult<ClusterScanProfile>;
}

/// Full store surface consumed by the reconciler.
pub trait ResourceStore:
    ScanRepository
    + RunObjectRepository
    + ReportRepository
    + ArtifactRepository
    + ProfileRepository
    + 'static
{
}

impl<T> ResourceStore for T where
    T: ScanRepository
        + RunObjectRepository
        + ReportRepository
        + ArtifactRepository
        + ProfileRepository
        + 'static
{
}

/// Races a store call against `cancel`, surfacing cancellation as
/// [`StoreError::Cancelled`] so the caller's event is redelivered.
pub async fn cancellable<T, F>(
    cancel: &CancellationToken,
    operation: &'static str,
    fut: F,
) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled { operation }),
        result = fut => result,
    }
}
