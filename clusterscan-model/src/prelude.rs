//! Snapshot of the model surface for controller code.
//! Prefer importing from this module instead of individual tree nodes.

pub use super::artifact::ConfigArtifact;
pub use super::condition::{
    Condition, ConditionStatus, Conditions, ScanConditionType,
};
pub use super::ids::{ReportName, RunObjectKey, ScanName};
pub use super::labels::{GROUP_NAME, LABEL_CLUSTER_SCAN, LABEL_CONTROLLER};
pub use super::profile::ClusterScanProfile;
pub use super::report::{ClusterScanReport, ReportSpec};
pub use super::run::{DeletePropagation, ScanRun};
pub use super::scan::{
    ClusterScan, ClusterScanSpec, ClusterScanStatus, ClusterScanSummary,
    ScanPhase,
};
