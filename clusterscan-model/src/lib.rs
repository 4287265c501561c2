//! Resource models shared across clusterscan crates.
//!
//! The types here mirror the objects the controller reads from and writes to
//! the resource store: the durable [`ClusterScan`], the transient
//! [`ScanRun`] produced for each execution, the immutable
//! [`ClusterScanReport`], plus the profile and output artifact records the
//! report assembly step consumes.
#![allow(missing_docs)]

pub mod artifact;
pub mod condition;
pub mod error;
pub mod ids;
pub mod labels;
pub mod naming;
pub mod prelude;
pub mod profile;
pub mod report;
pub mod run;
pub mod scan;

pub use artifact::ConfigArtifact;
pub use condition::{
    Condition, ConditionStatus, Conditions, ScanConditionType,
};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{ReportName, RunObjectKey, ScanName};
pub use profile::ClusterScanProfile;
pub use report::{ClusterScanReport, ReportSpec};
pub use run::{DeletePropagation, ScanRun};
pub use scan::{
    ClusterScan, ClusterScanSpec, ClusterScanStatus, ClusterScanSummary,
    ScanPhase,
};
