use chrono::{DateTime, Utc};

use crate::ids::ReportName;

/// Immutable record of one completed scan run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterScanReport {
    pub name: ReportName,
    pub spec: ReportSpec,
    /// Assigned by the store on creation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub resource_version: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReportSpec {
    pub benchmark_version: String,
    /// RFC 3339 wall-clock time the report was assembled.
    pub last_run_timestamp: String,
    /// Normalized report body, serialized as JSON.
    pub report_json: String,
}
