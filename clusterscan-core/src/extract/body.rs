//! Report body written by the scan workload.
//!
//! Only the counters are required. Check groups and per-check details are
//! carried through when present; unknown per-check fields are preserved so
//! normalization never drops data the benchmark tooling added.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use clusterscan_model::ClusterScanSummary;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReportBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub pass: u32,
    #[serde(default)]
    pub fail: u32,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub warn: u32,
    #[serde(default)]
    pub not_applicable: u32,
    /// Node names by node type.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nodes: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<CheckGroup>,
}

impl ScanReportBody {
    pub fn summary(&self) -> ClusterScanSummary {
        ClusterScanSummary {
            total: self.total,
            pass: self.pass,
            fail: self.fail,
            skip: self.skip,
            not_applicable: self.not_applicable,
        }
    }

    pub fn checks(&self) -> impl Iterator<Item = &Check> {
        self.results.iter().flat_map(|group| group.checks.iter())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub checks: Vec<Check>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Check {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<CheckState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default)]
    pub scored: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckState {
    Pass,
    Fail,
    Skip,
    Warn,
    NotApplicable,
    /// Outcome differs across nodes.
    Mixed,
    /// A state this controller does not model, kept verbatim.
    Other(String),
}

impl CheckState {
    pub fn as_str(&self) -> &str {
        match self {
            CheckState::Pass => "pass",
            CheckState::Fail => "fail",
            CheckState::Skip => "skip",
            CheckState::Warn => "warn",
            CheckState::NotApplicable => "notApplicable",
            CheckState::Mixed => "mixed",
            CheckState::Other(raw) => raw,
        }
    }
}

impl From<String> for CheckState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pass" => CheckState::Pass,
            "fail" => CheckState::Fail,
            "skip" => CheckState::Skip,
            "warn" => CheckState::Warn,
            "notApplicable" => CheckState::NotApplicable,
            "mixed" => CheckState::Mixed,
            _ => CheckState::Other(raw),
        }
    }
}

impl From<CheckState> for String {
    fn from(state: CheckState) -> Self {
        match state {
            CheckState::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}
