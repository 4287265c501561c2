use uuid::Uuid;

use crate::{
    condition::{Conditions, ScanConditionType},
    ids::ScanName,
};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterScan {
    pub name: ScanName,
    #[cfg_attr(feature = "serde", serde(default = "Uuid::now_v7"))]
    pub uid: Uuid,
    /// Bumped by the store whenever the spec changes.
    #[cfg_attr(feature = "serde", serde(default))]
    pub generation: i64,
    /// Optimistic-concurrency token; assigned by the store on every write.
    #[cfg_attr(feature = "serde", serde(default))]
    pub resource_version: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spec: ClusterScanSpec,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: ClusterScanStatus,
}

impl ClusterScan {
    pub fn new(name: ScanName) -> Self {
        Self {
            name,
            uid: Uuid::now_v7(),
            generation: 1,
            resource_version: 0,
            spec: ClusterScanSpec::default(),
            status: ClusterScanStatus::default(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.spec.scan_profile_name = Some(profile.into());
        self
    }

    /// Where this scan sits in its run lifecycle, derived from conditions.
    pub fn phase(&self) -> ScanPhase {
        let conditions = &self.status.conditions;
        if conditions.is_true(ScanConditionType::Complete) {
            ScanPhase::Complete
        } else if conditions.is_true(ScanConditionType::RunCompleted) {
            ScanPhase::RunCompleted {
                failed: conditions.is_true(ScanConditionType::Failed),
            }
        } else {
            ScanPhase::Running
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterScanSpec {
    /// Profile to report against. Falls back to the controller's default
    /// profile when unset.
    #[cfg_attr(feature = "serde", serde(default))]
    pub scan_profile_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterScanStatus {
    #[cfg_attr(feature = "serde", serde(default))]
    pub conditions: Conditions,
    #[cfg_attr(feature = "serde", serde(default))]
    pub observed_generation: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub last_run_timestamp: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub summary: Option<ClusterScanSummary>,
}

/// Check counters for one scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ClusterScanSummary {
    pub total: u32,
    pub pass: u32,
    pub fail: u32,
    pub skip: u32,
    pub not_applicable: u32,
}

/// Exhaustive view over the condition combinations the reconciler acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Neither `RunCompleted` nor `Complete` is true.
    Running,
    /// The run finished and its outcome has not been recorded yet.
    RunCompleted { failed: bool },
    /// Results were recorded; any remaining run-object is stale.
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan() -> ClusterScan {
        ClusterScan::new(ScanName::new("daily").expect("valid name"))
    }

    #[test]
    fn phase_follows_conditions() {
        let mut scan = scan();
        assert_eq!(scan.phase(), ScanPhase::Running);

        scan.status
            .conditions
            .set_true(ScanConditionType::RunCompleted);
        assert_eq!(scan.phase(), ScanPhase::RunCompleted { failed: false });

        scan.status.conditions.set_true(ScanConditionType::Failed);
        assert_eq!(scan.phase(), ScanPhase::RunCompleted { failed: true });

        scan.status.conditions.set_true(ScanConditionType::Complete);
        assert_eq!(scan.phase(), ScanPhase::Complete);
    }

    #[test]
    fn complete_wins_even_without_run_completed() {
        let mut scan = scan();
        scan.status.conditions.set_true(ScanConditionType::Complete);
        assert_eq!(scan.phase(), ScanPhase::Complete);
    }
}
