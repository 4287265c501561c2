use clusterscan_model::ReportName;

use crate::retire::Retirement;

/// Why an event was dropped without touching any resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The run-object was deleted.
    Absent,
    /// Deletion is already in progress.
    Deleting,
    /// Another controller owns the run-object.
    NotOwned,
}

/// Why a run-object was deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetireReason {
    /// Owning-scan label is missing or unusable.
    MalformedResource,
    /// The owning scan no longer exists.
    ParentGone,
    /// The owning scan already recorded this run's results.
    Stale,
}

impl RetireReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetireReason::MalformedResource => "malformed_resource",
            RetireReason::ParentGone => "parent_gone",
            RetireReason::Stale => "stale",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Skipped(SkipReason),
    Retired {
        reason: RetireReason,
        retirement: Retirement,
    },
    /// `Complete` was set and the key requeued for retirement. `report` is
    /// `None` for failed runs.
    MarkedComplete { report: Option<ReportName> },
    /// The run is still in progress.
    Running,
}
