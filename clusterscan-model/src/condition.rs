//! Tri-state status conditions carried on a scan's status block.
//!
//! A condition that has never been written reads as
//! [`ConditionStatus::Unknown`], so "is this condition true" is always a
//! question with a definite answer.

use std::fmt;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanConditionType {
    /// The run scheduler finished executing the scan workload.
    RunCompleted,
    /// The run finished unsuccessfully; no report will be produced.
    Failed,
    /// Results have been recorded for the current run.
    Complete,
    /// Downstream alert evaluation state for the latest outcome.
    Alerted,
}

impl ScanConditionType {
    pub const ALL: [ScanConditionType; 4] = [
        ScanConditionType::RunCompleted,
        ScanConditionType::Failed,
        ScanConditionType::Complete,
        ScanConditionType::Alerted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanConditionType::RunCompleted => "RunCompleted",
            ScanConditionType::Failed => "Failed",
            ScanConditionType::Complete => "Complete",
            ScanConditionType::Alerted => "Alerted",
        }
    }
}

impl fmt::Display for ScanConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionStatus::True => f.write_str("True"),
            ConditionStatus::False => f.write_str("False"),
            ConditionStatus::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Condition {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: ScanConditionType,
    pub status: ConditionStatus,
    #[cfg_attr(feature = "serde", serde(default))]
    pub last_update_time: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reason: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub message: Option<String>,
}

/// Ordered set of conditions, at most one entry per condition type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ScanConditionType) -> Option<&Condition> {
        self.0.iter().find(|condition| condition.kind == kind)
    }

    pub fn status(&self, kind: ScanConditionType) -> ConditionStatus {
        self.get(kind)
            .map(|condition| condition.status)
            .unwrap_or_default()
    }

    pub fn is_true(&self, kind: ScanConditionType) -> bool {
        self.status(kind) == ConditionStatus::True
    }

    /// Sets the status of `kind`, appending the condition when absent.
    /// `last_update_time` only moves when the status actually changes.
    /// Returns whether anything changed.
    pub fn set(
        &mut self,
        kind: ScanConditionType,
        status: ConditionStatus,
    ) -> bool {
        let now = Utc::now();
        match self.0.iter_mut().find(|condition| condition.kind == kind) {
            Some(existing) if existing.status == status => false,
            Some(existing) => {
                existing.status = status;
                existing.last_update_time = Some(now);
                true
            }
            None => {
                self.0.push(Condition {
                    kind,
                    status,
                    last_update_time: Some(now),
                    reason: None,
                    message: None,
                });
                true
            }
        }
    }

    pub fn set_true(&mut self, kind: ScanConditionType) -> bool {
        self.set(kind, ConditionStatus::True)
    }

    pub fn set_false(&mut self, kind: ScanConditionType) -> bool {
        self.set(kind, ConditionStatus::False)
    }

    pub fn set_unknown(&mut self, kind: ScanConditionType) -> bool {
        self.set(kind, ConditionStatus::Unknown)
    }

    /// Attaches a reason/message to an existing condition. No-op when the
    /// condition has not been set yet.
    pub fn annotate(
        &mut self,
        kind: ScanConditionType,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        if let Some(existing) =
            self.0.iter_mut().find(|condition| condition.kind == kind)
        {
            existing.reason = Some(reason.into());
            existing.message = Some(message.into());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
