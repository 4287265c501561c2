use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    ids::RunObjectKey,
    labels::{LABEL_CLUSTER_SCAN, LABEL_CONTROLLER},
};

/// Transient record of one scan execution, created and driven by the run
/// scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanRun {
    pub key: RunObjectKey,
    #[cfg_attr(feature = "serde", serde(default = "Uuid::now_v7"))]
    pub uid: Uuid,
    #[cfg_attr(feature = "serde", serde(default))]
    pub labels: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub resource_version: u64,
}

impl ScanRun {
    pub fn new(key: RunObjectKey) -> Self {
        Self {
            key,
            uid: Uuid::now_v7(),
            labels: BTreeMap::new(),
            deletion_timestamp: None,
            resource_version: 0,
        }
    }

    pub fn with_label(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Run-object stamped with both ownership labels.
    pub fn owned_by(
        key: RunObjectKey,
        controller: impl Into<String>,
        scan: impl Into<String>,
    ) -> Self {
        Self::new(key)
            .with_label(LABEL_CONTROLLER, controller)
            .with_label(LABEL_CLUSTER_SCAN, scan)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn controller(&self) -> Option<&str> {
        self.label(LABEL_CONTROLLER)
    }

    pub fn scan_label(&self) -> Option<&str> {
        self.label(LABEL_CLUSTER_SCAN)
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}

/// How dependents of a deleted object are cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeletePropagation {
    /// Delete the object now; dependents are collected asynchronously.
    #[default]
    Background,
    /// Delete dependents first, then the object.
    Foreground,
    /// Leave dependents in place.
    Orphan,
}
