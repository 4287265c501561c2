use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Controller identity stamped on run-objects this instance owns.
pub const DEFAULT_CONTROLLER_NAME: &str = "clusterscan-operator";
pub const DEFAULT_OUTPUT_NAMESPACE: &str = "cis-operator-system";
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "output.json";

/// Reconciler and runtime settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Only run-objects whose controller label equals this value are
    /// reconciled. Two controllers sharing a name will fight over objects.
    pub controller_name: String,
    /// Parallel reconcile workers. A single key is never processed by more
    /// than one worker at a time regardless of this value.
    pub workers: usize,
    /// Namespace holding scan output artifacts.
    pub output_namespace: String,
    /// Artifact entry carrying the raw report.
    pub output_file_name: String,
    /// Profile used when a scan does not name one.
    pub default_profile: Option<String>,
    /// Capacity of the run-object event channel. A lagging watcher triggers
    /// a full resync.
    pub event_channel_capacity: usize,
    /// How long `shutdown` waits for each worker before giving up (ms).
    pub shutdown_timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
            workers: 4,
            output_namespace: DEFAULT_OUTPUT_NAMESPACE.to_string(),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            default_profile: None,
            event_channel_capacity: 1024,
            shutdown_timeout_ms: 30_000,
            retry: RetryConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_controller_name(mut self, name: impl Into<String>) -> Self {
        self.controller_name = name.into();
        self
    }

    pub fn with_default_profile(mut self, profile: impl Into<String>) -> Self {
        self.default_profile = Some(profile.into());
        self
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Requeue backoff for failed reconciles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Percentage-based jitter to spread out retries.
    pub jitter_ratio: f32,
    /// Minimum jitter in milliseconds so short delays still spread a bit.
    pub jitter_min_ms: u64,
}

impl RetryConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 500,
            backoff_max_ms: 5 * 60 * 1_000,
            jitter_ratio: 0.25,
            jitter_min_ms: 50,
        }
    }
}
