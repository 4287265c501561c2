//! Shared fixtures for core integration tests.
#![allow(dead_code)]

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;

use clusterscan_core::{
    ControllerConfig, InMemoryStore, RunRequeue, ScanRunReconciler,
};
use clusterscan_model::prelude::{
    ClusterScan, ClusterScanProfile, ConfigArtifact, RunObjectKey,
    ScanConditionType, ScanName, ScanRun,
};

pub const CONTROLLER: &str = "clusterscan-operator";
pub const NAMESPACE: &str = "cis-operator-system";
pub const PROFILE: &str = "rke-profile-permissive";
pub const BENCHMARK: &str = "rke-cis-1.6-permissive";

pub const SCENARIO_OUTPUT: &str =
    r#"{"total":10,"pass":8,"fail":1,"skip":1,"notApplicable":0}"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn scan_name(name: &str) -> ScanName {
    ScanName::new(name).expect("valid scan name")
}

pub fn run_key(scan: &str) -> RunObjectKey {
    RunObjectKey::new(NAMESPACE, format!("security-scan-runner-{scan}"))
}

pub fn owned_run(scan: &str) -> ScanRun {
    ScanRun::owned_by(run_key(scan), CONTROLLER, scan)
}

pub fn output_artifact(scan: &str, body: &str) -> ConfigArtifact {
    ConfigArtifact::new(NAMESPACE, format!("cisscan-output-for-{scan}"))
        .with_entry("output.json", body)
}

/// A scan whose run finished, optionally with `Failed=True`.
pub fn run_completed(scan: &str, failed: bool) -> ClusterScan {
    let mut scan = ClusterScan::new(scan_name(scan)).with_profile(PROFILE);
    scan.status
        .conditions
        .set_true(ScanConditionType::RunCompleted);
    if failed {
        scan.status.conditions.set_true(ScanConditionType::Failed);
    }
    scan
}

pub fn config() -> ControllerConfig {
    let mut config = ControllerConfig::default().with_controller_name(CONTROLLER);
    config.workers = 2;
    config.retry.backoff_base_ms = 10;
    config.retry.backoff_max_ms = 200;
    config.retry.jitter_min_ms = 5;
    config.shutdown_timeout_ms = 2_000;
    config
}

/// Records every key the reconciler asks to redeliver.
#[derive(Debug, Default)]
pub struct RecordingRequeue {
    keys: Mutex<Vec<RunObjectKey>>,
}

impl RecordingRequeue {
    pub async fn keys(&self) -> Vec<RunObjectKey> {
        self.keys.lock().await.clone()
    }
}

#[async_trait]
impl RunRequeue for RecordingRequeue {
    async fn requeue(&self, key: RunObjectKey) {
        self.keys.lock().await.push(key);
    }
}

/// Reconciler wired to an in-memory store with the profile already loaded.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub requeue: Arc<RecordingRequeue>,
    pub reconciler: ScanRunReconciler<InMemoryStore>,
}

impl Harness {
    pub async fn new() -> Self {
        init_tracing();
        let store = Arc::new(InMemoryStore::default());
        store
            .put_profile(ClusterScanProfile::new(PROFILE, BENCHMARK))
            .await;
        let requeue = Arc::new(RecordingRequeue::default());
        let reconciler =
            ScanRunReconciler::new(&config(), Arc::clone(&store), requeue.clone());
        Self {
            store,
            requeue,
            reconciler,
        }
    }

    pub async fn scan(&self, name: &str) -> ClusterScan {
        self.store
            .scan(&scan_name(name))
            .await
            .expect("scan present")
    }
}

/// Polls `check` until it holds or five seconds pass.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for {what}");
}
