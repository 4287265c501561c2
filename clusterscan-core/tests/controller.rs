mod support;

use std::{sync::Arc, time::Duration};

use clusterscan_core::{
    InMemoryStore, RuntimeError, ScanRunController, ScanRunControllerBuilder,
    store::{StoreError, StoreOperation},
};
use clusterscan_model::prelude::{
    ClusterScanProfile, ConditionStatus, ReportName, ScanConditionType, ScanRun,
};

use support::{
    BENCHMARK, PROFILE, SCENARIO_OUTPUT, config, eventually, init_tracing,
    output_artifact, owned_run, run_completed, run_key, scan_name,
};

async fn seeded_store(capacity: usize) -> Arc<InMemoryStore> {
    init_tracing();
    let store = Arc::new(InMemoryStore::new(capacity));
    store
        .put_profile(ClusterScanProfile::new(PROFILE, BENCHMARK))
        .await;
    store
}

#[tokio::test]
async fn completed_run_is_reported_and_retired_end_to_end() {
    let store = seeded_store(64).await;
    store.apply_scan(run_completed("daily", false)).await;
    store
        .put_config_artifact(output_artifact("daily", SCENARIO_OUTPUT))
        .await;

    let controller = ScanRunController::new(config(), Arc::clone(&store));
    controller.start().await.expect("controller starts");
    store.apply_run_object(owned_run("daily")).await;

    eventually("run-object retirement", || {
        let store = Arc::clone(&store);
        async move { store.run_object(&run_key("daily")).await.is_none() }
    })
    .await;

    let scan = store.scan(&scan_name("daily")).await.expect("scan present");
    assert!(scan.status.conditions.is_true(ScanConditionType::Complete));
    assert_eq!(
        scan.status.conditions.status(ScanConditionType::Alerted),
        ConditionStatus::Unknown
    );
    assert_eq!(scan.status.observed_generation, scan.generation);
    assert_eq!(scan.status.summary.map(|summary| summary.pass), Some(8));

    let reports = store.reports().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].name, ReportName::for_scan(&scan_name("daily")));

    controller.shutdown().await;
}

#[tokio::test]
async fn run_objects_present_at_start_are_reconciled() {
    let store = seeded_store(64).await;
    store.apply_scan(run_completed("weekly", true)).await;
    store.apply_run_object(owned_run("weekly")).await;

    let controller = ScanRunController::new(config(), Arc::clone(&store));
    controller.start().await.expect("controller starts");

    eventually("initial sync retirement", || {
        let store = Arc::clone(&store);
        async move { store.run_object(&run_key("weekly")).await.is_none() }
    })
    .await;
    assert!(store.reports().await.is_empty());

    controller.shutdown().await;
}

#[tokio::test]
async fn foreign_run_objects_are_never_touched() {
    let store = seeded_store(64).await;
    store.apply_scan(run_completed("daily", true)).await;
    store.apply_scan(run_completed("other", true)).await;

    let controller = ScanRunController::new(config(), Arc::clone(&store));
    controller.start().await.expect("controller starts");

    let foreign = ScanRun::owned_by(run_key("other"), "another-operator", "other");
    store.apply_run_object(foreign).await;
    store.apply_run_object(owned_run("daily")).await;

    eventually("owned run retirement", || {
        let store = Arc::clone(&store);
        async move { store.run_object(&run_key("daily")).await.is_none() }
    })
    .await;

    assert!(store.run_object(&run_key("other")).await.is_some());
    let other = store.scan(&scan_name("other")).await.expect("scan present");
    assert!(!other.status.conditions.is_true(ScanConditionType::Complete));

    controller.shutdown().await;
}

#[tokio::test]
async fn transient_failures_are_retried_with_backoff() {
    let store = seeded_store(64).await;
    store.apply_scan(run_completed("daily", false)).await;
    store
        .put_config_artifact(output_artifact("daily", SCENARIO_OUTPUT))
        .await;
    for _ in 0..2 {
        store
            .fail_next(
                StoreOperation::GetConfigArtifact,
                StoreError::Backend {
                    operation: "get_config_artifact",
                    message: "connection refused".into(),
                },
            )
            .await;
    }

    let controller = ScanRunController::new(config(), Arc::clone(&store));
    controller.start().await.expect("controller starts");
    store.apply_run_object(owned_run("daily")).await;

    eventually("retired after retries", || {
        let store = Arc::clone(&store);
        async move { store.run_object(&run_key("daily")).await.is_none() }
    })
    .await;

    assert_eq!(store.calls(StoreOperation::GetConfigArtifact).await, 3);
    assert_eq!(store.reports().await.len(), 1);
    assert_eq!(controller.queue().failures(&run_key("daily")).await, 0);

    controller.shutdown().await;
}

#[tokio::test]
async fn missing_output_keeps_run_until_artifact_appears() {
    let store = seeded_store(64).await;
    store.apply_scan(run_completed("daily", false)).await;

    let controller = ScanRunController::new(config(), Arc::clone(&store));
    controller.start().await.expect("controller starts");
    store.apply_run_object(owned_run("daily")).await;

    eventually("repeated extraction attempts", || {
        let store = Arc::clone(&store);
        async move { store.calls(StoreOperation::GetConfigArtifact).await >= 2 }
    })
    .await;
    assert!(store.run_object(&run_key("daily")).await.is_some());
    let scan = store.scan(&scan_name("daily")).await.expect("scan present");
    assert!(!scan.status.conditions.is_true(ScanConditionType::Complete));

    store
        .put_config_artifact(output_artifact("daily", SCENARIO_OUTPUT))
        .await;
    eventually("retirement once output exists", || {
        let store = Arc::clone(&store);
        async move { store.run_object(&run_key("daily")).await.is_none() }
    })
    .await;
    assert_eq!(store.reports().await.len(), 1);

    controller.shutdown().await;
}

#[tokio::test]
async fn missing_profile_is_requeued_until_it_appears() {
    init_tracing();
    let store = Arc::new(InMemoryStore::new(64));
    store.apply_scan(run_completed("daily", false)).await;
    store
        .put_config_artifact(output_artifact("daily", SCENARIO_OUTPUT))
        .await;

    let controller = ScanRunController::new(config(), Arc::clone(&store));
    controller.start().await.expect("controller starts");
    store.apply_run_object(owned_run("daily")).await;

    eventually("repeated profile lookups", || {
        let store = Arc::clone(&store);
        async move { store.calls(StoreOperation::GetProfile).await >= 2 }
    })
    .await;
    assert!(store.run_object(&run_key("daily")).await.is_some());
    assert!(store.reports().await.is_empty());

    store
        .put_profile(ClusterScanProfile::new(PROFILE, BENCHMARK))
        .await;
    eventually("retirement once profile exists", || {
        let store = Arc::clone(&store);
        async move { store.run_object(&run_key("daily")).await.is_none() }
    })
    .await;
    assert_eq!(store.reports().await.len(), 1);

    controller.shutdown().await;
}

#[tokio::test]
async fn burst_beyond_channel_capacity_is_fully_reconciled() {
    let store = seeded_store(2).await;
    let names: Vec<String> = (0..8).map(|i| format!("scan-{i}")).collect();
    for name in &names {
        store.apply_scan(run_completed(name, true)).await;
    }

    let controller = ScanRunController::new(config(), Arc::clone(&store));
    controller.start().await.expect("controller starts");
    for name in &names {
        store.apply_run_object(owned_run(name)).await;
    }

    eventually("every run-object retired", || {
        let store = Arc::clone(&store);
        let names = names.clone();
        async move {
            for name in &names {
                if store.run_object(&run_key(name)).await.is_some() {
                    return false;
                }
            }
            true
        }
    })
    .await;

    controller.shutdown().await;
}

#[tokio::test]
async fn lifecycle_guards() {
    let store = seeded_store(64).await;
    let controller = ScanRunControllerBuilder::new(config())
        .with_store(Arc::clone(&store))
        .with_workers(1)
        .build()
        .expect("store provided");

    controller.start().await.expect("first start");
    assert!(matches!(
        controller.start().await,
        Err(RuntimeError::AlreadyStarted)
    ));

    tokio::time::timeout(Duration::from_secs(5), controller.shutdown())
        .await
        .expect("shutdown joins workers");
    assert!(controller.queue().is_shut_down());
    assert!(matches!(
        controller.start().await,
        Err(RuntimeError::ShutDown)
    ));

    let missing = ScanRunControllerBuilder::<InMemoryStore>::new(config()).build();
    assert!(matches!(missing, Err(RuntimeError::MissingDependency("store"))));
}

#[tokio::test]
async fn run_returns_after_signal() {
    let store = seeded_store(64).await;
    store.apply_scan(run_completed("daily", true)).await;
    store.apply_run_object(owned_run("daily")).await;
    let controller = ScanRunController::new(config(), Arc::clone(&store));

    let signal = {
        let store = Arc::clone(&store);
        async move {
            eventually("retirement before signal", || {
                let store = Arc::clone(&store);
                async move { store.run_object(&run_key("daily")).await.is_none() }
            })
            .await;
        }
    };

    tokio::time::timeout(Duration::from_secs(10), controller.run(signal))
        .await
        .expect("run finishes")
        .expect("run succeeds");
}
