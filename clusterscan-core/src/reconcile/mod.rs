//! Run-object reconciliation.
//!
//! [`ScanRunReconciler::reconcile`] is invoked once per observed run-object
//! change. It decides ownership, loads the owning scan and advances the
//! scan's conditions:
//!
//! * `Complete`: acknowledge (reset `Alerted`, record the observed
//!   generation) and retire the run-object.
//! * `RunCompleted`: record results unless the run failed, set `Complete`
//!   and requeue the key so the next pass retires the run-object.
//! * otherwise the run is still executing and nothing happens.
//!
//! Every step is safe to repeat. Report creation is keyed by the scan name
//! and treats "already exists" as success; retirement treats "not found" as
//! success.

mod outcome;

pub use outcome::{ReconcileOutcome, RetireReason, SkipReason};

use std::{any::type_name, fmt, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use clusterscan_model::prelude::{
    ClusterScan, RunObjectKey, ScanConditionType, ScanName, ScanPhase, ScanRun,
};

use crate::{
    assemble::ReportAssembler,
    config::ControllerConfig,
    error::{ReconcileError, Result},
    extract::ResultExtractor,
    retire::retire_run,
    store::{ResourceStore, cancellable},
};

/// Synthetic redelivery of a run-object key.
#[async_trait]
pub trait RunRequeue: Send + Sync {
    async fn requeue(&self, key: RunObjectKey);
}

pub struct ScanRunReconciler<S>
where
    S: ResourceStore + ?Sized,
{
    controller_name: String,
    store: Arc<S>,
    requeue: Arc<dyn RunRequeue>,
    extractor: ResultExtractor,
    assembler: ReportAssembler,
}

impl<S> fmt::Debug for ScanRunReconciler<S>
where
    S: ResourceStore + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRunReconciler")
            .field("controller_name", &self.controller_name)
            .field("store_type", &type_name::<S>())
            .field("extractor", &self.extractor)
            .field("assembler", &self.assembler)
            .finish()
    }
}

impl<S> ScanRunReconciler<S>
where
    S: ResourceStore + ?Sized,
{
    pub fn new(
        config: &ControllerConfig,
        store: Arc<S>,
        requeue: Arc<dyn RunRequeue>,
    ) -> Self {
        Self {
            controller_name: config.controller_name.clone(),
            store,
            requeue,
            extractor: ResultExtractor::from_config(config),
            assembler: ReportAssembler::from_config(config),
        }
    }

    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// True when `run` carries this controller's identity label.
    pub fn owns(&self, run: &ScanRun) -> bool {
        run.controller() == Some(self.controller_name.as_str())
    }

    /// Reconciles one observed change. `run` is the current run-object, or
    /// `None` when it was deleted.
    pub async fn reconcile(
        &self,
        key: &RunObjectKey,
        run: Option<&ScanRun>,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let span = info_span!(
            target: "clusterscan::reconcile",
            "reconcile",
            run = %key,
            reconcile_id = %Uuid::now_v7()
        );
        self.reconcile_inner(key, run, cancel).instrument(span).await
    }

    async fn reconcile_inner(
        &self,
        key: &RunObjectKey,
        run: Option<&ScanRun>,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let Some(run) = run else {
            return Ok(ReconcileOutcome::Skipped(SkipReason::Absent));
        };
        if run.is_deleting() {
            return Ok(ReconcileOutcome::Skipped(SkipReason::Deleting));
        }
        if !self.owns(run) {
            return Ok(ReconcileOutcome::Skipped(SkipReason::NotOwned));
        }

        let scan_name = match run.scan_label().map(ScanName::new) {
            Some(Ok(name)) => name,
            Some(Err(err)) => {
                warn!(
                    target: "clusterscan::reconcile",
                    error = %err,
                    "run-object has an invalid clusterscan label, retiring"
                );
                return self
                    .retire(key, RetireReason::MalformedResource, cancel)
                    .await;
            }
            None => {
                warn!(
                    target: "clusterscan::reconcile",
                    "run-object has no clusterscan label, retiring"
                );
                return self
                    .retire(key, RetireReason::MalformedResource, cancel)
                    .await;
            }
        };

        let scan = match cancellable(
            cancel,
            "get_scan",
            self.store.get_scan(&scan_name),
        )
        .await
        {
            Ok(scan) => scan,
            Err(err) if err.is_not_found() => {
                info!(
                    target: "clusterscan::reconcile",
                    scan = %scan_name,
                    "owning scan is gone, retiring run-object"
                );
                return self.retire(key, RetireReason::ParentGone, cancel).await;
            }
            Err(source) => {
                return Err(ReconcileError::ScanLookup {
                    scan: scan_name,
                    run: key.clone(),
                    source,
                });
            }
        };

        match scan.phase() {
            ScanPhase::Complete => self.acknowledge_complete(key, scan, cancel).await,
            ScanPhase::RunCompleted { failed } => {
                self.record_completion(key, scan, failed, cancel).await
            }
            ScanPhase::Running => {
                debug!(
                    target: "clusterscan::reconcile",
                    scan = %scan.name,
                    "scan run still in progress"
                );
                Ok(ReconcileOutcome::Running)
            }
        }
    }

    async fn acknowledge_complete(
        &self,
        key: &RunObjectKey,
        mut scan: ClusterScan,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        // Complete stays True; only Alerted is reset for the next cycle.
        scan.status
            .conditions
            .set_unknown(ScanConditionType::Alerted);
        scan.status.observed_generation = scan.generation;
        self.update_status(&scan, cancel).await?;

        info!(
            target: "clusterscan::reconcile",
            scan = %scan.name,
            generation = scan.generation,
            "scan complete, retiring run-object"
        );
        self.retire(key, RetireReason::Stale, cancel).await
    }

    async fn record_completion(
        &self,
        key: &RunObjectKey,
        scan: ClusterScan,
        failed: bool,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let mut working = scan.clone();
        let mut report_name = None;

        if failed {
            info!(
                target: "clusterscan::reconcile",
                scan = %scan.name,
                "scan run failed, marking complete without a report"
            );
        } else {
            let results = self
                .extractor
                .extract(&*self.store, &scan, cancel)
                .await
                .map_err(|source| ReconcileError::Extract {
                    scan: scan.name.clone(),
                    source,
                })?;
            let profile = self
                .assembler
                .resolve_profile(&*self.store, &scan, cancel)
                .await?;
            let report =
                self.assembler.assemble(&scan, &results, &profile, Utc::now());

            let created = cancellable(
                cancel,
                "create_report",
                self.store.create_report(&report),
            )
            .await;
            let stored = match created {
                Ok(stored) => {
                    info!(
                        target: "clusterscan::reconcile",
                        scan = %scan.name,
                        report = %report.name,
                        benchmark = %report.spec.benchmark_version,
                        pass = results.summary.pass,
                        fail = results.summary.fail,
                        "report created"
                    );
                    stored
                }
                // Same name every cycle; the latest run wins.
                Err(err) if err.is_already_exists() => {
                    let replaced = cancellable(
                        cancel,
                        "replace_report",
                        self.store.replace_report(&report),
                    )
                    .await
                    .map_err(|source| ReconcileError::ReportWrite {
                        scan: scan.name.clone(),
                        report: report.name.clone(),
                        source,
                    })?;
                    info!(
                        target: "clusterscan::reconcile",
                        scan = %scan.name,
                        report = %report.name,
                        pass = results.summary.pass,
                        fail = results.summary.fail,
                        "report replaced"
                    );
                    replaced
                }
                Err(source) => {
                    return Err(ReconcileError::ReportWrite {
                        scan: scan.name.clone(),
                        report: report.name,
                        source,
                    });
                }
            };

            working.status.summary = Some(results.summary);
            working.status.last_run_timestamp =
                Some(stored.spec.last_run_timestamp.clone());
            report_name = Some(stored.name);
        }

        working
            .status
            .conditions
            .set_true(ScanConditionType::Complete);
        self.update_status(&working, cancel).await?;
        self.requeue.requeue(key.clone()).await;

        Ok(ReconcileOutcome::MarkedComplete {
            report: report_name,
        })
    }

    async fn update_status(
        &self,
        scan: &ClusterScan,
        cancel: &CancellationToken,
    ) -> Result<ClusterScan> {
        cancellable(
            cancel,
            "update_scan_status",
            self.store.update_scan_status(scan),
        )
        .await
        .map_err(|source| ReconcileError::StatusUpdate {
            scan: scan.name.clone(),
            source,
        })
    }

    async fn retire(
        &self,
        key: &RunObjectKey,
        reason: RetireReason,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let retirement = retire_run(&*self.store, key, cancel)
            .await
            .map_err(|source| ReconcileError::Retire {
                run: key.clone(),
                source,
            })?;
        debug!(
            target: "clusterscan::reconcile",
            reason = reason.as_str(),
            retirement = ?retirement,
            "run-object retired"
        );
        Ok(ReconcileOutcome::Retired { reason, retirement })
    }
}
