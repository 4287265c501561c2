use std::{
    any::type_name,
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::{
    Mutex,
    broadcast::{Receiver, error::RecvError},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use clusterscan_model::RunObjectKey;

use crate::{
    config::ControllerConfig,
    error::ReconcileError,
    reconcile::{ReconcileOutcome, RunRequeue, ScanRunReconciler},
    store::{ResourceStore, RunObjectEvent, StoreError, cancellable},
};

use super::{RuntimeError, queue::WorkQueue};

/// Wires the run-object watch to the reconciler through a keyed work queue
/// and a pool of workers.
pub struct ScanRunController<S>
where
    S: ResourceStore + ?Sized,
{
    config: ControllerConfig,
    store: Arc<S>,
    queue: Arc<WorkQueue>,
    reconciler: Arc<ScanRunReconciler<S>>,
    shutdown_token: CancellationToken,
    started: AtomicBool,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<S> fmt::Debug for ScanRunController<S>
where
    S: ResourceStore + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let worker_handle_count = self
            .worker_handles
            .try_lock()
            .map(|handles| handles.len())
            .unwrap_or_default();

        f.debug_struct("ScanRunController")
            .field("config", &self.config)
            .field("store_type", &type_name::<S>())
            .field("queue", &self.queue)
            .field("started", &self.started.load(Ordering::Relaxed))
            .field("worker_handle_count", &worker_handle_count)
            .field("shutdown_cancelled", &self.shutdown_token.is_cancelled())
            .finish()
    }
}

impl<S> ScanRunController<S>
where
    S: ResourceStore + ?Sized,
{
    pub fn new(config: ControllerConfig, store: Arc<S>) -> Self {
        let queue = Arc::new(WorkQueue::new(config.retry));
        let requeue: Arc<dyn RunRequeue> = queue.clone();
        let reconciler = Arc::new(ScanRunReconciler::new(
            &config,
            Arc::clone(&store),
            requeue,
        ));

        Self {
            config,
            store,
            queue,
            reconciler,
            shutdown_token: CancellationToken::new(),
            started: AtomicBool::new(false),
            worker_handles: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn queue(&self) -> Arc<WorkQueue> {
        Arc::clone(&self.queue)
    }

    pub fn reconciler(&self) -> Arc<ScanRunReconciler<S>> {
        Arc::clone(&self.reconciler)
    }

    /// Starts the controller, waits for `signal`, then shuts down.
    pub async fn run<F>(&self, signal: F) -> Result<(), RuntimeError>
    where
        F: Future,
    {
        self.start().await?;
        signal.await;
        self.shutdown().await;
        Ok(())
    }

    /// Subscribes to run-object changes, enqueues every owned run-object
    /// already in the store, and spawns the router and worker tasks.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        if self.shutdown_token.is_cancelled() {
            return Err(RuntimeError::ShutDown);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyStarted);
        }

        // Subscribe before listing so nothing between the two is missed.
        let watch = self.store.watch_run_objects();
        let synced = match resync(
            &*self.store,
            &*self.reconciler,
            &self.queue,
            &self.shutdown_token,
        )
        .await
        {
            Ok(synced) => synced,
            Err(err) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(RuntimeError::InitialSync(err));
            }
        };

        info!(
            target: "clusterscan::runtime",
            controller = %self.config.controller_name,
            workers = self.config.workers.max(1),
            synced,
            "scan run controller started"
        );

        let router = self.spawn_event_router(watch);
        let mut handles = self.worker_handles.lock().await;
        handles.push(router);
        for worker_id in 0..self.config.workers.max(1) {
            handles.push(self.spawn_worker(worker_id));
        }

        Ok(())
    }

    fn spawn_event_router(
        &self,
        mut watch: Receiver<RunObjectEvent>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let reconciler = Arc::clone(&self.reconciler);
        let queue = Arc::clone(&self.queue);
        let shutdown = self.shutdown_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!(target: "clusterscan::runtime", "event router shutting down");
                        break;
                    }
                    event = watch.recv() => match event {
                        Ok(event) => {
                            if reconciler.owns(event.run()) {
                                queue.add(event.key().clone()).await;
                            }
                        }
                        Err(RecvError::Closed) => {
                            warn!(target: "clusterscan::runtime", "run-object watch closed");
                            break;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(
                                target: "clusterscan::runtime",
                                skipped,
                                "run-object watch lagged, resyncing"
                            );
                            if let Err(err) =
                                resync(&*store, &*reconciler, &queue, &shutdown).await
                            {
                                warn!(
                                    target: "clusterscan::runtime",
                                    error = %err,
                                    "resync after lag failed"
                                );
                            }
                        }
                    }
                }
            }
        })
    }

    fn spawn_worker(&self, worker_id: usize) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let reconciler = Arc::clone(&self.reconciler);
        let queue = Arc::clone(&self.queue);
        let shutdown = self.shutdown_token.clone();

        tokio::spawn(async move {
            while let Some(key) = queue.get().await {
                let cancel = shutdown.child_token();
                let result = match cancellable(
                    &cancel,
                    "get_run_object",
                    store.get_run_object(&key),
                )
                .await
                {
                    Ok(run) => reconciler.reconcile(&key, run.as_ref(), &cancel).await,
                    Err(source) => Err(ReconcileError::RunLookup {
                        run: key.clone(),
                        source,
                    }),
                };

                match result {
                    Ok(outcome) => {
                        log_outcome(worker_id, &key, &outcome);
                        queue.forget(&key).await;
                    }
                    Err(err) => {
                        let delay = queue.requeue_with_backoff(key.clone()).await;
                        warn!(
                            target: "clusterscan::runtime",
                            worker = worker_id,
                            run = %key,
                            kind = %err.kind(),
                            error = %err,
                            retry_in_ms = delay.as_millis() as u64,
                            "reconcile failed, requeued"
                        );
                    }
                }
                queue.done(&key).await;
            }
            debug!(target: "clusterscan::runtime", worker = worker_id, "worker shutting down");
        })
    }

    /// Cancels in-flight reconciles, stops the queue and joins every task.
    pub async fn shutdown(&self) {
        info!(target: "clusterscan::runtime", "shutting down scan run controller");

        self.shutdown_token.cancel();
        self.queue.shut_down().await;

        let handles = {
            let mut guard = self.worker_handles.lock().await;
            std::mem::take(&mut *guard)
        };

        let timeout = self.config.shutdown_timeout();
        for handle in handles {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(target: "clusterscan::runtime", "controller task failed: {e:?}"),
                Err(_) => warn!(target: "clusterscan::runtime", "controller task timed out during shutdown"),
            }
        }

        info!(target: "clusterscan::runtime", "scan run controller shutdown complete");
    }
}

async fn resync<S>(
    store: &S,
    reconciler: &ScanRunReconciler<S>,
    queue: &WorkQueue,
    cancel: &CancellationToken,
) -> Result<usize, StoreError>
where
    S: ResourceStore + ?Sized,
{
    let runs = cancellable(cancel, "list_run_objects", store.list_run_objects()).await?;
    let mut enqueued = 0;
    for run in runs.into_iter().filter(|run| reconciler.owns(run)) {
        queue.add(run.key).await;
        enqueued += 1;
    }
    Ok(enqueued)
}

fn log_outcome(
    worker_id: usize,
    key: &RunObjectKey,
    outcome: &ReconcileOutcome,
) {
    match outcome {
        ReconcileOutcome::Skipped(reason) => debug!(
            target: "clusterscan::runtime",
            worker = worker_id,
            run = %key,
            reason = ?reason,
            "run-object skipped"
        ),
        ReconcileOutcome::Running => debug!(
            target: "clusterscan::runtime",
            worker = worker_id,
            run = %key,
            "scan still running"
        ),
        ReconcileOutcome::Retired { reason, retirement } => info!(
            target: "clusterscan::runtime",
            worker = worker_id,
            run = %key,
            reason = reason.as_str(),
            retirement = ?retirement,
            "run-object retired"
        ),
        ReconcileOutcome::MarkedComplete { report } => info!(
            target: "clusterscan::runtime",
            worker = worker_id,
            run = %key,
            report = report.as_ref().map(|name| name.as_str()).unwrap_or("<none>"),
            "scan marked complete"
        ),
    }
}

/// Helper for constructing a controller with explicit dependencies.
pub struct ScanRunControllerBuilder<S>
where
    S: ResourceStore + ?Sized,
{
    config: ControllerConfig,
    store: Option<Arc<S>>,
}

impl<S> fmt::Debug for ScanRunControllerBuilder<S>
where
    S: ResourceStore + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ScanRunControllerBuilder");
        debug.field("config", &self.config);
        debug.field("store_set", &self.store.is_some());
        if self.store.is_some() {
            debug.field("store_type", &type_name::<S>());
        }
        debug.finish()
    }
}

impl<S> ScanRunControllerBuilder<S>
where
    S: ResourceStore + ?Sized,
{
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_controller_name(mut self, name: impl Into<String>) -> Self {
        self.config.controller_name = name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn build(self) -> Result<ScanRunController<S>, RuntimeError> {
        let store = self
            .store
            .ok_or(RuntimeError::MissingDependency("store"))?;
        Ok(ScanRunController::new(self.config, store))
    }
}
