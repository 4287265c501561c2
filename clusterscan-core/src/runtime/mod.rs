//! Controller runtime: keyed work queue, requeue backoff and the worker pool
//! that drives [`ScanRunReconciler`](crate::reconcile::ScanRunReconciler).

pub mod backoff;
pub mod controller;
pub mod queue;

pub use backoff::Backoff;
pub use controller::{ScanRunController, ScanRunControllerBuilder};
pub use queue::WorkQueue;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("controller already started")]
    AlreadyStarted,

    #[error("controller has been shut down")]
    ShutDown,

    #[error("{0} dependency missing")]
    MissingDependency(&'static str),

    #[error("initial run-object sync failed: {0}")]
    InitialSync(#[source] StoreError),
}
