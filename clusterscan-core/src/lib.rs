//! Reconciliation core for the clusterscan controller.
//!
//! A scan resource records what should be scanned and what the last run
//! found; every execution is a transient run-object created by an external
//! scheduler. This crate watches those run-objects and, once a run finishes,
//! turns its raw output into a summary and a permanent report, marks the scan
//! complete and deletes the run-object.
//!
//! * [`store`]: ports onto the resource store plus an in-memory
//!   implementation.
//! * [`extract`] and [`assemble`]: output parsing and report construction.
//! * [`reconcile`]: the per-event state machine.
//! * [`runtime`]: work queue, backoff and worker pool around it.
#![allow(missing_docs)]

pub mod assemble;
pub mod config;
pub mod error;
pub mod extract;
pub mod reconcile;
pub mod retire;
pub mod runtime;
pub mod store;

pub use assemble::{ProfileResolutionError, ReportAssembler};
pub use config::{ControllerConfig, RetryConfig};
pub use error::{ErrorKind, ReconcileError, Result};
pub use extract::{
    ExtractError, ExtractedResults, ReportParseError, ResultExtractor,
    parse_report,
};
pub use reconcile::{
    ReconcileOutcome, RetireReason, RunRequeue, ScanRunReconciler, SkipReason,
};
pub use retire::{Retirement, retire_run};
pub use runtime::{
    RuntimeError, ScanRunController, ScanRunControllerBuilder, WorkQueue,
};
pub use store::{InMemoryStore, ResourceStore, StoreError, StoreResult};

pub use clusterscan_model as model;
