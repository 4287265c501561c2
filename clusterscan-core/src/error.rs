use std::fmt;

use thiserror::Error;

use clusterscan_model::prelude::{ReportName, RunObjectKey, ScanName};

use crate::{
    assemble::ProfileResolutionError,
    extract::ExtractError,
    store::StoreError,
};

/// Failure classes reported with each reconcile error. Every class is
/// retried with backoff; malformed run-objects and missing scans are
/// retirement outcomes, not errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TransientStore,
    Parse,
    ProfileResolution,
    /// Stale resource version; the next attempt reads a fresh copy.
    Conflict,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientStore => "transient_store",
            ErrorKind::Parse => "parse",
            ErrorKind::ProfileResolution => "profile_resolution",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn store_kind(err: &StoreError) -> ErrorKind {
    match err {
        StoreError::Conflict { .. } => ErrorKind::Conflict,
        StoreError::Cancelled { .. } => ErrorKind::Cancelled,
        _ => ErrorKind::TransientStore,
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("loading run-object {run}: {source}")]
    RunLookup {
        run: RunObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("loading scan {scan} for run-object {run}: {source}")]
    ScanLookup {
        scan: ScanName,
        run: RunObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("updating status of scan {scan}: {source}")]
    StatusUpdate {
        scan: ScanName,
        #[source]
        source: StoreError,
    },

    #[error("extracting results for scan {scan}: {source}")]
    Extract {
        scan: ScanName,
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    Profile(#[from] ProfileResolutionError),

    #[error("writing report {report} for scan {scan}: {source}")]
    ReportWrite {
        scan: ScanName,
        report: ReportName,
        #[source]
        source: StoreError,
    },

    #[error("retiring run-object {run}: {source}")]
    Retire {
        run: RunObjectKey,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::RunLookup { source, .. }
            | ReconcileError::ScanLookup { source, .. }
            | ReconcileError::StatusUpdate { source, .. }
            | ReconcileError::ReportWrite { source, .. }
            | ReconcileError::Retire { source, .. } => store_kind(source),
            ReconcileError::Extract { source, .. } => match source {
                ExtractError::Store { source, .. } => store_kind(source),
                _ => ErrorKind::Parse,
            },
            ReconcileError::Profile(err) => match err {
                ProfileResolutionError::Store { source, .. } => store_kind(source),
                _ => ErrorKind::ProfileResolution,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
