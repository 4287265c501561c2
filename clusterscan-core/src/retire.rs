//! Run-object retirement.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use clusterscan_model::prelude::{DeletePropagation, RunObjectKey};

use crate::store::{RunObjectRepository, StoreResult, cancellable};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retirement {
    Deleted,
    /// Someone else removed the run-object first.
    AlreadyGone,
}

/// Deletes a run-object with background propagation. NotFound counts as
/// success so redelivered events converge.
pub async fn retire_run<S>(
    store: &S,
    key: &RunObjectKey,
    cancel: &CancellationToken,
) -> StoreResult<Retirement>
where
    S: RunObjectRepository + ?Sized,
{
    match cancellable(
        cancel,
        "delete_run_object",
        store.delete_run_object(key, DeletePropagation::Background),
    )
    .await
    {
        Ok(()) => {
            debug!(target: "clusterscan::reconcile", run = %key, "run-object deleted");
            Ok(Retirement::Deleted)
        }
        Err(err) if err.is_not_found() => {
            debug!(target: "clusterscan::reconcile", run = %key, "run-object already gone");
            Ok(Retirement::AlreadyGone)
        }
        Err(err) => Err(err),
    }
}
