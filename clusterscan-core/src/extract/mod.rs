//! Result extraction: turns the raw scan output artifact into a summary and
//! a normalized report body.

pub mod body;

pub use body::{Check, CheckGroup, CheckState, ScanReportBody};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use clusterscan_model::prelude::{ClusterScan, ClusterScanSummary, ScanName};

use crate::{
    config::ControllerConfig,
    store::{ArtifactRepository, StoreError, cancellable},
};

/// Prefix of the artifact the run scheduler writes scan output into.
pub const OUTPUT_ARTIFACT_PREFIX: &str = "cisscan-output-for";

pub fn output_artifact_name(scan: &ScanName) -> String {
    format!("{OUTPUT_ARTIFACT_PREFIX}-{scan}")
}

#[derive(Error, Debug)]
pub enum ReportParseError {
    #[error("report output is empty")]
    Empty,

    #[error("report output is not valid report json: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("output artifact {artifact} not found")]
    ArtifactMissing { artifact: String },

    #[error("output artifact {artifact} has no {entry} entry")]
    EntryMissing { artifact: String, entry: String },

    #[error("output artifact {artifact}: {source}")]
    Parse {
        artifact: String,
        #[source]
        source: ReportParseError,
    },

    #[error("fetching output artifact {artifact}: {source}")]
    Store {
        artifact: String,
        #[source]
        source: StoreError,
    },
}

impl ExtractError {
    /// True when the output itself is missing or unusable, as opposed to the
    /// store failing to answer.
    pub fn is_parse(&self) -> bool {
        !matches!(self, ExtractError::Store { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExtractError::Store { source, .. } if source.is_cancelled())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedResults {
    pub summary: ClusterScanSummary,
    pub body: ScanReportBody,
    /// `body` re-serialized in canonical form.
    pub report_json: String,
}

/// Parses raw scan output. Blank input and a JSON `null` both count as
/// empty: a run that produced nothing is not a run with zero findings.
pub fn parse_report(raw: &[u8]) -> Result<ExtractedResults, ReportParseError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(ReportParseError::Empty);
    }

    let body: Option<ScanReportBody> = serde_json::from_slice(raw)?;
    let body = body.ok_or(ReportParseError::Empty)?;
    let report_json = serde_json::to_string(&body)?;

    Ok(ExtractedResults {
        summary: body.summary(),
        body,
        report_json,
    })
}

/// Locates a scan's output artifact and parses it.
#[derive(Clone, Debug)]
pub struct ResultExtractor {
    namespace: String,
    file_name: String,
}

impl ResultExtractor {
    pub fn new(namespace: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            file_name: file_name.into(),
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(&config.output_namespace, &config.output_file_name)
    }

    pub async fn extract<S>(
        &self,
        store: &S,
        scan: &ClusterScan,
        cancel: &CancellationToken,
    ) -> Result<ExtractedResults, ExtractError>
    where
        S: ArtifactRepository + ?Sized,
    {
        let name = output_artifact_name(&scan.name);
        let artifact = format!("{}/{}", self.namespace, name);

        let config_artifact = cancellable(
            cancel,
            "get_config_artifact",
            store.get_config_artifact(&self.namespace, &name),
        )
        .await
        .map_err(|source| {
            if source.is_not_found() {
                ExtractError::ArtifactMissing {
                    artifact: artifact.clone(),
                }
            } else {
                ExtractError::Store {
                    artifact: artifact.clone(),
                    source,
                }
            }
        })?;

        let raw = config_artifact.entry(&self.file_name).ok_or_else(|| {
            ExtractError::EntryMissing {
                artifact: artifact.clone(),
                entry: self.file_name.clone(),
            }
        })?;

        let results = parse_report(raw.as_bytes())
            .map_err(|source| ExtractError::Parse { artifact, source })?;

        debug!(
            target: "clusterscan::extract",
            scan = %scan.name,
            total = results.summary.total,
            fail = results.summary.fail,
            "parsed scan output"
        );
        Ok(results)
    }
}
