//! Report assembly: binds extracted results to a scan and its profile.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use clusterscan_model::prelude::{
    ClusterScan, ClusterScanProfile, ClusterScanReport, ReportName, ReportSpec,
    ScanName,
};

use crate::{
    config::ControllerConfig,
    extract::ExtractedResults,
    store::{ProfileRepository, StoreError, cancellable},
};

#[derive(Error, Debug)]
pub enum ProfileResolutionError {
    #[error("scan {scan} names no profile and no default profile is configured")]
    Unset { scan: ScanName },

    #[error("profile {profile} for scan {scan} not found")]
    NotFound { scan: ScanName, profile: String },

    #[error("loading profile {profile} for scan {scan}: {source}")]
    Store {
        scan: ScanName,
        profile: String,
        #[source]
        source: StoreError,
    },
}

impl ProfileResolutionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProfileResolutionError::Store { source, .. } if source.is_cancelled())
    }
}

/// Formats a report timestamp as RFC 3339 with second precision.
pub fn report_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Clone, Debug, Default)]
pub struct ReportAssembler {
    default_profile: Option<String>,
}

impl ReportAssembler {
    pub fn new(default_profile: Option<String>) -> Self {
        Self { default_profile }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.default_profile.clone())
    }

    /// Profile name the scan is evaluated against: its own reference,
    /// otherwise the configured default.
    pub fn profile_name<'a>(&'a self, scan: &'a ClusterScan) -> Option<&'a str> {
        scan.spec
            .scan_profile_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.default_profile.as_deref())
    }

    pub async fn resolve_profile<S>(
        &self,
        store: &S,
        scan: &ClusterScan,
        cancel: &CancellationToken,
    ) -> Result<ClusterScanProfile, ProfileResolutionError>
    where
        S: ProfileRepository + ?Sized,
    {
        let profile = self.profile_name(scan).ok_or_else(|| {
            ProfileResolutionError::Unset {
                scan: scan.name.clone(),
            }
        })?;

        cancellable(cancel, "get_profile", store.get_profile(profile))
            .await
            .map_err(|source| {
                if source.is_not_found() {
                    ProfileResolutionError::NotFound {
                        scan: scan.name.clone(),
                        profile: profile.to_string(),
                    }
                } else {
                    ProfileResolutionError::Store {
                        scan: scan.name.clone(),
                        profile: profile.to_string(),
                        source,
                    }
                }
            })
    }

    /// Builds the report record. The name depends on the scan alone so a
    /// retried assembly targets the record an earlier attempt created.
    pub fn assemble(
        &self,
        scan: &ClusterScan,
        results: &ExtractedResults,
        profile: &ClusterScanProfile,
        now: DateTime<Utc>,
    ) -> ClusterScanReport {
        ClusterScanReport {
            name: ReportName::for_scan(&scan.name),
            spec: ReportSpec {
                benchmark_version: profile.benchmark_version.clone(),
                last_run_timestamp: report_timestamp(now),
                report_json: results.report_json.clone(),
            },
            resource_version: 0,
            created_at: None,
        }
    }
}
