use std::{fmt, str::FromStr};

use crate::{
    error::{ModelError, Result},
    naming::safe_concat_name,
};

/// Prefix shared by every report name.
pub const REPORT_NAME_PREFIX: &str = "clusterscan-report";

/// Longest object name the store accepts (DNS-1123 subdomain).
pub const MAX_OBJECT_NAME_LEN: usize = 253;

/// Checks a store object name: lowercase alphanumerics, `-` and `.`,
/// starting and ending with an alphanumeric.
pub fn is_valid_object_name(value: &str) -> bool {
    let bytes = value.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    let edge_ok = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    value.len() <= MAX_OBJECT_NAME_LEN
        && edge_ok(first)
        && edge_ok(last)
        && bytes
            .iter()
            .all(|b| edge_ok(b) || *b == b'-' || *b == b'.')
}

fn validated(kind: &'static str, value: String) -> Result<String> {
    if is_valid_object_name(&value) {
        Ok(value)
    } else {
        Err(ModelError::InvalidName { kind, value })
    }
}

/// Name of a `ClusterScan` resource. Scans are cluster scoped, so the name
/// alone identifies one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct ScanName(String);

impl ScanName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        validated("scan", name.into()).map(ScanName)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ScanName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        ScanName::new(value)
    }
}

impl From<ScanName> for String {
    fn from(value: ScanName) -> Self {
        value.0
    }
}

impl AsRef<str> for ScanName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a `ClusterScanReport`. Reports created by the controller take
/// their name from the scan they report on via [`ReportName::for_scan`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct ReportName(String);

impl ReportName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        validated("report", name.into()).map(ReportName)
    }

    /// Deterministic report name for a scan, so every assembly attempt for
    /// the same scan targets the same record.
    pub fn for_scan(scan: &ScanName) -> Self {
        ReportName(safe_concat_name(&[REPORT_NAME_PREFIX, scan.as_str()]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReportName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        ReportName::new(value)
    }
}

impl From<ReportName> for String {
    fn from(value: ReportName) -> Self {
        value.0
    }
}

impl fmt::Display for ReportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Namespaced identity of a run-object, rendered as `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunObjectKey {
    pub namespace: String,
    pub name: String,
}

impl RunObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RunObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for RunObjectKey {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.split_once('/') {
            Some((namespace, name))
                if !namespace.is_empty()
                    && !name.is_empty()
                    && !name.contains('/') =>
            {
                Ok(RunObjectKey::new(namespace, name))
            }
            _ => Err(ModelError::InvalidKey(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_names_follow_object_name_rules() {
        assert!(ScanName::new("daily").is_ok());
        assert!(ScanName::new("rke-cis-1.6.hardened").is_ok());
        assert!(ScanName::new("").is_err());
        assert!(ScanName::new("Daily").is_err());
        assert!(ScanName::new("-daily").is_err());
        assert!(ScanName::new("daily-").is_err());
        assert!(ScanName::new("x".repeat(MAX_OBJECT_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn report_names_derive_from_scan_names() {
        let scan = ScanName::new("daily").expect("valid name");
        let name = ReportName::for_scan(&scan);
        assert_eq!(name.as_str(), "clusterscan-report-daily");
        assert_eq!(name, ReportName::for_scan(&scan));
        assert!(ReportName::new(name.as_str()).is_ok());

        let long = ScanName::new("x".repeat(120)).expect("valid name");
        assert!(ReportName::new(ReportName::for_scan(&long).as_str()).is_ok());
    }

    #[test]
    fn run_object_key_parses_namespace_and_name() {
        let key: RunObjectKey =
            "cis-operator-system/security-scan-runner-daily"
                .parse()
                .expect("valid key");
        assert_eq!(key.namespace, "cis-operator-system");
        assert_eq!(key.name, "security-scan-runner-daily");
        assert_eq!(
            key.to_string(),
            "cis-operator-system/security-scan-runner-daily"
        );

        assert!("no-namespace".parse::<RunObjectKey>().is_err());
        assert!("/name".parse::<RunObjectKey>().is_err());
        assert!("a/b/c".parse::<RunObjectKey>().is_err());
    }
}
