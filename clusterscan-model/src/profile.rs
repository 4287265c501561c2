/// Benchmark profile a scan is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterScanProfile {
    pub name: String,
    pub benchmark_version: String,
}

impl ClusterScanProfile {
    pub fn new(
        name: impl Into<String>,
        benchmark_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            benchmark_version: benchmark_version.into(),
        }
    }
}
