//! Label keys the controller stamps on, and reads from, run-objects.

/// API group the scan resources belong to.
pub const GROUP_NAME: &str = "clusterscan-operator.cattle.io";

/// Identity of the controller instance that owns a run-object.
pub const LABEL_CONTROLLER: &str = "clusterscan-operator.cattle.io/controller";

/// Name of the `ClusterScan` a run-object executes.
pub const LABEL_CLUSTER_SCAN: &str =
    "clusterscan-operator.cattle.io/clusterscan";
