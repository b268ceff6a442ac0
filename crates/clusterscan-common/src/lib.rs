//! Common types for the cluster scan operator: CRDs, conditions, errors

#![deny(missing_docs)]

pub mod conditions;
pub mod crd;
pub mod error;
pub mod retry;
pub mod telemetry;

pub use error::Error;

/// Annotation on a ManagedCluster naming the ClusterScan that currently
/// holds exclusive scan rights on it
pub const RUN_SCAN_OWNER_ANNOTATION: &str = "clusterscan.dev/run-scan-owner";

/// Annotation on an App recording the identity that installed it
pub const CREATOR_ID_ANNOTATION: &str = "clusterscan.dev/creator-id";

/// Annotation on a Namespace recording the `<cluster>:<project>` it belongs to
pub const PROJECT_ID_ANNOTATION: &str = "clusterscan.dev/project-id";

/// Label selecting a cluster's system project
pub const SYSTEM_PROJECT_LABEL: &str = "clusterscan.dev/system-project";

/// Finalizer that guarantees scan teardown runs before deletion completes
pub const SCAN_FINALIZER: &str = "clusterscan.dev/teardown";

/// Namespace the scan runner is installed into
pub const DEFAULT_SCAN_NAMESPACE: &str = "security-scan";

/// Namespace for operator-owned objects (service accounts, scan results)
pub const CLUSTERSCAN_SYSTEM_NAMESPACE: &str = "clusterscan-system";

/// Field manager name for server-side apply
pub const FIELD_MANAGER: &str = "clusterscan-controller";
