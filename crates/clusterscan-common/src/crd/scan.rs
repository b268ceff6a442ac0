//! ClusterScan CRD
//!
//! A `ClusterScan` requests one security scan against a managed cluster.
//! Users create it; the scan controller owns its status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::Condition;

/// ClusterScan requests a security scan of a single managed cluster.
///
/// The scan runner is deployed once `Created` becomes true and torn down
/// when the runner reports `Completed=False` or the ClusterScan is deleted.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "clusterscan.dev",
    version = "v1alpha1",
    kind = "ClusterScan",
    plural = "clusterscans",
    shortname = "cscan",
    status = "ClusterScanStatus",
    printcolumn = r#"{"name":"Cluster","type":"string","jsonPath":".spec.clusterId"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterScanSpec {
    /// Name of the ManagedCluster to scan
    pub cluster_id: String,
}

/// Status of a ClusterScan
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterScanStatus {
    /// `Created` and `Completed` conditions (plus anything a runner adds)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ClusterScanSpec {
    /// Validate the spec
    pub fn validate(&self) -> Result<(), String> {
        if self.cluster_id.trim().is_empty() {
            return Err("spec.clusterId must not be empty".to_string());
        }
        Ok(())
    }
}
