//! Custom Resource Definitions for the cluster scan operator

mod app;
mod cluster;
mod scan;
mod types;

pub use app::{App, AppSpec, Project, ProjectSpec, TemplateVersion, TemplateVersionSpec};
pub use cluster::{
    ManagedCluster, ManagedClusterSpec, ManagedClusterStatus, CLUSTER_READY_CONDITION,
};
pub use scan::{ClusterScan, ClusterScanSpec, ClusterScanStatus};
pub use types::{find_condition, set_condition, Condition, ConditionStatus};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

/// All CRDs served by this operator, in install order
pub fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![
        ManagedCluster::crd(),
        Project::crd(),
        TemplateVersion::crd(),
        App::crd(),
        ClusterScan::crd(),
    ]
}
