//! Collaborator interfaces consumed by the scan handler
//!
//! Each trait is a narrow seam over something the scan controller does not
//! own: the cluster registry, project/namespace provisioning, credentials,
//! the template catalog, app installation and the object stores. Production
//! implementations live in [`crate::kube_clients`]; tests use the generated
//! mocks or the in-memory fakes.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use clusterscan_common::crd::ClusterScan;
use clusterscan_common::Error;

use crate::deploy::{Workload, WorkloadDescriptor};
use crate::ownership::OwnershipRecord;

/// Snapshot of a managed cluster as seen by the scan controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterRecord {
    /// Cluster identifier
    pub id: String,
    /// Whether the cluster's Ready condition is true
    pub ready: bool,
    /// Current exclusive-scan claim, with the version it was read at
    pub ownership: OwnershipRecord,
}

impl ClusterRecord {
    /// Readiness predicate gating deployment
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Identity recorded as the creator of deployed workloads
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Fully-qualified identity name
    pub name: String,
}

/// Read-only lookup of managed clusters
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    /// Get a cluster by id; `NotFound` if it doesn't exist
    async fn get(&self, cluster_id: &str) -> Result<ClusterRecord, Error>;
}

/// Version-checked writes of a cluster's ownership claim
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Persist `cluster.ownership`.
    ///
    /// Fails with `Conflict` if the cluster changed since
    /// `cluster.ownership.version` was read.
    async fn update(&self, cluster: &ClusterRecord) -> Result<ClusterRecord, Error>;
}

/// Resolves the system-level deployment project of a cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProjectResolver: Send + Sync {
    /// Project id of the cluster's system project; `NotFound` if absent
    async fn system_project_id(&self, cluster_id: &str) -> Result<String, Error>;
}

/// Idempotently ensures a namespace exists under a project
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NamespaceEnsurer: Send + Sync {
    /// Ensure `namespace` exists and belongs to `project_id`.
    ///
    /// Returns the qualified project name (`<cluster>:<project>`).
    async fn ensure_project_namespace(
        &self,
        project_id: &str,
        cluster_id: &str,
        namespace: &str,
    ) -> Result<String, Error>;
}

/// Provides the system identity that deploys workloads on a cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolve (provisioning on first use) the system identity for a cluster
    async fn system_identity_for(&self, cluster_id: &str) -> Result<Identity, Error>;
}

/// Catalog of installable templates
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// `Ok` if the template exists, `NotFound` otherwise
    async fn exists(&self, template_id: &str) -> Result<(), Error>;
}

/// Installs and removes managed workloads
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AppDeployer: Send + Sync {
    /// Install a workload.
    ///
    /// With `fail_if_exists == false`, installing a workload that already
    /// exists under the same name returns the existing one.
    async fn install(
        &self,
        project_id: &str,
        workload: &WorkloadDescriptor,
        fail_if_exists: bool,
    ) -> Result<Workload, Error>;

    /// Remove a workload; `NotFound` if it isn't installed
    async fn uninstall(&self, project_id: &str, name: &str) -> Result<(), Error>;
}

/// Storage for per-scan artifacts written by the runner
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Delete the artifact keyed by the scan's name; `NotFound` if absent
    async fn delete(&self, scan_name: &str) -> Result<(), Error>;
}

/// Writes to ClusterScan objects
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Read the scan straight from the store, bypassing any cache.
    ///
    /// `None` if it no longer exists.
    async fn get(&self, name: &str) -> Result<Option<ClusterScan>, Error>;

    /// Persist the scan's status.
    ///
    /// Fails with `Conflict` if the scan changed since it was read.
    async fn update(&self, scan: &ClusterScan) -> Result<ClusterScan, Error>;

    /// Add the teardown finalizer (no-op if present)
    async fn add_finalizer(&self, scan: &ClusterScan) -> Result<(), Error>;

    /// Remove the teardown finalizer (no-op if absent)
    async fn remove_finalizer(&self, scan: &ClusterScan) -> Result<(), Error>;
}
