//! ClusterScan create / update / remove handling
//!
//! Every handler is a function of the observed ClusterScan plus whatever
//! the collaborators report right now. Nothing is cached between calls, so
//! a handler can be re-run after a crash or a redelivered event at any
//! point and converge on the same end state:
//!
//! - create: deploy the runner once, then mark `Created=True`
//! - update: once the runner reports `Completed=False`, remove it, release
//!   the cluster claim and mark `Completed=True`
//! - remove: delete the results artifact, remove the runner, release the
//!   cluster claim
//!
//! Status is written only after the corresponding side effects finished.
//! A failed step returns an error before the write, so the next pass
//! repeats the whole sequence.

use std::sync::Arc;

use kube::ResourceExt;
use tracing::{debug, info, warn};

use clusterscan_common::conditions::{CompletedState, ScanConditions};
use clusterscan_common::crd::ClusterScan;
use clusterscan_common::Error;

use crate::clients::{
    AppDeployer, ArtifactStore, Catalog, ClusterRegistry, ClusterStore, CredentialProvider,
    NamespaceEnsurer, ProjectResolver, ScanStore,
};
use crate::deploy::{deploy_workload, uninstall_workload};
use crate::ownership::release_ownership;
use crate::settings::ScanSettings;

/// The scan reconciler and its collaborators
///
/// Shared across all reconciliations; holds no per-scan state.
pub struct ScanHandler {
    /// Managed cluster lookup
    pub clusters: Arc<dyn ClusterRegistry>,
    /// Ownership claim writes
    pub cluster_store: Arc<dyn ClusterStore>,
    /// System project lookup
    pub projects: Arc<dyn ProjectResolver>,
    /// Runner namespace provisioning
    pub namespaces: Arc<dyn NamespaceEnsurer>,
    /// System identity lookup
    pub credentials: Arc<dyn CredentialProvider>,
    /// Template catalog
    pub catalog: Arc<dyn Catalog>,
    /// Runner install/uninstall
    pub apps: Arc<dyn AppDeployer>,
    /// Scan result artifacts
    pub artifacts: Arc<dyn ArtifactStore>,
    /// ClusterScan writes
    pub scans: Arc<dyn ScanStore>,
    /// Operator settings
    pub settings: Arc<dyn ScanSettings>,
}

fn cluster_id_of(scan: &ClusterScan) -> Result<&str, Error> {
    scan.spec
        .validate()
        .map_err(|msg| Error::validation_for(scan.name_any(), msg))?;
    Ok(scan.spec.cluster_id.as_str())
}

/// Copy of `scan` with `conditions` written into its status
fn with_conditions(scan: &ClusterScan, conditions: &ScanConditions) -> ClusterScan {
    let mut updated = scan.clone();
    let mut status = updated.status.take().unwrap_or_default();
    conditions.write_to(&mut status);
    updated.status = Some(status);
    updated
}

impl ScanHandler {
    /// Deploy the scan runner once and mark the scan `Created`.
    ///
    /// Fails with `NotFound` if the cluster doesn't exist and with
    /// `Precondition` if it isn't ready. Re-running on an already created
    /// scan changes nothing.
    ///
    /// The observed object may lag behind the store, so the scan is re-read
    /// before deploying. A fresh copy that is already created, has advanced
    /// `Completed`, is being deleted or is gone means there is nothing to
    /// deploy.
    pub async fn handle_create(&self, scan: &ClusterScan) -> Result<ClusterScan, Error> {
        let name = scan.name_any();
        let cluster_id = cluster_id_of(scan)?;

        let cluster = self.clusters.get(cluster_id).await?;
        if !cluster.is_ready() {
            return Err(Error::precondition(cluster_id, "cluster not ready"));
        }

        if ScanConditions::from_status(scan.status.as_ref()).is_created() {
            debug!(scan = %name, "scan runner already deployed");
            return Ok(scan.clone());
        }

        let Some(current) = self.scans.get(&name).await? else {
            debug!(scan = %name, "scan gone since it was observed");
            return Ok(scan.clone());
        };
        let mut conditions = ScanConditions::from_status(current.status.as_ref());
        if conditions.is_created() || conditions.completed() != CompletedState::Unknown {
            debug!(
                scan = %name,
                created = %conditions.created(),
                completed = %conditions.completed(),
                "observed scan is stale, not deploying"
            );
            return Ok(current);
        }
        if current.metadata.deletion_timestamp.is_some() {
            debug!(scan = %name, "scan is being deleted, not deploying");
            return Ok(current);
        }

        // Validate the transition before any side effect happens
        conditions.mark_created()?;

        info!(scan = %name, cluster = %cluster_id, "deploying scan runner");
        deploy_workload(self, cluster_id, &name).await?;

        let updated = self
            .scans
            .update(&with_conditions(&current, &conditions))
            .await?;
        info!(scan = %name, "scan marked created");
        Ok(updated)
    }

    /// Tear down a finished scan and mark it `Completed`.
    ///
    /// Acts only when `Completed=False`; any other state is a no-op.
    pub async fn handle_update(&self, scan: &ClusterScan) -> Result<ClusterScan, Error> {
        let name = scan.name_any();
        let mut conditions = ScanConditions::from_status(scan.status.as_ref());
        if !conditions.needs_teardown() {
            debug!(scan = %name, completed = %conditions.completed(), "no teardown needed");
            return Ok(scan.clone());
        }
        let cluster_id = cluster_id_of(scan)?;
        conditions.mark_completed()?;

        info!(scan = %name, cluster = %cluster_id, "scan finished, tearing down runner");
        uninstall_workload(self, cluster_id, &name).await?;
        release_ownership(
            self.clusters.as_ref(),
            self.cluster_store.as_ref(),
            cluster_id,
            &name,
        )
        .await?;

        let updated = self.scans.update(&with_conditions(scan, &conditions)).await?;
        info!(scan = %name, "scan marked completed");
        Ok(updated)
    }

    /// Release everything a deleted scan holds, whatever state it was in.
    pub async fn handle_remove(&self, scan: &ClusterScan) -> Result<ClusterScan, Error> {
        let name = scan.name_any();

        match self.artifacts.delete(&name).await {
            Ok(()) => debug!(scan = %name, "deleted scan artifact"),
            Err(e) if e.is_not_found() => debug!(scan = %name, "scan artifact already gone"),
            Err(e) => return Err(e),
        }

        let cluster_id = match cluster_id_of(scan) {
            Ok(id) => id,
            Err(e) => {
                // Create never got past validation, so nothing was deployed
                warn!(scan = %name, error = %e, "removing scan without a valid cluster reference");
                return Ok(scan.clone());
            }
        };

        uninstall_workload(self, cluster_id, &name).await?;
        release_ownership(
            self.clusters.as_ref(),
            self.cluster_store.as_ref(),
            cluster_id,
            &name,
        )
        .await?;

        info!(scan = %name, cluster = %cluster_id, "scan resources released");
        Ok(scan.clone())
    }
}
