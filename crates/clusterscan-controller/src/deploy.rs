//! Scan runner deployment and removal
//!
//! The runner is an App installed into the cluster's system project under
//! the scan's own name. Both directions are safe to repeat: install
//! tolerates an existing App, uninstall tolerates a missing one.

use std::collections::BTreeMap;

use tracing::{debug, info};

use clusterscan_common::Error;

use crate::handler::ScanHandler;

/// Description attached to every scan runner App
pub const SCAN_APP_DESCRIPTION: &str = "Cluster Security Scan";

/// Answer key pointing the runner back at its ClusterScan
pub const OWNER_ANSWER: &str = "owner";

/// Everything needed to install one scan runner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadDescriptor {
    /// Workload name (always the scan name)
    pub name: String,
    /// Project id the workload is installed under
    pub project_id: String,
    /// Qualified `<cluster>:<project>` name
    pub project_name: String,
    /// Namespace the runner's pods run in
    pub target_namespace: String,
    /// Catalog template id
    pub external_id: String,
    /// Template values
    pub answers: BTreeMap<String, String>,
    /// Human-readable description
    pub description: String,
    /// Identity recorded as the installer
    pub creator: String,
}

/// An installed workload as reported by the deployer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workload {
    /// Workload name
    pub name: String,
    /// Project id it's installed under
    pub project_id: String,
    /// Catalog template id
    pub external_id: String,
}

impl WorkloadDescriptor {
    /// Build the runner descriptor for `scan_name`
    pub fn for_scan(
        scan_name: &str,
        project_id: &str,
        project_name: &str,
        target_namespace: &str,
        external_id: &str,
        creator: &str,
    ) -> Self {
        Self {
            name: scan_name.to_string(),
            project_id: project_id.to_string(),
            project_name: project_name.to_string(),
            target_namespace: target_namespace.to_string(),
            external_id: external_id.to_string(),
            answers: BTreeMap::from([(OWNER_ANSWER.to_string(), scan_name.to_string())]),
            description: SCAN_APP_DESCRIPTION.to_string(),
            creator: creator.to_string(),
        }
    }
}

/// Install the scan runner for `scan_name` on `cluster_id`.
///
/// 1. verify the configured template is in the catalog
/// 2. resolve the cluster's system project
/// 3. ensure the runner namespace exists under that project
/// 4. resolve the system identity used as creator
/// 5. install, accepting an already-installed runner
pub async fn deploy_workload(
    handler: &ScanHandler,
    cluster_id: &str,
    scan_name: &str,
) -> Result<Workload, Error> {
    let template_id = handler.settings.catalog_template_id();
    handler
        .catalog
        .exists(&template_id)
        .await
        .map_err(|e| Error::dependency_missing(&template_id, e))?;

    let project_id = handler.projects.system_project_id(cluster_id).await?;
    let target_namespace = handler.settings.scan_namespace();
    let project_name = handler
        .namespaces
        .ensure_project_namespace(&project_id, cluster_id, &target_namespace)
        .await?;
    let creator = handler.credentials.system_identity_for(cluster_id).await?;

    let descriptor = WorkloadDescriptor::for_scan(
        scan_name,
        &project_id,
        &project_name,
        &target_namespace,
        &template_id,
        &creator.name,
    );

    info!(
        scan = %scan_name,
        cluster = %cluster_id,
        project = %project_id,
        template = %template_id,
        "installing scan runner"
    );
    handler.apps.install(&project_id, &descriptor, false).await
}

/// Remove the scan runner for `scan_name` from `cluster_id`.
///
/// A missing system project or a missing App both mean there is nothing
/// left to remove.
pub async fn uninstall_workload(
    handler: &ScanHandler,
    cluster_id: &str,
    scan_name: &str,
) -> Result<(), Error> {
    let project_id = match handler.projects.system_project_id(cluster_id).await {
        Ok(id) => id,
        Err(e) if e.is_not_found() => {
            debug!(cluster = %cluster_id, scan = %scan_name, "no system project, runner already gone");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    match handler.apps.uninstall(&project_id, scan_name).await {
        Ok(()) => {
            info!(scan = %scan_name, cluster = %cluster_id, "removed scan runner");
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            debug!(scan = %scan_name, cluster = %cluster_id, "scan runner already removed");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
