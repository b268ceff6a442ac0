//! ClusterScan reconciliation entry points for `kube::runtime::Controller`
//!
//! [`reconcile`] routes each observed ClusterScan to the matching handler
//! path based on its deletion timestamp, finalizer and conditions.
//! [`error_policy`] maps the error class to a requeue delay.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::{Client, ResourceExt};
use tracing::{debug, info, instrument, warn};

use clusterscan_common::conditions::ScanConditions;
use clusterscan_common::crd::{ClusterScan, ManagedCluster};
use clusterscan_common::{Error, SCAN_FINALIZER};

use crate::handler::ScanHandler;
use crate::kube_clients::KubeScanClients;
use crate::settings::OperatorSettings;

/// Controller context shared by every reconciliation
pub struct ScanContext {
    /// Reconciler core
    pub handler: ScanHandler,
}

impl ScanContext {
    /// Wire the handler to the Kubernetes API
    pub fn new(client: Client, settings: OperatorSettings) -> Self {
        let kube = Arc::new(KubeScanClients::new(
            client,
            settings.artifact_namespace.clone(),
            settings.operator_namespace.clone(),
        ));
        Self {
            handler: ScanHandler {
                clusters: kube.clone(),
                cluster_store: kube.clone(),
                projects: kube.clone(),
                namespaces: kube.clone(),
                credentials: kube.clone(),
                catalog: kube.clone(),
                apps: kube.clone(),
                artifacts: kube.clone(),
                scans: kube,
                settings: Arc::new(settings),
            },
        }
    }

    /// Create a context around an already-wired handler
    pub fn for_testing(handler: ScanHandler) -> Self {
        Self { handler }
    }
}

/// Check if a scan carries the teardown finalizer
pub fn has_finalizer(scan: &ClusterScan) -> bool {
    scan.finalizers().iter().any(|f| f == SCAN_FINALIZER)
}

/// Reconcile a ClusterScan
#[instrument(skip(scan, ctx), fields(scan = %scan.name_any()))]
pub async fn reconcile(scan: Arc<ClusterScan>, ctx: Arc<ScanContext>) -> Result<Action, Error> {
    let handler = &ctx.handler;

    if scan.metadata.deletion_timestamp.is_some() {
        if !has_finalizer(&scan) {
            return Ok(Action::await_change());
        }
        info!("scan deleted, releasing resources");
        handler.handle_remove(&scan).await?;
        handler.scans.remove_finalizer(&scan).await?;
        return Ok(Action::await_change());
    }

    // The finalizer guarantees the remove path runs before the object goes away
    if !has_finalizer(&scan) {
        debug!("adding teardown finalizer");
        handler.scans.add_finalizer(&scan).await?;
        return Ok(Action::requeue(Duration::from_secs(1)));
    }

    if ScanConditions::from_status(scan.status.as_ref()).is_created() {
        handler.handle_update(&scan).await?;
    } else {
        handler.handle_create(&scan).await?;
    }
    Ok(Action::await_change())
}

/// Requeue delay for a failed reconciliation
pub fn requeue_delay(error: &Error) -> Duration {
    match error {
        Error::Conflict { .. } => Duration::from_secs(1),
        Error::Transient { .. } => Duration::from_secs(10),
        Error::Precondition { .. } | Error::NotFound { .. } => Duration::from_secs(30),
        Error::DependencyMissing { .. } => Duration::from_secs(60),
        Error::Validation { .. } | Error::IllegalTransition { .. } => Duration::from_secs(300),
    }
}

/// Error policy for the controller
pub fn error_policy(scan: Arc<ClusterScan>, error: &Error, _ctx: Arc<ScanContext>) -> Action {
    let delay = requeue_delay(error);
    if error.is_retryable() {
        warn!(
            %error,
            scan = %scan.name_any(),
            retry_secs = delay.as_secs(),
            "reconciliation failed"
        );
    } else {
        tracing::error!(
            %error,
            scan = %scan.name_any(),
            retry_secs = delay.as_secs(),
            "reconciliation failed, needs a spec change"
        );
    }
    Action::requeue(delay)
}

/// Scans waiting on `cluster` to become deployable.
///
/// Used to map ManagedCluster events onto ClusterScans so a scan blocked
/// on readiness runs as soon as its cluster turns ready.
pub fn scans_for_cluster(
    scans: &Store<ClusterScan>,
    cluster: &ManagedCluster,
) -> Vec<ObjectRef<ClusterScan>> {
    let cluster_id = cluster.name_any();
    scans
        .state()
        .iter()
        .filter(|scan| scan.spec.cluster_id == cluster_id)
        .filter(|scan| !ScanConditions::from_status(scan.status.as_ref()).is_created())
        .map(|scan| ObjectRef::from_obj(scan.as_ref()))
        .collect()
}
