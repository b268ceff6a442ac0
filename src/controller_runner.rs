//! Controller runner - builds the ClusterScan controller future

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use clusterscan_common::crd::{ClusterScan, ManagedCluster};
use clusterscan_controller::{error_policy, reconcile, scans_for_cluster, OperatorSettings, ScanContext};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Build the ClusterScan controller future
///
/// ManagedCluster changes re-queue every scan still waiting on that cluster,
/// so a scan blocked on readiness runs as soon as the cluster turns ready.
pub fn build_scan_controller(
    client: Client,
    settings: OperatorSettings,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let ctx = Arc::new(ScanContext::new(client.clone(), settings));
    let scans: Api<ClusterScan> = Api::all(client.clone());
    let clusters: Api<ManagedCluster> = Api::all(client);

    tracing::info!("- ClusterScan controller");

    let controller = Controller::new(scans, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS));
    let store = controller.store();

    Box::pin(
        controller
            .watches(
                clusters,
                WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
                move |cluster| {
                    let refs = scans_for_cluster(&store, &cluster);
                    if !refs.is_empty() {
                        tracing::debug!(
                            cluster = %cluster.metadata.name.as_deref().unwrap_or_default(),
                            scans = refs.len(),
                            "Cluster changed, re-queueing waiting scans"
                        );
                    }
                    refs
                },
            )
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("ClusterScan")),
    )
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
