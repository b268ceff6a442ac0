//! ClusterScan operator - Kubernetes security scan lifecycle management

use clap::Parser;
use kube::Client;

use clusterscan::controller_runner::build_scan_controller;
use clusterscan::crds::{crds_yaml, ensure_crds_installed};
use clusterscan_common::telemetry::{init_telemetry, TelemetryConfig};
use clusterscan_controller::OperatorSettings;

/// ClusterScan - deploys, tears down and cleans up per-cluster security scans
#[derive(Parser, Debug)]
#[command(name = "clusterscan-operator", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    /// Emit JSON logs
    #[arg(long, env = "CLUSTERSCAN_LOG_JSON")]
    log_json: bool,

    #[command(flatten)]
    settings: OperatorSettings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        print!("{}", crds_yaml()?);
        return Ok(());
    }

    init_telemetry(TelemetryConfig { json: cli.log_json })?;

    tracing::info!(
        template = %cli.settings.catalog_template_id,
        scan_namespace = %cli.settings.scan_namespace,
        "Starting ClusterScan operator"
    );

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    ensure_crds_installed(&client).await?;

    tracing::info!("Starting controllers:");
    build_scan_controller(client, cli.settings).await;

    tracing::info!("Shutting down");
    Ok(())
}
