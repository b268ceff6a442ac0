//! CRD installation and printing

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};

use clusterscan_common::crd::all_crds;
use clusterscan_common::retry::{retry_with_backoff, RetryConfig};
use clusterscan_common::FIELD_MANAGER;

/// Attempts before giving up on CRD installation
const CRD_INSTALL_ATTEMPTS: u32 = 10;

/// Render every CRD as a multi-document YAML stream
pub fn crds_yaml() -> anyhow::Result<String> {
    let docs = all_crds()
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
    Ok(docs.join("---\n"))
}

/// Ensure all CRDs are installed
///
/// The operator installs its own CRDs on startup using server-side apply.
/// This ensures the CRD versions always match the operator version.
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();
    let retry = RetryConfig::with_max_attempts(CRD_INSTALL_ATTEMPTS);

    for crd in all_crds() {
        let name = crd.name_any();
        tracing::info!(crd = %name, "Installing CRD...");
        retry_with_backoff(&retry, "install CRD", || {
            let crds = crds.clone();
            let params = params.clone();
            let crd = crd.clone();
            let name = name.clone();
            async move { crds.patch(&name, &params, &Patch::Apply(&crd)).await }
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to install {} CRD: {}", name, e))?;
    }

    tracing::info!("All ClusterScan CRDs installed/updated");
    Ok(())
}
