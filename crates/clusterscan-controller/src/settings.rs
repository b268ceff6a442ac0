//! Operator settings
//!
//! The handler reads settings through [`ScanSettings`] at the moment it
//! needs them, so tests can inject values without touching the process
//! environment.

use clap::Args;

use clusterscan_common::{CLUSTERSCAN_SYSTEM_NAMESPACE, DEFAULT_SCAN_NAMESPACE};

/// Settings the scan handler depends on
#[cfg_attr(test, mockall::automock)]
pub trait ScanSettings: Send + Sync {
    /// Catalog template id of the scan runner
    fn catalog_template_id(&self) -> String;

    /// Namespace the runner is installed into
    fn scan_namespace(&self) -> String;
}

/// Command-line / environment configuration for the operator
#[derive(Args, Clone, Debug)]
pub struct OperatorSettings {
    /// Catalog template id of the scan runner
    #[arg(
        long,
        env = "CLUSTERSCAN_CATALOG_TEMPLATE_ID",
        default_value = "system-library-security-scan-0.1.0"
    )]
    pub catalog_template_id: String,

    /// Namespace the scan runner is installed into
    #[arg(long, env = "CLUSTERSCAN_SCAN_NAMESPACE", default_value = DEFAULT_SCAN_NAMESPACE)]
    pub scan_namespace: String,

    /// Namespace holding per-scan result ConfigMaps
    #[arg(long, env = "CLUSTERSCAN_ARTIFACT_NAMESPACE", default_value = CLUSTERSCAN_SYSTEM_NAMESPACE)]
    pub artifact_namespace: String,

    /// Namespace for operator-owned service accounts
    #[arg(long, env = "CLUSTERSCAN_OPERATOR_NAMESPACE", default_value = CLUSTERSCAN_SYSTEM_NAMESPACE)]
    pub operator_namespace: String,
}

impl ScanSettings for OperatorSettings {
    fn catalog_template_id(&self) -> String {
        self.catalog_template_id.clone()
    }

    fn scan_namespace(&self) -> String {
        self.scan_namespace.clone()
    }
}
