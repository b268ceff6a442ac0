//! ClusterScan controller
//!
//! Runs one security scan per managed cluster: deploys the scan runner when
//! a ClusterScan appears, tears it down once the runner reports it has
//! finished, and releases everything the scan held when it is deleted.

pub mod clients;
pub mod controller;
pub mod deploy;
pub mod handler;
pub mod kube_clients;
pub mod ownership;
pub mod settings;

#[cfg(test)]
mod fake;

pub use controller::{error_policy, reconcile, scans_for_cluster, ScanContext};
pub use handler::ScanHandler;
pub use settings::{OperatorSettings, ScanSettings};
