//! ClusterScan operator - runs one security scan per managed cluster
//!
//! # Modules
//!
//! - [`controller_runner`] - builds the ClusterScan controller future
//! - [`crds`] - CRD printing and startup installation
//!
//! Reconciliation logic lives in `clusterscan-controller`; CRDs, conditions
//! and errors in `clusterscan-common`.

pub mod controller_runner;
pub mod crds;
