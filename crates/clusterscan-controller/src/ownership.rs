//! Exclusive scan ownership on a cluster
//!
//! Each managed cluster carries at most one claim naming the ClusterScan
//! allowed to run against it. Claims are acquired outside this controller;
//! this module only releases them, and only ever with compare-then-clear:
//! a scan can clear a claim that names itself, never someone else's. The
//! write carries the version the claim was read at, so a claim that changed
//! in between is reported as a conflict instead of being overwritten.

use tracing::{debug, info};

use clusterscan_common::Error;

use crate::clients::{ClusterRegistry, ClusterStore};

/// A cluster's ownership claim as read from the store
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnershipRecord {
    /// Cluster the claim is on
    pub cluster_id: String,
    /// Name of the owning scan, if any
    pub owner: Option<String>,
    /// Version token of the cluster object the claim was read from
    pub version: Option<String>,
}

/// Result of applying compare-then-clear to a record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Release {
    /// The claim is absent or belongs to another scan; nothing to write
    NotOwned,
    /// The claim named this scan; the cleared record must be persisted
    Cleared(OwnershipRecord),
}

impl OwnershipRecord {
    /// Compare the owner against `scan_name` and clear it on match.
    ///
    /// The cleared record keeps the original version token so the write is
    /// rejected if the claim changed since it was read.
    pub fn release(&self, scan_name: &str) -> Release {
        if !self.is_owned_by(scan_name) {
            return Release::NotOwned;
        }
        Release::Cleared(OwnershipRecord {
            owner: None,
            ..self.clone()
        })
    }

    /// True if `scan_name` holds the claim
    pub fn is_owned_by(&self, scan_name: &str) -> bool {
        self.owner.as_deref() == Some(scan_name)
    }
}

/// What [`release_ownership`] did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The scan's claim was cleared
    Released,
    /// The claim was absent or held by another scan and was left alone
    NotOwned,
    /// The cluster no longer exists, so there is no claim to release
    ClusterGone,
}

/// Release `scan_name`'s claim on `cluster_id`, if it holds one.
///
/// A conflicting write is returned as `Conflict` for the caller to retry
/// from a fresh read.
pub async fn release_ownership(
    registry: &dyn ClusterRegistry,
    store: &dyn ClusterStore,
    cluster_id: &str,
    scan_name: &str,
) -> Result<ReleaseOutcome, Error> {
    let mut cluster = match registry.get(cluster_id).await {
        Ok(cluster) => cluster,
        Err(e) if e.is_not_found() => {
            debug!(cluster = %cluster_id, scan = %scan_name, "cluster gone, no claim to release");
            return Ok(ReleaseOutcome::ClusterGone);
        }
        Err(e) => return Err(e),
    };

    match cluster.ownership.release(scan_name) {
        Release::NotOwned => {
            debug!(
                cluster = %cluster_id,
                scan = %scan_name,
                owner = ?cluster.ownership.owner,
                "scan does not hold the cluster claim, leaving it untouched"
            );
            Ok(ReleaseOutcome::NotOwned)
        }
        Release::Cleared(record) => {
            cluster.ownership = record;
            store.update(&cluster).await?;
            info!(cluster = %cluster_id, scan = %scan_name, "released cluster scan claim");
            Ok(ReleaseOutcome::Released)
        }
    }
}
