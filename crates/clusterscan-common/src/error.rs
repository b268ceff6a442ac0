//! Error types for the cluster scan operator
//!
//! Errors carry the operation and resource they relate to so the
//! controller's error policy can decide how soon to retry, and so log
//! lines are useful without a backtrace.

use thiserror::Error;

/// Main error type for cluster scan reconciliation
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced object (cluster, project, workload, artifact) does not exist
    #[error("{kind} {name} not found during {operation}")]
    NotFound {
        /// Operation that performed the lookup
        operation: String,
        /// Kind of the missing object
        kind: String,
        /// Name of the missing object
        name: String,
    },

    /// The target cluster is not in a state that allows the operation
    #[error("precondition failed for cluster {cluster}: {message}")]
    Precondition {
        /// Cluster the precondition was evaluated against
        cluster: String,
        /// Which precondition failed
        message: String,
    },

    /// The workload template is not present in the catalog
    #[error("catalog template {template} unavailable: {source}")]
    DependencyMissing {
        /// Template identifier that was looked up
        template: String,
        /// Underlying lookup failure
        source: Box<Error>,
    },

    /// Optimistic-concurrency write observed a stale resource version
    #[error("conflict writing {kind} {name} during {operation}: object changed since read")]
    Conflict {
        /// Operation that performed the write
        operation: String,
        /// Kind of the object being written
        kind: String,
        /// Name of the object being written
        name: String,
    },

    /// Any other collaborator failure, eligible for backoff and retry
    #[error("{operation} failed for {resource}: {message}")]
    Transient {
        /// Operation that failed
        operation: String,
        /// Resource the operation targeted
        resource: String,
        /// Description of the failure
        message: String,
    },

    /// Invalid ClusterScan spec
    #[error("validation error for {scan}: {message}")]
    Validation {
        /// Name of the scan with the invalid spec
        scan: String,
        /// Description of what's invalid
        message: String,
    },

    /// A condition was asked to move backwards
    #[error("illegal {condition} transition from {from} to {to}")]
    IllegalTransition {
        /// Condition type (Created, Completed)
        condition: &'static str,
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },
}

impl Error {
    /// Create a not-found error
    pub fn not_found(
        operation: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            operation: operation.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a precondition error for a cluster
    pub fn precondition(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Precondition {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Wrap a catalog lookup failure
    pub fn dependency_missing(template: impl Into<String>, source: Error) -> Self {
        Self::DependencyMissing {
            template: template.into(),
            source: Box::new(source),
        }
    }

    /// Create a conflict error
    pub fn conflict(
        operation: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            operation: operation.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a transient error
    pub fn transient(
        operation: impl Into<String>,
        resource: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Transient {
            operation: operation.into(),
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error for a scan
    pub fn validation_for(scan: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            scan: scan.into(),
            message: msg.into(),
        }
    }

    /// Classify a kube-rs error for the given operation and object.
    ///
    /// 404 maps to `NotFound`, 409 to `Conflict`, everything else to `Transient`.
    pub fn from_kube(operation: &str, kind: &str, name: &str, err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(ae) if ae.code == 404 => Self::not_found(operation, kind, name),
            kube::Error::Api(ae) if ae.code == 409 => Self::conflict(operation, kind, name),
            _ => Self::transient(operation, format!("{kind}/{name}"), err.to_string()),
        }
    }

    /// True for "object is absent" errors
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for optimistic-concurrency failures
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this error is retryable
    ///
    /// Validation errors and illegal transitions need a spec or code fix. Everything else may succeed on a later pass.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Precondition { .. } => true,
            Error::DependencyMissing { .. } => true,
            Error::Conflict { .. } => true,
            Error::Transient { .. } => true,
            Error::Validation { .. } => false,
            Error::IllegalTransition { .. } => false,
        }
    }
}
