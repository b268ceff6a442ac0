//! Catalog and application CRDs consumed by the scan controller
//!
//! - `TemplateVersion`: an installable catalog entry (cluster-scoped)
//! - `Project`: a group of namespaces inside a managed cluster; one per
//!   cluster is labelled as the system project
//! - `App`: an installed instance of a template, living in the namespace
//!   named after the project that owns it

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A versioned catalog template that can be installed as an App
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "clusterscan.dev",
    version = "v1alpha1",
    kind = "TemplateVersion",
    plural = "templateversions",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersionSpec {
    /// Template version string
    pub version: String,

    /// Chart or manifest location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A project inside a managed cluster
///
/// Projects live in the namespace named after their cluster.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "clusterscan.dev",
    version = "v1alpha1",
    kind = "Project",
    plural = "projects",
    namespaced,
    printcolumn = r#"{"name":"Cluster","type":"string","jsonPath":".spec.clusterName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// Cluster the project belongs to
    pub cluster_name: String,

    /// Human-friendly name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// An installed template
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "clusterscan.dev",
    version = "v1alpha1",
    kind = "App",
    plural = "apps",
    namespaced,
    printcolumn = r#"{"name":"Template","type":"string","jsonPath":".spec.externalId"}"#,
    printcolumn = r#"{"name":"Target","type":"string","jsonPath":".spec.targetNamespace"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// Template values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answers: BTreeMap<String, String>,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Catalog template identifier
    pub external_id: String,

    /// `<cluster>:<project>` the app is installed under
    pub project_name: String,

    /// Namespace the app's workload runs in
    pub target_namespace: String,
}
