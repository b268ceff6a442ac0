//! Kubernetes-backed implementations of the collaborator traits
//!
//! One [`KubeScanClients`] implements every seam the handler needs. All
//! kube errors go through [`Error::from_kube`] so the handler only ever
//! sees the scan error taxonomy.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, ServiceAccount};
use kube::api::{ListParams, ObjectMeta, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

use clusterscan_common::crd::{App, AppSpec, ClusterScan, ManagedCluster, Project, TemplateVersion};
use clusterscan_common::{
    Error, CREATOR_ID_ANNOTATION, FIELD_MANAGER, PROJECT_ID_ANNOTATION,
    RUN_SCAN_OWNER_ANNOTATION, SCAN_FINALIZER, SYSTEM_PROJECT_LABEL,
};

use crate::clients::{
    AppDeployer, ArtifactStore, Catalog, ClusterRecord, ClusterRegistry, ClusterStore,
    CredentialProvider, Identity, NamespaceEnsurer, ProjectResolver, ScanStore,
};
use crate::deploy::{Workload, WorkloadDescriptor};
use crate::ownership::OwnershipRecord;

/// Real Kubernetes implementation of every scan collaborator
#[derive(Clone)]
pub struct KubeScanClients {
    client: Client,
    artifact_namespace: String,
    operator_namespace: String,
}

impl KubeScanClients {
    /// Wrap a kube client.
    ///
    /// `artifact_namespace` holds per-scan result ConfigMaps;
    /// `operator_namespace` holds the per-cluster system service accounts.
    pub fn new(
        client: Client,
        artifact_namespace: impl Into<String>,
        operator_namespace: impl Into<String>,
    ) -> Self {
        Self {
            client,
            artifact_namespace: artifact_namespace.into(),
            operator_namespace: operator_namespace.into(),
        }
    }
}

/// Project the parts of a ManagedCluster the scan controller cares about
pub fn cluster_record(cluster: &ManagedCluster) -> ClusterRecord {
    let id = cluster.name_any();
    ClusterRecord {
        ready: cluster.is_ready(),
        ownership: OwnershipRecord {
            cluster_id: id.clone(),
            owner: cluster.annotations().get(RUN_SCAN_OWNER_ANNOTATION).cloned(),
            version: cluster.resource_version(),
        },
        id,
    }
}

/// Merge patch persisting an ownership record at its read version.
///
/// A cleared owner becomes `null`, which deletes the annotation.
fn ownership_patch(record: &OwnershipRecord) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "resourceVersion": record.version,
            "annotations": {
                RUN_SCAN_OWNER_ANNOTATION: record.owner,
            }
        }
    })
}

/// Merge patch persisting a scan's status at its read version
fn status_patch(scan: &ClusterScan) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "resourceVersion": scan.resource_version(),
        },
        "status": scan.status,
    })
}

/// The App object installing `workload`
fn app_for(workload: &WorkloadDescriptor) -> App {
    App {
        metadata: ObjectMeta {
            name: Some(workload.name.clone()),
            namespace: Some(workload.project_id.clone()),
            annotations: Some(BTreeMap::from([(
                CREATOR_ID_ANNOTATION.to_string(),
                workload.creator.clone(),
            )])),
            ..Default::default()
        },
        spec: AppSpec {
            answers: workload.answers.clone(),
            description: workload.description.clone(),
            external_id: workload.external_id.clone(),
            project_name: workload.project_name.clone(),
            target_namespace: workload.target_namespace.clone(),
        },
    }
}

fn workload_from(app: &App) -> Workload {
    Workload {
        name: app.name_any(),
        project_id: app.namespace().unwrap_or_default(),
        external_id: app.spec.external_id.clone(),
    }
}

/// Name of the system service account provisioned for a cluster
fn system_account_name(cluster_id: &str) -> String {
    format!("system-scan-{cluster_id}")
}

fn finalizer_patch(finalizers: Vec<String>) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "finalizers": finalizers
        }
    })
}

#[async_trait]
impl ClusterRegistry for KubeScanClients {
    async fn get(&self, cluster_id: &str) -> Result<ClusterRecord, Error> {
        let api: Api<ManagedCluster> = Api::all(self.client.clone());
        let cluster = api
            .get(cluster_id)
            .await
            .map_err(|e| Error::from_kube("get cluster", "ManagedCluster", cluster_id, e))?;
        Ok(cluster_record(&cluster))
    }
}

#[async_trait]
impl ClusterStore for KubeScanClients {
    async fn update(&self, cluster: &ClusterRecord) -> Result<ClusterRecord, Error> {
        let api: Api<ManagedCluster> = Api::all(self.client.clone());
        let updated = api
            .patch(
                &cluster.id,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&ownership_patch(&cluster.ownership)),
            )
            .await
            .map_err(|e| Error::from_kube("update cluster claim", "ManagedCluster", &cluster.id, e))?;
        Ok(cluster_record(&updated))
    }
}

#[async_trait]
impl ProjectResolver for KubeScanClients {
    async fn system_project_id(&self, cluster_id: &str) -> Result<String, Error> {
        let api: Api<Project> = Api::namespaced(self.client.clone(), cluster_id);
        let projects = api
            .list(&ListParams::default().labels(&format!("{SYSTEM_PROJECT_LABEL}=true")))
            .await
            .map_err(|e| Error::from_kube("list projects", "Project", cluster_id, e))?;

        projects
            .items
            .first()
            .map(|p| p.name_any())
            .ok_or_else(|| Error::not_found("resolve system project", "Project", cluster_id))
    }
}

#[async_trait]
impl NamespaceEnsurer for KubeScanClients {
    async fn ensure_project_namespace(
        &self,
        project_id: &str,
        cluster_id: &str,
        namespace: &str,
    ) -> Result<String, Error> {
        let project_name = format!("{cluster_id}:{project_id}");
        let api: Api<Namespace> = Api::all(self.client.clone());

        let existing = api
            .get_opt(namespace)
            .await
            .map_err(|e| Error::from_kube("get namespace", "Namespace", namespace, e))?;
        if let Some(ns) = existing {
            if ns.annotations().get(PROJECT_ID_ANNOTATION) == Some(&project_name) {
                return Ok(project_name);
            }
            let patch = serde_json::json!({
                "metadata": { "annotations": { PROJECT_ID_ANNOTATION: &project_name } }
            });
            api.patch(namespace, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
                .await
                .map_err(|e| Error::from_kube("assign namespace project", "Namespace", namespace, e))?;
            debug!(namespace = %namespace, project = %project_name, "moved namespace into project");
            return Ok(project_name);
        }

        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(namespace.to_string()),
                annotations: Some(BTreeMap::from([(
                    PROJECT_ID_ANNOTATION.to_string(),
                    project_name.clone(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        };
        match api.create(&PostParams::default(), &ns).await {
            Ok(_) => debug!(namespace = %namespace, project = %project_name, "created namespace"),
            // Lost a create race; the winner used the same annotation
            Err(kube::Error::Api(ae)) if ae.code == 409 => {}
            Err(e) => return Err(Error::from_kube("create namespace", "Namespace", namespace, e)),
        }
        Ok(project_name)
    }
}

#[async_trait]
impl CredentialProvider for KubeScanClients {
    async fn system_identity_for(&self, cluster_id: &str) -> Result<Identity, Error> {
        let name = system_account_name(cluster_id);
        let api: Api<ServiceAccount> =
            Api::namespaced(self.client.clone(), &self.operator_namespace);

        let sa = ServiceAccount {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(self.operator_namespace.clone()),
                ..Default::default()
            },
            ..Default::default()
        };
        match api.create(&PostParams::default(), &sa).await {
            Ok(_) => debug!(cluster = %cluster_id, account = %name, "created system service account"),
            Err(kube::Error::Api(ae)) if ae.code == 409 => {}
            Err(e) => return Err(Error::from_kube("create service account", "ServiceAccount", &name, e)),
        }

        Ok(Identity {
            name: format!("system:serviceaccount:{}:{}", self.operator_namespace, name),
        })
    }
}

#[async_trait]
impl Catalog for KubeScanClients {
    async fn exists(&self, template_id: &str) -> Result<(), Error> {
        let api: Api<TemplateVersion> = Api::all(self.client.clone());
        api.get(template_id)
            .await
            .map_err(|e| Error::from_kube("catalog lookup", "TemplateVersion", template_id, e))?;
        Ok(())
    }
}

#[async_trait]
impl AppDeployer for KubeScanClients {
    async fn install(
        &self,
        project_id: &str,
        workload: &WorkloadDescriptor,
        fail_if_exists: bool,
    ) -> Result<Workload, Error> {
        let api: Api<App> = Api::namespaced(self.client.clone(), project_id);
        match api.create(&PostParams::default(), &app_for(workload)).await {
            Ok(app) => Ok(workload_from(&app)),
            Err(kube::Error::Api(ae)) if ae.code == 409 && !fail_if_exists => {
                debug!(app = %workload.name, project = %project_id, "app already installed");
                let app = api
                    .get(&workload.name)
                    .await
                    .map_err(|e| Error::from_kube("get app", "App", &workload.name, e))?;
                Ok(workload_from(&app))
            }
            Err(e) => Err(Error::from_kube("install app", "App", &workload.name, e)),
        }
    }

    async fn uninstall(&self, project_id: &str, name: &str) -> Result<(), Error> {
        let api: Api<App> = Api::namespaced(self.client.clone(), project_id);
        api.delete(name, &Default::default())
            .await
            .map_err(|e| Error::from_kube("uninstall app", "App", name, e))?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for KubeScanClients {
    async fn delete(&self, scan_name: &str) -> Result<(), Error> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.artifact_namespace);
        api.delete(scan_name, &Default::default())
            .await
            .map_err(|e| Error::from_kube("delete artifact", "ConfigMap", scan_name, e))?;
        Ok(())
    }
}

#[async_trait]
impl ScanStore for KubeScanClients {
    async fn get(&self, name: &str) -> Result<Option<ClusterScan>, Error> {
        let api: Api<ClusterScan> = Api::all(self.client.clone());
        api.get_opt(name)
            .await
            .map_err(|e| Error::from_kube("get scan", "ClusterScan", name, e))
    }

    async fn update(&self, scan: &ClusterScan) -> Result<ClusterScan, Error> {
        let name = scan.name_any();
        let api: Api<ClusterScan> = Api::all(self.client.clone());
        api.patch_status(
            &name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&status_patch(scan)),
        )
        .await
        .map_err(|e| Error::from_kube("update status", "ClusterScan", &name, e))
    }

    async fn add_finalizer(&self, scan: &ClusterScan) -> Result<(), Error> {
        let name = scan.name_any();
        let mut finalizers = scan.finalizers().to_vec();
        if finalizers.iter().any(|f| f == SCAN_FINALIZER) {
            return Ok(());
        }
        finalizers.push(SCAN_FINALIZER.to_string());

        let api: Api<ClusterScan> = Api::all(self.client.clone());
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&finalizer_patch(finalizers)),
        )
        .await
        .map_err(|e| Error::from_kube("add finalizer", "ClusterScan", &name, e))?;
        Ok(())
    }

    async fn remove_finalizer(&self, scan: &ClusterScan) -> Result<(), Error> {
        let name = scan.name_any();
        let api: Api<ClusterScan> = Api::all(self.client.clone());

        // Re-read so finalizers added by others since the event aren't dropped
        let current = match api.get_opt(&name).await {
            Ok(Some(current)) => current,
            Ok(None) => return Ok(()),
            Err(e) => return Err(Error::from_kube("get scan", "ClusterScan", &name, e)),
        };
        let finalizers: Vec<String> = current
            .finalizers()
            .iter()
            .filter(|f| *f != SCAN_FINALIZER)
            .cloned()
            .collect();
        if finalizers.len() == current.finalizers().len() {
            return Ok(());
        }

        match api
            .patch(
                &name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&finalizer_patch(finalizers)),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(Error::from_kube("remove finalizer", "ClusterScan", &name, e)),
        }
    }
}
