//! In-memory collaborators for multi-step reconcile tests
//!
//! [`FakeWorld`] implements every collaborator trait over one shared state
//! that behaves like the API server where it matters: resource versions
//! bump on every write, version-checked writes conflict, deletes of absent
//! objects are `NotFound`, and finalizers hold back object removal.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use clusterscan_common::conditions::{ScanConditions, COMPLETED_CONDITION};
use clusterscan_common::crd::{
    set_condition, ClusterScan, ClusterScanSpec, ClusterScanStatus, Condition, ConditionStatus,
};
use clusterscan_common::{Error, DEFAULT_SCAN_NAMESPACE, SCAN_FINALIZER};

use crate::clients::{
    AppDeployer, ArtifactStore, Catalog, ClusterRecord, ClusterRegistry, ClusterStore,
    CredentialProvider, Identity, NamespaceEnsurer, ProjectResolver, ScanStore,
};
use crate::deploy::{Workload, WorkloadDescriptor};
use crate::handler::ScanHandler;
use crate::ownership::OwnershipRecord;
use crate::settings::ScanSettings;

pub(crate) const TEMPLATE: &str = "security-scan-0.1.0";

struct FakeCluster {
    ready: bool,
    owner: Option<String>,
    version: u64,
}

struct WorldState {
    next_version: u64,
    clusters: BTreeMap<String, FakeCluster>,
    scans: BTreeMap<String, ClusterScan>,
    apps: BTreeMap<(String, String), WorkloadDescriptor>,
    artifacts: BTreeSet<String>,
    namespaces: BTreeMap<String, String>,
    templates: BTreeSet<String>,
    install_calls: usize,
    apps_created: usize,
    installs_on_unready: usize,
    /// (cluster, owner before the write) for every claim write
    claim_writes: Vec<(String, Option<String>)>,
    fail_rate: f64,
    rng: StdRng,
}

impl WorldState {
    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    fn maybe_fail(&mut self, operation: &str, resource: &str) -> Result<(), Error> {
        if self.fail_rate > 0.0 && self.rng.gen_bool(self.fail_rate) {
            return Err(Error::transient(operation, resource, "injected failure"));
        }
        Ok(())
    }

    fn cluster_for_project(&self, project_id: &str) -> Option<&FakeCluster> {
        project_id
            .strip_prefix("p-")
            .and_then(|cluster| self.clusters.get(cluster))
    }

    fn store_scan(&mut self, mut scan: ClusterScan) -> ClusterScan {
        scan.metadata.resource_version = Some(self.bump().to_string());
        let gone = scan.metadata.deletion_timestamp.is_some() && scan.finalizers().is_empty();
        if gone {
            self.scans.remove(&scan.name_any());
        } else {
            self.scans.insert(scan.name_any(), scan.clone());
        }
        scan
    }
}

struct FixedSettings;

impl ScanSettings for FixedSettings {
    fn catalog_template_id(&self) -> String {
        TEMPLATE.to_string()
    }

    fn scan_namespace(&self) -> String {
        DEFAULT_SCAN_NAMESPACE.to_string()
    }
}

/// Shared in-memory state behind every collaborator
#[derive(Clone)]
pub(crate) struct FakeWorld {
    state: Arc<Mutex<WorldState>>,
}

impl FakeWorld {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(WorldState {
                next_version: 0,
                clusters: BTreeMap::new(),
                scans: BTreeMap::new(),
                apps: BTreeMap::new(),
                artifacts: BTreeSet::new(),
                namespaces: BTreeMap::new(),
                templates: BTreeSet::from([TEMPLATE.to_string()]),
                install_calls: 0,
                apps_created: 0,
                installs_on_unready: 0,
                claim_writes: Vec::new(),
                fail_rate: 0.0,
                rng: StdRng::seed_from_u64(seed),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().expect("mutex should not be poisoned")
    }

    /// A handler whose collaborators all point at this world
    pub(crate) fn handler(&self) -> ScanHandler {
        let world = Arc::new(self.clone());
        ScanHandler {
            clusters: world.clone(),
            cluster_store: world.clone(),
            projects: world.clone(),
            namespaces: world.clone(),
            credentials: world.clone(),
            catalog: world.clone(),
            apps: world.clone(),
            artifacts: world.clone(),
            scans: world,
            settings: Arc::new(FixedSettings),
        }
    }

    pub(crate) fn set_fail_rate(&self, rate: f64) {
        self.lock().fail_rate = rate;
    }

    pub(crate) fn remove_template(&self, template: &str) {
        self.lock().templates.remove(template);
    }

    pub(crate) fn add_cluster(&self, id: &str, ready: bool) {
        let mut s = self.lock();
        let version = s.bump();
        s.clusters.insert(
            id.to_string(),
            FakeCluster {
                ready,
                owner: None,
                version,
            },
        );
    }

    pub(crate) fn set_ready(&self, id: &str, ready: bool) {
        let mut s = self.lock();
        let version = s.bump();
        if let Some(c) = s.clusters.get_mut(id) {
            c.ready = ready;
            c.version = version;
        }
    }

    /// Claim (or free) a cluster the way the scan requester would
    pub(crate) fn claim(&self, id: &str, owner: Option<&str>) {
        let mut s = self.lock();
        let version = s.bump();
        if let Some(c) = s.clusters.get_mut(id) {
            c.owner = owner.map(String::from);
            c.version = version;
        }
    }

    pub(crate) fn owner(&self, id: &str) -> Option<String> {
        self.lock().clusters.get(id).and_then(|c| c.owner.clone())
    }

    pub(crate) fn create_scan(&self, name: &str, cluster: &str) -> ClusterScan {
        let scan = ClusterScan::new(
            name,
            ClusterScanSpec {
                cluster_id: cluster.to_string(),
            },
        );
        self.lock().store_scan(scan)
    }

    pub(crate) fn scan(&self, name: &str) -> Option<ClusterScan> {
        self.lock().scans.get(name).cloned()
    }

    /// Mark the scan deleted; it disappears once its finalizers are gone
    pub(crate) fn delete_scan(&self, name: &str) {
        let mut s = self.lock();
        let Some(mut scan) = s.scans.get(name).cloned() else {
            return;
        };
        if scan.metadata.deletion_timestamp.is_none() {
            scan.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
            s.store_scan(scan);
        }
    }

    /// The scan runner reports it has finished and leaves its results
    pub(crate) fn runner_finishes(&self, name: &str) {
        let mut s = self.lock();
        let Some(mut scan) = s.scans.get(name).cloned() else {
            return;
        };
        let conditions = ScanConditions::from_status(scan.status.as_ref());
        if !conditions.is_created() || conditions.needs_teardown() || conditions.is_completed() {
            return;
        }
        let status = scan.status.get_or_insert_with(ClusterScanStatus::default);
        set_condition(
            &mut status.conditions,
            Condition::new(COMPLETED_CONDITION, ConditionStatus::False, "ScanFinished", ""),
        );
        s.artifacts.insert(name.to_string());
        s.store_scan(scan);
    }

    pub(crate) fn app_exists(&self, name: &str) -> bool {
        self.lock().apps.keys().any(|(_, n)| n == name)
    }

    pub(crate) fn app(&self, project_id: &str, name: &str) -> Option<WorkloadDescriptor> {
        self.lock()
            .apps
            .get(&(project_id.to_string(), name.to_string()))
            .cloned()
    }

    pub(crate) fn artifact_exists(&self, name: &str) -> bool {
        self.lock().artifacts.contains(name)
    }

    pub(crate) fn install_calls(&self) -> usize {
        self.lock().install_calls
    }

    pub(crate) fn apps_created(&self) -> usize {
        self.lock().apps_created
    }

    pub(crate) fn installs_on_unready(&self) -> usize {
        self.lock().installs_on_unready
    }

    pub(crate) fn claim_writes(&self) -> Vec<(String, Option<String>)> {
        self.lock().claim_writes.clone()
    }
}

#[async_trait]
impl ClusterRegistry for FakeWorld {
    async fn get(&self, cluster_id: &str) -> Result<ClusterRecord, Error> {
        let mut s = self.lock();
        s.maybe_fail("get cluster", cluster_id)?;
        let c = s
            .clusters
            .get(cluster_id)
            .ok_or_else(|| Error::not_found("get cluster", "ManagedCluster", cluster_id))?;
        Ok(ClusterRecord {
            id: cluster_id.to_string(),
            ready: c.ready,
            ownership: OwnershipRecord {
                cluster_id: cluster_id.to_string(),
                owner: c.owner.clone(),
                version: Some(c.version.to_string()),
            },
        })
    }
}

#[async_trait]
impl ClusterStore for FakeWorld {
    async fn update(&self, cluster: &ClusterRecord) -> Result<ClusterRecord, Error> {
        let mut s = self.lock();
        s.maybe_fail("update cluster claim", &cluster.id)?;
        let version = s.bump();
        let current = s
            .clusters
            .get_mut(&cluster.id)
            .ok_or_else(|| Error::not_found("update cluster claim", "ManagedCluster", &cluster.id))?;
        if cluster.ownership.version != Some(current.version.to_string()) {
            return Err(Error::conflict("update cluster claim", "ManagedCluster", &cluster.id));
        }
        let previous = current.owner.clone();
        current.owner = cluster.ownership.owner.clone();
        current.version = version;
        s.claim_writes.push((cluster.id.clone(), previous));

        let mut updated = cluster.clone();
        updated.ownership.version = Some(version.to_string());
        Ok(updated)
    }
}

#[async_trait]
impl ProjectResolver for FakeWorld {
    async fn system_project_id(&self, cluster_id: &str) -> Result<String, Error> {
        let mut s = self.lock();
        s.maybe_fail("list projects", cluster_id)?;
        if !s.clusters.contains_key(cluster_id) {
            return Err(Error::not_found("resolve system project", "Project", cluster_id));
        }
        Ok(format!("p-{cluster_id}"))
    }
}

#[async_trait]
impl NamespaceEnsurer for FakeWorld {
    async fn ensure_project_namespace(
        &self,
        project_id: &str,
        cluster_id: &str,
        namespace: &str,
    ) -> Result<String, Error> {
        let mut s = self.lock();
        s.maybe_fail("ensure namespace", namespace)?;
        let project_name = format!("{cluster_id}:{project_id}");
        s.namespaces
            .insert(format!("{cluster_id}/{namespace}"), project_name.clone());
        Ok(project_name)
    }
}

#[async_trait]
impl CredentialProvider for FakeWorld {
    async fn system_identity_for(&self, cluster_id: &str) -> Result<Identity, Error> {
        self.lock()
            .maybe_fail("create service account", cluster_id)?;
        Ok(Identity {
            name: format!("system:serviceaccount:clusterscan-system:system-scan-{cluster_id}"),
        })
    }
}

#[async_trait]
impl Catalog for FakeWorld {
    async fn exists(&self, template_id: &str) -> Result<(), Error> {
        let mut s = self.lock();
        s.maybe_fail("catalog lookup", template_id)?;
        if s.templates.contains(template_id) {
            Ok(())
        } else {
            Err(Error::not_found("catalog lookup", "TemplateVersion", template_id))
        }
    }
}

#[async_trait]
impl AppDeployer for FakeWorld {
    async fn install(
        &self,
        project_id: &str,
        workload: &WorkloadDescriptor,
        fail_if_exists: bool,
    ) -> Result<Workload, Error> {
        let mut s = self.lock();
        s.maybe_fail("install app", &workload.name)?;
        s.install_calls += 1;
        if !s.cluster_for_project(project_id).is_some_and(|c| c.ready) {
            s.installs_on_unready += 1;
        }

        let key = (project_id.to_string(), workload.name.clone());
        if s.apps.contains_key(&key) {
            if fail_if_exists {
                return Err(Error::conflict("install app", "App", &workload.name));
            }
        } else {
            s.apps.insert(key, workload.clone());
            s.apps_created += 1;
        }
        Ok(Workload {
            name: workload.name.clone(),
            project_id: project_id.to_string(),
            external_id: workload.external_id.clone(),
        })
    }

    async fn uninstall(&self, project_id: &str, name: &str) -> Result<(), Error> {
        let mut s = self.lock();
        s.maybe_fail("uninstall app", name)?;
        s.apps
            .remove(&(project_id.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::not_found("uninstall app", "App", name))
    }
}

#[async_trait]
impl ArtifactStore for FakeWorld {
    async fn delete(&self, scan_name: &str) -> Result<(), Error> {
        let mut s = self.lock();
        s.maybe_fail("delete artifact", scan_name)?;
        if s.artifacts.remove(scan_name) {
            Ok(())
        } else {
            Err(Error::not_found("delete artifact", "ConfigMap", scan_name))
        }
    }
}

#[async_trait]
impl ScanStore for FakeWorld {
    async fn get(&self, name: &str) -> Result<Option<ClusterScan>, Error> {
        let mut s = self.lock();
        s.maybe_fail("get scan", name)?;
        Ok(s.scans.get(name).cloned())
    }

    async fn update(&self, scan: &ClusterScan) -> Result<ClusterScan, Error> {
        let name = scan.name_any();
        let mut s = self.lock();
        s.maybe_fail("update status", &name)?;
        let mut current = s
            .scans
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::not_found("update status", "ClusterScan", &name))?;
        if current.resource_version() != scan.resource_version() {
            return Err(Error::conflict("update status", "ClusterScan", &name));
        }
        current.status = scan.status.clone();
        Ok(s.store_scan(current))
    }

    async fn add_finalizer(&self, scan: &ClusterScan) -> Result<(), Error> {
        let name = scan.name_any();
        let mut s = self.lock();
        s.maybe_fail("add finalizer", &name)?;
        let mut current = s
            .scans
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::not_found("add finalizer", "ClusterScan", &name))?;
        if current.metadata.deletion_timestamp.is_some() {
            return Err(Error::transient(
                "add finalizer",
                format!("ClusterScan/{name}"),
                "no new finalizers can be added if the object is being deleted",
            ));
        }
        if !current.finalizers().iter().any(|f| f == SCAN_FINALIZER) {
            current.finalizers_mut().push(SCAN_FINALIZER.to_string());
            s.store_scan(current);
        }
        Ok(())
    }

    async fn remove_finalizer(&self, scan: &ClusterScan) -> Result<(), Error> {
        let name = scan.name_any();
        let mut s = self.lock();
        s.maybe_fail("remove finalizer", &name)?;
        let Some(mut current) = s.scans.get(&name).cloned() else {
            return Ok(());
        };
        if current.finalizers().iter().any(|f| f == SCAN_FINALIZER) {
            current.finalizers_mut().retain(|f| f != SCAN_FINALIZER);
            s.store_scan(current);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{reconcile, ScanContext};
    use clusterscan_common::conditions::{CompletedState, CreatedState};

    async fn deliver(ctx: &Arc<ScanContext>, world: &FakeWorld, name: &str) {
        if let Some(scan) = world.scan(name) {
            let _ = reconcile(Arc::new(scan), ctx.clone()).await;
        }
    }

    fn conditions(scan: &ClusterScan) -> ScanConditions {
        ScanConditions::from_status(scan.status.as_ref())
    }

    /// Story: s1 on c1 is deployed, finishes, is torn down and then removed
    #[tokio::test]
    async fn story_scan_lifecycle_on_ready_cluster() {
        let world = FakeWorld::new(0);
        world.add_cluster("c1", true);
        world.claim("c1", Some("s1"));
        let s1 = world.create_scan("s1", "c1");
        let handler = world.handler();

        // Create: runner installed into c1's system project
        let created = handler.handle_create(&s1).await.unwrap();
        assert_eq!(conditions(&created).created(), CreatedState::True);
        assert_eq!(conditions(&created).completed(), CompletedState::Unknown);
        let app = world.app("p-c1", "s1").expect("runner installed");
        assert_eq!(app.answers.get("owner").map(String::as_str), Some("s1"));
        assert_eq!(app.project_name, "c1:p-c1");

        // Runner finishes; update tears down and releases the claim
        world.runner_finishes("s1");
        let finished = world.scan("s1").unwrap();
        assert!(conditions(&finished).needs_teardown());
        let completed = handler.handle_update(&finished).await.unwrap();
        assert_eq!(conditions(&completed).completed(), CompletedState::True);
        assert!(!world.app_exists("s1"));
        assert_eq!(world.owner("c1"), None);

        // Remove: runner and claim already gone, only the artifact is left
        let writes_before = world.claim_writes().len();
        handler.handle_remove(&completed).await.unwrap();
        assert!(!world.artifact_exists("s1"));
        handler.handle_remove(&completed).await.unwrap();
        assert_eq!(world.claim_writes().len(), writes_before);
        assert_eq!(world.install_calls(), 1);
    }

    #[tokio::test]
    async fn story_redelivered_create_installs_once() {
        let world = FakeWorld::new(0);
        world.add_cluster("c1", true);
        world.create_scan("s1", "c1");
        let ctx = Arc::new(ScanContext::for_testing(world.handler()));

        for _ in 0..5 {
            deliver(&ctx, &world, "s1").await;
        }

        assert_eq!(world.install_calls(), 1);
        assert!(conditions(&world.scan("s1").unwrap()).is_created());
    }

    /// Story: the scan waits on its cluster, then deploys once it's ready
    #[tokio::test]
    async fn story_scan_waits_for_cluster_readiness() {
        let world = FakeWorld::new(0);
        world.add_cluster("c1", false);
        world.create_scan("s1", "c1");
        let ctx = Arc::new(ScanContext::for_testing(world.handler()));

        let finalized = reconcile(Arc::new(world.scan("s1").unwrap()), ctx.clone()).await;
        assert!(finalized.is_ok());
        let err = reconcile(Arc::new(world.scan("s1").unwrap()), ctx.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));
        assert_eq!(world.install_calls(), 0);

        world.set_ready("c1", true);
        deliver(&ctx, &world, "s1").await;
        assert!(world.app_exists("s1"));
    }

    #[tokio::test]
    async fn story_missing_template_blocks_deploy() {
        let world = FakeWorld::new(0);
        world.add_cluster("c1", true);
        world.remove_template(TEMPLATE);
        let s1 = world.create_scan("s1", "c1");

        let err = world.handler().handle_create(&s1).await.unwrap_err();
        assert!(matches!(err, Error::DependencyMissing { .. }));
        assert_eq!(world.install_calls(), 0);
        assert!(!conditions(&world.scan("s1").unwrap()).is_created());
    }

    /// Story: completing or removing scan A never touches scan B's claim
    #[tokio::test]
    async fn story_foreign_claim_survives_completion_and_removal() {
        let world = FakeWorld::new(0);
        world.add_cluster("c1", true);
        world.claim("c1", Some("b"));
        let a = world.create_scan("a", "c1");
        let handler = world.handler();

        handler.handle_create(&a).await.unwrap();
        world.runner_finishes("a");
        let finished = world.scan("a").unwrap();
        let completed = handler.handle_update(&finished).await.unwrap();
        handler.handle_remove(&completed).await.unwrap();

        assert_eq!(world.owner("c1").as_deref(), Some("b"));
        assert!(world.claim_writes().is_empty());
    }

    /// Story: a stale event for an already completed scan can't regress it
    #[tokio::test]
    async fn story_stale_teardown_event_is_rejected() {
        let world = FakeWorld::new(0);
        world.add_cluster("c1", true);
        let s1 = world.create_scan("s1", "c1");
        let handler = world.handler();

        handler.handle_create(&s1).await.unwrap();
        world.runner_finishes("s1");
        let stale = world.scan("s1").unwrap();
        handler.handle_update(&stale).await.unwrap();

        let err = handler.handle_update(&stale).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(conditions(&world.scan("s1").unwrap()).is_completed());
    }

    /// Story: the pre-create observation arrives again after the scan ran
    /// and its runner was torn down; the runner must stay gone
    #[tokio::test]
    async fn story_late_create_event_after_teardown_redeploys_nothing() {
        let world = FakeWorld::new(0);
        world.add_cluster("c1", true);
        world.create_scan("s1", "c1");
        let ctx = Arc::new(ScanContext::for_testing(world.handler()));

        deliver(&ctx, &world, "s1").await;
        let before_create = world.scan("s1").unwrap();
        assert!(!conditions(&before_create).is_created());
        deliver(&ctx, &world, "s1").await;
        assert!(world.app_exists("s1"));

        world.runner_finishes("s1");
        deliver(&ctx, &world, "s1").await;
        assert!(!world.app_exists("s1"));

        let _ = reconcile(Arc::new(before_create), ctx.clone()).await;
        assert_eq!(world.apps_created(), 1);
        assert!(!world.app_exists("s1"));
        assert!(conditions(&world.scan("s1").unwrap()).is_completed());
    }

    /// Highest state observed so far for one scan
    #[derive(Default)]
    struct HighWater {
        created: CreatedState,
        completed: CompletedState,
    }

    impl HighWater {
        fn observe(&mut self, scan: &ClusterScan, seed: u64) {
            let c = conditions(scan);
            assert!(
                c.created() >= self.created,
                "seed {seed}: Created regressed from {} to {}",
                self.created,
                c.created()
            );
            assert!(
                c.completed() >= self.completed,
                "seed {seed}: Completed regressed from {} to {}",
                self.completed,
                c.completed()
            );
            self.created = c.created();
            self.completed = c.completed();
        }
    }

    /// Random interleavings of redelivered, stale and duplicated events,
    /// cluster readiness flaps, foreign claims, runner completion, deletion
    /// and injected failures. Every step must keep the lifecycle invariants
    /// and, once the noise stops, the world must converge.
    #[tokio::test]
    async fn fuzz_duplicate_and_out_of_order_events() {
        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let world = FakeWorld::new(seed);
            world.add_cluster("c1", rng.gen_bool(0.5));
            if rng.gen_bool(0.5) {
                world.claim("c1", Some("s1"));
            }
            world.create_scan("s1", "c1");
            let ctx = Arc::new(ScanContext::for_testing(world.handler()));

            // The claim above is only released through the finalizer path
            deliver(&ctx, &world, "s1").await;
            world.set_fail_rate(0.15);

            let mut history: Vec<ClusterScan> = Vec::new();
            let mut high_water = HighWater::default();
            let mut deleted = false;

            for _ in 0..60 {
                match rng.gen_range(0..10) {
                    0..=2 => deliver(&ctx, &world, "s1").await,
                    3 => {
                        // Duplicate delivery of the same observation
                        if let Some(scan) = world.scan("s1") {
                            let scan = Arc::new(scan);
                            let _ = reconcile(scan.clone(), ctx.clone()).await;
                            let _ = reconcile(scan, ctx.clone()).await;
                        }
                    }
                    4 => {
                        // Out-of-order delivery of an older observation
                        if !history.is_empty() {
                            let pick = history[rng.gen_range(0..history.len())].clone();
                            let _ = reconcile(Arc::new(pick), ctx.clone()).await;
                        }
                    }
                    5 => world.set_ready("c1", rng.gen_bool(0.7)),
                    6 => world.runner_finishes("s1"),
                    7 => {
                        let owner = if rng.gen_bool(0.5) { Some("s2") } else { None };
                        world.claim("c1", owner);
                    }
                    8 if rng.gen_bool(0.3) => {
                        world.delete_scan("s1");
                        deleted = true;
                    }
                    _ => deliver(&ctx, &world, "s1").await,
                }

                if let Some(scan) = world.scan("s1") {
                    high_water.observe(&scan, seed);
                    history.push(scan);
                }
                assert_eq!(
                    world.installs_on_unready(),
                    0,
                    "seed {seed}: install on a cluster that wasn't ready"
                );
                assert!(
                    world.apps_created() <= 1,
                    "seed {seed}: runner installed more than once"
                );
                assert!(
                    world
                        .claim_writes()
                        .iter()
                        .all(|(_, previous)| previous.as_deref() == Some("s1")),
                    "seed {seed}: a claim not held by s1 was written"
                );
            }

            // Quiesce: no failures, cluster ready, keep reconciling the latest state
            world.set_fail_rate(0.0);
            world.set_ready("c1", true);
            for _ in 0..10 {
                deliver(&ctx, &world, "s1").await;
            }

            if deleted {
                assert!(world.scan("s1").is_none(), "seed {seed}: scan stuck deleting");
                assert!(!world.app_exists("s1"), "seed {seed}: runner leaked");
                assert!(!world.artifact_exists("s1"), "seed {seed}: artifact leaked");
                assert_ne!(world.owner("c1").as_deref(), Some("s1"), "seed {seed}");
                continue;
            }

            let scan = world.scan("s1").expect("undeleted scan exists");
            high_water.observe(&scan, seed);
            let c = conditions(&scan);
            assert!(c.is_created(), "seed {seed}: scan never deployed");
            if c.completed() == CompletedState::Unknown {
                assert!(world.app_exists("s1"), "seed {seed}: running scan lost its runner");
            } else {
                assert!(c.is_completed(), "seed {seed}: teardown never finished");
                assert!(!world.app_exists("s1"), "seed {seed}: runner outlived the scan");
                assert_ne!(world.owner("c1").as_deref(), Some("s1"), "seed {seed}");
            }
        }
    }
}
