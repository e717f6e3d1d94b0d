//! Grouped, immutable view of everything ingested at one epoch.

use std::collections::{BTreeMap, BTreeSet};

use fleetscope_apps::{
    application_type_counts, get_app_child_resources, get_app_set_related_resources, get_application_repos,
    get_cluster_list, AppTypeCounts, ChildResource, RepoDescriptor, SharedChildResource,
};
use fleetscope_core::{
    Application, ApplicationSet, ArgoApplication, Channel, ClusterView, DecodeError, FleetResource, ManagedClusterAddOn, Placement,
    PlacementDecision, PlacementRule, PolicyReport, Resource, ResourceKind, Subscription, LOCAL_CLUSTER,
};
use fleetscope_dashboard::{
    label_options, risk_buckets, risk_buckets_by_cluster, summarize_addons, summarize_clusters, AddonSummary,
    ClusterSummary, RiskBuckets,
};
use tracing::warn;

/// Decode `raw`, keeping a shape mismatch as [`FleetResource::Other`].
/// Objects without a kind are dropped.
pub fn decode_lenient(raw: serde_json::Value) -> Option<FleetResource> {
    match FleetResource::decode(raw.clone()) {
        Ok(r) => Some(r),
        Err(DecodeError::MissingKind) => {
            warn!(key = %fleetscope_core::store_key(&raw), "object without kind dropped");
            metrics::counter!("decode_errors_total", 1u64);
            None
        }
        Err(err) => {
            warn!(error = %err, "undecodable object");
            metrics::counter!("decode_errors_total", 1u64);
            serde_json::from_value::<Resource>(raw).ok().map(FleetResource::Other)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub epoch: u64,
    objects: Vec<FleetResource>,
    applications: Vec<Application>,
    argo_applications: Vec<ArgoApplication>,
    application_sets: Vec<ApplicationSet>,
    subscriptions: Vec<Subscription>,
    channels: Vec<Channel>,
    placement_rules: Vec<PlacementRule>,
    placements: Vec<Placement>,
    placement_decisions: Vec<PlacementDecision>,
    clusters: Vec<ClusterView>,
    addons: Vec<ManagedClusterAddOn>,
    policy_reports: Vec<PolicyReport>,
    hub: Option<ClusterView>,
}

impl Inventory {
    pub fn from_resources(resources: impl IntoIterator<Item = FleetResource>) -> Self {
        let mut inv = Self::default();
        for r in resources {
            inv.push(r);
        }
        inv
    }

    pub fn from_values(values: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Self::from_resources(values.into_iter().filter_map(decode_lenient))
    }

    pub fn push(&mut self, resource: FleetResource) {
        match &resource {
            FleetResource::Application(o) => self.applications.push(o.clone()),
            FleetResource::ArgoApplication(o) => self.argo_applications.push(o.clone()),
            FleetResource::ApplicationSet(o) => self.application_sets.push(o.clone()),
            FleetResource::Subscription(o) => self.subscriptions.push(o.clone()),
            FleetResource::Channel(o) => self.channels.push(o.clone()),
            FleetResource::PlacementRule(o) => self.placement_rules.push(o.clone()),
            FleetResource::Placement(o) => self.placements.push(o.clone()),
            FleetResource::PlacementDecision(o) => self.placement_decisions.push(o.clone()),
            FleetResource::ManagedCluster(o) => self.clusters.push(ClusterView::from(o)),
            FleetResource::ManagedClusterAddOn(o) => self.addons.push(o.clone()),
            FleetResource::PolicyReport(o) => self.policy_reports.push(o.clone()),
            FleetResource::Workload(_) | FleetResource::Other(_) => {}
        }
        self.objects.push(resource);
    }

    /// Override the hub console URL used by the Argo locality check.
    pub fn set_hub_console_url(&mut self, url: &str) {
        let base = self.clusters.iter().find(|c| c.is_local).cloned().unwrap_or_else(|| ClusterView::named(LOCAL_CLUSTER));
        self.hub = Some(base.with_console_url(url));
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[FleetResource] {
        &self.objects
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn argo_applications(&self) -> &[ArgoApplication] {
        &self.argo_applications
    }

    pub fn application_sets(&self) -> &[ApplicationSet] {
        &self.application_sets
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn placement_rules(&self) -> &[PlacementRule] {
        &self.placement_rules
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn placement_decisions(&self) -> &[PlacementDecision] {
        &self.placement_decisions
    }

    pub fn clusters(&self) -> &[ClusterView] {
        &self.clusters
    }

    pub fn addons(&self) -> &[ManagedClusterAddOn] {
        &self.addons
    }

    pub fn policy_reports(&self) -> &[PolicyReport] {
        &self.policy_reports
    }

    /// The hub's own cluster: the explicit override, else the managed cluster
    /// named or labelled as local.
    pub fn local_cluster(&self) -> Option<&ClusterView> {
        self.hub.as_ref().or_else(|| self.clusters.iter().find(|c| c.is_local))
    }

    /// Objects of `kind` named `name` in `namespace`. An empty namespace matches cluster-scoped objects.
    pub fn find(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<&FleetResource> {
        self.objects.iter().find(|o| o.kind() == kind && o.metadata().is(namespace, name))
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.objects.iter().filter(|o| o.kind() == kind).count()
    }

    pub fn application_repos(&self, resource: &FleetResource) -> Option<Vec<RepoDescriptor>> {
        get_application_repos(resource, &self.subscriptions, &self.channels)
    }

    pub fn cluster_list(&self, resource: &FleetResource) -> Vec<String> {
        get_cluster_list(
            resource,
            &self.argo_applications,
            &self.placement_decisions,
            &self.subscriptions,
            self.local_cluster(),
            &self.clusters,
        )
    }

    pub fn child_resources(&self, app: &Application) -> (Vec<ChildResource>, Vec<SharedChildResource>) {
        get_app_child_resources(
            app,
            &self.applications,
            &self.subscriptions,
            &self.placement_rules,
            &self.placements,
            &self.channels,
        )
    }

    pub fn app_set_related(&self, app_set: &ApplicationSet) -> (String, Vec<String>) {
        get_app_set_related_resources(app_set, &self.application_sets)
    }

    pub fn type_counts(&self) -> AppTypeCounts {
        application_type_counts(&self.objects)
    }

    pub fn cluster_summary(&self) -> ClusterSummary {
        summarize_clusters(&self.clusters)
    }

    pub fn addon_summary(&self) -> AddonSummary {
        summarize_addons(&self.addons)
    }

    pub fn policy_risk(&self) -> RiskBuckets {
        risk_buckets(&self.policy_reports)
    }

    pub fn policy_risk_by_cluster(&self) -> Vec<(String, RiskBuckets)> {
        risk_buckets_by_cluster(&self.policy_reports)
    }

    /// Label keys and values offered by the cluster filter.
    pub fn cluster_label_options(&self) -> BTreeMap<String, BTreeSet<String>> {
        label_options(&self.clusters)
    }

    /// Publish per-kind object counts.
    pub fn record_gauges(&self) {
        for kind in [
            ResourceKind::Application,
            ResourceKind::ArgoApplication,
            ResourceKind::ApplicationSet,
            ResourceKind::Subscription,
            ResourceKind::Channel,
            ResourceKind::PlacementRule,
            ResourceKind::Placement,
            ResourceKind::PlacementDecision,
            ResourceKind::ManagedCluster,
            ResourceKind::ManagedClusterAddOn,
            ResourceKind::PolicyReport,
            ResourceKind::Workload,
            ResourceKind::Other,
        ] {
            metrics::gauge!("inventory_objects", self.count(kind) as f64, "kind" => kind.as_str());
        }
    }
}
