//! Typed `spec`/`status` shapes for the kinds the aggregation layer reads.
//!
//! Every field defaults, so partially populated objects decode cleanly and
//! missing data shows up as `None`/empty rather than as an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::labels;
use crate::resource::{nullable, Object, ObjectMeta};

/// Subscription-based application (`app.k8s.io`). Its relations live in annotations.
pub type Application = Object<serde_json::Value>;
pub type Subscription = Object<SubscriptionSpec>;
pub type Channel = Object<ChannelSpec>;
pub type PlacementRule = Object<serde_json::Value, PlacementDecisionStatus>;
pub type Placement = Object<serde_json::Value>;
pub type PlacementDecision = Object<serde_json::Value, PlacementDecisionStatus>;
pub type ArgoApplication = Object<ArgoApplicationSpec, ArgoApplicationStatus>;
pub type ApplicationSet = Object<ApplicationSetSpec>;
pub type ManagedCluster = Object<ManagedClusterSpec, ConditionStatus<ClusterClaim>>;
pub type ManagedClusterAddOn = Object<serde_json::Value, ConditionStatus<serde_json::Value>>;
pub type Workload = Object<serde_json::Value, WorkloadStatus>;

// ---- Subscription / Channel ----

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionSpec {
    /// `namespace/name` of the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Package name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_filter: Option<PackageFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<SubscriptionPlacement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionPlacement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement_ref: Option<PlacementRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacementRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementKind {
    PlacementRule,
    Placement,
}

impl PlacementRef {
    /// Kind discriminator; anything other than the two placement kinds is `None`.
    pub fn placement_kind(&self) -> Option<PlacementKind> {
        match self.kind.as_deref() {
            Some("PlacementRule") => Some(PlacementKind::PlacementRule),
            Some("Placement") => Some(PlacementKind::Placement),
            _ => None,
        }
    }
}

impl SubscriptionSpec {
    pub fn placement_ref(&self) -> Option<&PlacementRef> {
        self.placement.as_ref().and_then(|p| p.placement_ref.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSpec {
    /// Raw channel type (`git`, `GitHub`, `helmrepo`, `namespace`, `objectbucket`, ...).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pathname: Option<String>,
}

// ---- Placement decisions ----

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacementDecisionStatus {
    #[serde(deserialize_with = "nullable")]
    pub decisions: Vec<ClusterDecision>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterDecision {
    pub cluster_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ---- Argo ----

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArgoApplicationSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<ArgoDestination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ArgoSource>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<ArgoSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArgoDestination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArgoSource {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_revision: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArgoApplicationStatus {
    /// Set only on records pulled from a managed cluster.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationSetSpec {
    #[serde(deserialize_with = "nullable")]
    pub generators: Vec<AppSetGenerator>,
    pub template: AppSetTemplate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSetTemplate {
    pub metadata: ObjectMeta,
    pub spec: ArgoApplicationSpec,
}

/// One entry of `spec.generators`. Only the cluster-decision-resource generator
/// is read; other generator types are kept opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSetGenerator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_decision_resource: Option<ClusterDecisionResource>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterDecisionResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map_ref: Option<String>,
    pub label_selector: LabelSelector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requeue_after_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelSelector {
    #[serde(deserialize_with = "nullable")]
    pub match_labels: BTreeMap<String, String>,
}

impl AppSetGenerator {
    /// Placement this generator draws cluster decisions from.
    pub fn placement_name(&self) -> Option<&str> {
        self.cluster_decision_resource
            .as_ref()
            .and_then(|c| c.label_selector.match_labels.get(labels::PLACEMENT))
            .map(|s| s.as_str())
    }
}

impl ApplicationSetSpec {
    /// Placement referenced by the first generator, if any.
    pub fn placement_name(&self) -> Option<&str> {
        self.generators.first().and_then(|g| g.placement_name()).filter(|s| !s.is_empty())
    }
}

// ---- Clusters and addons ----

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedClusterSpec {
    #[serde(deserialize_with = "nullable")]
    pub managed_cluster_client_configs: Vec<ClientConfig>,
    pub hub_accepts_client: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterClaim {
    pub name: String,
    pub value: String,
}

/// Status block with conditions and, for clusters, claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    default,
    bound(serialize = "C: Serialize", deserialize = "C: Deserialize<'de> + Default")
)]
pub struct ConditionStatus<C> {
    #[serde(deserialize_with = "nullable")]
    pub conditions: Vec<Condition>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub cluster_claims: Vec<C>,
}

impl<C> ConditionStatus<C> {
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.condition_type == condition_type)
    }

    /// True iff the condition exists with status `True`.
    pub fn is_true(&self, condition_type: &str) -> bool {
        self.condition(condition_type).map(|c| c.status == "True").unwrap_or(false)
    }
}

// ---- Policy reports ----

/// `wgpolicyk8s.io` PolicyReport. Results sit at the top level, not under `spec`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyReport {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(deserialize_with = "nullable")]
    pub results: Vec<PolicyReportResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyReportResult {
    pub policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl PolicyReportResult {
    /// `properties.total_risk`, accepted as a number or numeric string.
    pub fn total_risk(&self) -> Option<u8> {
        match self.properties.get("total_risk")? {
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u8::try_from(v).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

// ---- Workloads ----

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadStatus {
    /// Cluster the object was collected from (search-sourced records).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FleetResource;
    use serde_json::json;

    #[test]
    fn appset_placement_reads_first_generator_only() {
        let raw = json!({
            "apiVersion": "argoproj.io/v1alpha1",
            "kind": "ApplicationSet",
            "metadata": {"name": "set", "namespace": "openshift-gitops"},
            "spec": {
                "generators": [
                    {"list": {"elements": []}},
                    {"clusterDecisionResource": {"labelSelector": {"matchLabels": {"cluster.open-cluster-management.io/placement": "p1"}}}},
                ],
            },
        });
        let FleetResource::ApplicationSet(set) = FleetResource::decode(raw).unwrap() else { panic!() };
        assert_eq!(set.spec.placement_name(), None);
        assert!(set.spec.generators[0].other.contains_key("list"));
        assert_eq!(set.spec.generators[1].placement_name(), Some("p1"));
    }

    #[test]
    fn total_risk_accepts_strings_and_numbers() {
        let r: PolicyReportResult = serde_json::from_value(json!({"policy": "a", "properties": {"total_risk": "3"}})).unwrap();
        assert_eq!(r.total_risk(), Some(3));
        let r: PolicyReportResult = serde_json::from_value(json!({"policy": "a", "properties": {"total_risk": 4}})).unwrap();
        assert_eq!(r.total_risk(), Some(4));
        let r: PolicyReportResult = serde_json::from_value(json!({"policy": "a", "properties": {"total_risk": "high"}})).unwrap();
        assert_eq!(r.total_risk(), None);
    }

    #[test]
    fn placement_kind_is_discriminated() {
        let r = PlacementRef { name: "p".into(), kind: Some("PlacementRule".into()) };
        assert_eq!(r.placement_kind(), Some(PlacementKind::PlacementRule));
        let r = PlacementRef { name: "p".into(), kind: Some("ClusterSet".into()) };
        assert_eq!(r.placement_kind(), None);
    }
}
