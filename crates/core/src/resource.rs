//! Generic Kubernetes-style envelope and the decoded tagged union over known kinds.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::groups;
use crate::kinds::{
    Application, ApplicationSet, ArgoApplication, Channel, ManagedCluster, ManagedClusterAddOn, Placement,
    PlacementDecision, PlacementRule, PolicyReport, Subscription, Workload,
};

/// Treat an explicit JSON `null` the same as a missing field.
pub(crate) fn nullable<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self { name: name.to_string(), namespace: namespace.map(|s| s.to_string()), ..Default::default() }
    }

    /// Namespace, or empty for cluster-scoped objects.
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(|s| s.as_str())
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(|s| s.as_str())
    }

    /// Same name and namespace.
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace() == namespace
    }

    /// Identity key: `uid` when present, else `namespace/name`.
    pub fn key(&self) -> String {
        match (&self.uid, &self.namespace) {
            (Some(uid), _) if !uid.is_empty() => uid.clone(),
            (_, Some(ns)) => format!("{}/{}", ns, self.name),
            (_, None) => self.name.clone(),
        }
    }
}

/// A Kubernetes-style object with typed `spec` and `status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(
        serialize = "S: Serialize, T: Serialize",
        deserialize = "S: Deserialize<'de> + Default, T: Deserialize<'de> + Default"
    )
)]
pub struct Object<S, T = serde_json::Value> {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, deserialize_with = "nullable")]
    pub spec: S,
    #[serde(default, deserialize_with = "nullable")]
    pub status: T,
}

impl<S, T> Object<S, T> {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        self.metadata.namespace()
    }

    /// API group of `apiVersion` (empty for the core group).
    pub fn group(&self) -> &str {
        api_group(&self.api_version)
    }
}

/// Untyped envelope.
pub type Resource = Object<serde_json::Value, serde_json::Value>;

fn api_group(api_version: &str) -> &str {
    api_version.rsplit_once('/').map(|(g, _)| g).unwrap_or("")
}

/// Known resource kinds, classified from `(group, kind)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Application,
    ArgoApplication,
    ApplicationSet,
    Subscription,
    Channel,
    PlacementRule,
    Placement,
    PlacementDecision,
    ManagedCluster,
    ManagedClusterAddOn,
    PolicyReport,
    Workload,
    Other,
}

/// Workload kinds surfaced as applications; matched by kind regardless of group.
pub const WORKLOAD_KINDS: [&str; 6] = ["CronJob", "DaemonSet", "Deployment", "DeploymentConfig", "Job", "StatefulSet"];

impl ResourceKind {
    pub fn classify(api_version: &str, kind: &str) -> Self {
        match (api_group(api_version), kind) {
            (groups::APP_K8S, "Application") => Self::Application,
            (groups::ARGO, "Application") => Self::ArgoApplication,
            (groups::ARGO, "ApplicationSet") => Self::ApplicationSet,
            (groups::OCM_APPS, "Subscription") => Self::Subscription,
            (groups::OCM_APPS, "Channel") => Self::Channel,
            (groups::OCM_APPS, "PlacementRule") => Self::PlacementRule,
            (groups::OCM_CLUSTER, "Placement") => Self::Placement,
            (groups::OCM_CLUSTER, "PlacementDecision") => Self::PlacementDecision,
            (groups::OCM_CLUSTER, "ManagedCluster") => Self::ManagedCluster,
            (groups::OCM_ADDON, "ManagedClusterAddOn") => Self::ManagedClusterAddOn,
            (groups::POLICY_REPORT, "PolicyReport") => Self::PolicyReport,
            (_, k) if WORKLOAD_KINDS.contains(&k) => Self::Workload,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "Application",
            Self::ArgoApplication => "ArgoApplication",
            Self::ApplicationSet => "ApplicationSet",
            Self::Subscription => "Subscription",
            Self::Channel => "Channel",
            Self::PlacementRule => "PlacementRule",
            Self::Placement => "Placement",
            Self::PlacementDecision => "PlacementDecision",
            Self::ManagedCluster => "ManagedCluster",
            Self::ManagedClusterAddOn => "ManagedClusterAddOn",
            Self::PolicyReport => "PolicyReport",
            Self::Workload => "Workload",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("object has no kind")]
    MissingKind,
    #[error("{kind} {name}: {source}")]
    Shape {
        kind: ResourceKind,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A raw object decoded into its typed form.
#[derive(Debug, Clone, PartialEq)]
pub enum FleetResource {
    Application(Application),
    ArgoApplication(ArgoApplication),
    ApplicationSet(ApplicationSet),
    Subscription(Subscription),
    Channel(Channel),
    PlacementRule(PlacementRule),
    Placement(Placement),
    PlacementDecision(PlacementDecision),
    ManagedCluster(ManagedCluster),
    ManagedClusterAddOn(ManagedClusterAddOn),
    PolicyReport(PolicyReport),
    Workload(Workload),
    Other(Resource),
}

fn typed<T: DeserializeOwned>(kind: ResourceKind, raw: serde_json::Value) -> Result<T, DecodeError> {
    let name = raw.pointer("/metadata/name").and_then(|v| v.as_str()).unwrap_or("").to_string();
    serde_json::from_value(raw).map_err(|source| DecodeError::Shape { kind, name, source })
}

impl FleetResource {
    pub fn decode(raw: serde_json::Value) -> Result<Self, DecodeError> {
        let kind = raw.get("kind").and_then(|v| v.as_str()).ok_or(DecodeError::MissingKind)?;
        let api_version = raw.get("apiVersion").and_then(|v| v.as_str()).unwrap_or("");
        let rk = ResourceKind::classify(api_version, kind);
        Ok(match rk {
            ResourceKind::Application => Self::Application(typed(rk, raw)?),
            ResourceKind::ArgoApplication => Self::ArgoApplication(typed(rk, raw)?),
            ResourceKind::ApplicationSet => Self::ApplicationSet(typed(rk, raw)?),
            ResourceKind::Subscription => Self::Subscription(typed(rk, raw)?),
            ResourceKind::Channel => Self::Channel(typed(rk, raw)?),
            ResourceKind::PlacementRule => Self::PlacementRule(typed(rk, raw)?),
            ResourceKind::Placement => Self::Placement(typed(rk, raw)?),
            ResourceKind::PlacementDecision => Self::PlacementDecision(typed(rk, raw)?),
            ResourceKind::ManagedCluster => Self::ManagedCluster(typed(rk, raw)?),
            ResourceKind::ManagedClusterAddOn => Self::ManagedClusterAddOn(typed(rk, raw)?),
            ResourceKind::PolicyReport => Self::PolicyReport(typed(rk, raw)?),
            ResourceKind::Workload => Self::Workload(typed(rk, raw)?),
            ResourceKind::Other => Self::Other(typed(rk, raw)?),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Application(_) => ResourceKind::Application,
            Self::ArgoApplication(_) => ResourceKind::ArgoApplication,
            Self::ApplicationSet(_) => ResourceKind::ApplicationSet,
            Self::Subscription(_) => ResourceKind::Subscription,
            Self::Channel(_) => ResourceKind::Channel,
            Self::PlacementRule(_) => ResourceKind::PlacementRule,
            Self::Placement(_) => ResourceKind::Placement,
            Self::PlacementDecision(_) => ResourceKind::PlacementDecision,
            Self::ManagedCluster(_) => ResourceKind::ManagedCluster,
            Self::ManagedClusterAddOn(_) => ResourceKind::ManagedClusterAddOn,
            Self::PolicyReport(_) => ResourceKind::PolicyReport,
            Self::Workload(_) => ResourceKind::Workload,
            Self::Other(_) => ResourceKind::Other,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Application(o) => &o.metadata,
            Self::ArgoApplication(o) => &o.metadata,
            Self::ApplicationSet(o) => &o.metadata,
            Self::Subscription(o) => &o.metadata,
            Self::Channel(o) => &o.metadata,
            Self::PlacementRule(o) => &o.metadata,
            Self::Placement(o) => &o.metadata,
            Self::PlacementDecision(o) => &o.metadata,
            Self::ManagedCluster(o) => &o.metadata,
            Self::ManagedClusterAddOn(o) => &o.metadata,
            Self::PolicyReport(o) => &o.metadata,
            Self::Workload(o) => &o.metadata,
            Self::Other(o) => &o.metadata,
        }
    }
}
