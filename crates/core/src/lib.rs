//! Fleetscope core types: resource envelope, decoded kinds and typed references.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod cluster;
pub mod kinds;
pub mod refs;
pub mod resource;

pub use cluster::{ClusterStatus, ClusterView};
pub use kinds::*;
pub use refs::{NamespacedRef, SubscriptionRef, SubscriptionRefs};
pub use resource::{DecodeError, FleetResource, Object, ObjectMeta, OwnerReference, Resource, ResourceKind};

/// Name the hub reserves for its own cluster.
pub const LOCAL_CLUSTER: &str = "local-cluster";
/// Label marking the hub's own cluster when it was imported under another name.
pub const LOCAL_CLUSTER_LABEL: &str = "local-cluster";
/// Suffix of the hub-generated shadow subscription.
pub const LOCAL_SUFFIX: &str = "-local";
/// Argo's symbolic name for the cluster it runs in.
pub const IN_CLUSTER: &str = "in-cluster";
/// In-cluster API server address used by Argo destinations.
pub const KUBE_DEFAULT_SVC: &str = "https://kubernetes.default.svc";

pub mod annotations {
    pub const SUBSCRIPTIONS: &str = "apps.open-cluster-management.io/subscriptions";
    pub const HOSTING_SUBSCRIPTION: &str = "apps.open-cluster-management.io/hosting-subscription";
    pub const HOSTING_DEPLOYABLE: &str = "apps.open-cluster-management.io/hosting-deployable";
    pub const GIT_BRANCH: &str = "apps.open-cluster-management.io/git-branch";
    pub const GIT_PATH: &str = "apps.open-cluster-management.io/git-path";
    pub const GITHUB_BRANCH: &str = "apps.open-cluster-management.io/github-branch";
    pub const GITHUB_PATH: &str = "apps.open-cluster-management.io/github-path";
}

pub mod labels {
    pub const PLACEMENT: &str = "cluster.open-cluster-management.io/placement";
    pub const PLACEMENT_RULE: &str = "cluster.open-cluster-management.io/placementrule";
    pub const REGION: &str = "region";
    pub const FLUX_KUSTOMIZATION: &str = "kustomize.toolkit.fluxcd.io/name";
    pub const FLUX_HELM: &str = "helm.toolkit.fluxcd.io/name";
}

pub mod groups {
    pub const APP_K8S: &str = "app.k8s.io";
    pub const ARGO: &str = "argoproj.io";
    pub const OCM_APPS: &str = "apps.open-cluster-management.io";
    pub const OCM_CLUSTER: &str = "cluster.open-cluster-management.io";
    pub const OCM_ADDON: &str = "addon.open-cluster-management.io";
    pub const POLICY_REPORT: &str = "wgpolicyk8s.io";
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeltaKind {
    Applied,
    Deleted,
}

/// A single change observed on the backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    /// Store key, see [`store_key`].
    pub key: String,
    pub kind: DeltaKind,
    pub raw: serde_json::Value,
}

impl Delta {
    pub fn applied(raw: serde_json::Value) -> Self {
        Self { key: store_key(&raw), kind: DeltaKind::Applied, raw }
    }

    pub fn deleted(raw: serde_json::Value) -> Self {
        Self { key: store_key(&raw), kind: DeltaKind::Deleted, raw }
    }

    /// Deletion known only by key, e.g. an object that vanished across a relist.
    pub fn tombstone(key: String) -> Self {
        Self { key, kind: DeltaKind::Deleted, raw: serde_json::Value::Null }
    }
}

/// Key identifying a raw object across kinds: `metadata.uid` when present,
/// else `apiVersion/kind/namespace/name`.
pub fn store_key(raw: &serde_json::Value) -> String {
    if let Some(uid) = raw.pointer("/metadata/uid").and_then(|v| v.as_str()) {
        if !uid.is_empty() {
            return uid.to_string();
        }
    }
    let api_version = raw.get("apiVersion").and_then(|v| v.as_str()).unwrap_or("");
    let kind = raw.get("kind").and_then(|v| v.as_str()).unwrap_or("");
    let ns = raw.pointer("/metadata/namespace").and_then(|v| v.as_str()).unwrap_or("");
    let name = raw.pointer("/metadata/name").and_then(|v| v.as_str()).unwrap_or("");
    format!("{}/{}/{}/{}", api_version, kind, ns, name)
}

pub mod prelude {
    pub use super::{
        ClusterView, Delta, DeltaKind, FleetResource, NamespacedRef, ObjectMeta, Resource, ResourceKind,
        SubscriptionRef, LOCAL_CLUSTER,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_key_prefers_uid() {
        let raw = serde_json::json!({"apiVersion": "v1", "kind": "X", "metadata": {"name": "a", "uid": "u-1"}});
        assert_eq!(store_key(&raw), "u-1");
        let raw = serde_json::json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "a", "namespace": "ns"}});
        assert_eq!(store_key(&raw), "apps/v1/Deployment/ns/a");
    }
}
