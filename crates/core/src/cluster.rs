//! Flattened view of a managed cluster used by placement and dashboard code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::kinds::ManagedCluster;
use crate::{LOCAL_CLUSTER, LOCAL_CLUSTER_LABEL};

const CONSOLE_URL_CLAIM: &str = "consoleurl.cluster.open-cluster-management.io";
const AVAILABLE_CONDITION: &str = "ManagedClusterConditionAvailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterStatus {
    Ready,
    Offline,
    Unknown,
    PendingImport,
    NotAccepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterView {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub status: ClusterStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_api_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_url: Option<String>,
    pub is_managed: bool,
    pub is_local: bool,
}

impl ClusterView {
    /// Minimal view, mostly for callers that only know a name and API server.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            labels: BTreeMap::new(),
            status: ClusterStatus::Unknown,
            kube_api_server: None,
            console_url: None,
            is_managed: false,
            is_local: name == LOCAL_CLUSTER,
        }
    }

    pub fn with_api_server(mut self, url: &str) -> Self {
        self.kube_api_server = Some(url.to_string());
        self
    }

    pub fn with_console_url(mut self, url: &str) -> Self {
        self.console_url = Some(url.to_string());
        self
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self.is_local = self.is_local || (key == LOCAL_CLUSTER_LABEL && value == "true");
        self
    }
}

impl From<&ManagedCluster> for ClusterView {
    fn from(mc: &ManagedCluster) -> Self {
        let status = if !mc.spec.hub_accepts_client {
            ClusterStatus::NotAccepted
        } else {
            match mc.status.condition(AVAILABLE_CONDITION).map(|c| c.status.as_str()) {
                Some("True") => ClusterStatus::Ready,
                Some("False") => ClusterStatus::Offline,
                Some(_) => ClusterStatus::Unknown,
                None => ClusterStatus::PendingImport,
            }
        };
        let is_local =
            mc.metadata.name == LOCAL_CLUSTER || mc.metadata.label(LOCAL_CLUSTER_LABEL) == Some("true");
        Self {
            name: mc.metadata.name.clone(),
            labels: mc.metadata.labels.clone(),
            status,
            kube_api_server: mc.spec.managed_cluster_client_configs.first().map(|c| c.url.clone()).filter(|u| !u.is_empty()),
            console_url: mc
                .status
                .cluster_claims
                .iter()
                .find(|c| c.name == CONSOLE_URL_CLAIM)
                .map(|c| c.value.clone()),
            is_managed: true,
            is_local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FleetResource;
    use serde_json::json;

    fn decode(v: serde_json::Value) -> ManagedCluster {
        match FleetResource::decode(v).unwrap() {
            FleetResource::ManagedCluster(mc) => mc,
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn view_from_managed_cluster() {
        let mc = decode(json!({
            "apiVersion": "cluster.open-cluster-management.io/v1",
            "kind": "ManagedCluster",
            "metadata": {"name": "hub", "labels": {"local-cluster": "true", "region": "us-east-1"}},
            "spec": {"hubAcceptsClient": true, "managedClusterClientConfigs": [{"url": "https://api.hub.example.com:6443"}]},
            "status": {
                "conditions": [{"type": "ManagedClusterConditionAvailable", "status": "True"}],
                "clusterClaims": [{"name": "consoleurl.cluster.open-cluster-management.io", "value": "https://console.apps.hub.example.com"}],
            },
        }));
        let view = ClusterView::from(&mc);
        assert!(view.is_local);
        assert_eq!(view.status, ClusterStatus::Ready);
        assert_eq!(view.kube_api_server.as_deref(), Some("https://api.hub.example.com:6443"));
        assert_eq!(view.console_url.as_deref(), Some("https://console.apps.hub.example.com"));
    }

    #[test]
    fn status_derivation() {
        let base = |spec: serde_json::Value, status: serde_json::Value| {
            ClusterView::from(&decode(json!({
                "apiVersion": "cluster.open-cluster-management.io/v1",
                "kind": "ManagedCluster",
                "metadata": {"name": "c1"},
                "spec": spec,
                "status": status,
            })))
            .status
        };
        assert_eq!(base(json!({}), json!({})), ClusterStatus::NotAccepted);
        assert_eq!(base(json!({"hubAcceptsClient": true}), json!({})), ClusterStatus::PendingImport);
        assert_eq!(
            base(json!({"hubAcceptsClient": true}), json!({"conditions": [{"type": "ManagedClusterConditionAvailable", "status": "False"}]})),
            ClusterStatus::Offline
        );
        assert_eq!(
            base(json!({"hubAcceptsClient": true}), json!({"conditions": [{"type": "ManagedClusterConditionAvailable", "status": "Unknown"}]})),
            ClusterStatus::Unknown
        );
    }
}
