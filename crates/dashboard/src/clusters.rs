//! Cluster label filtering and status summaries for the overview page.

use std::collections::{BTreeMap, BTreeSet};

use fleetscope_core::{labels, ClusterStatus, ClusterView, ManagedClusterAddOn};
use serde::{Deserialize, Serialize};

/// Synthetic region value for clusters without a `region` label.
pub const OTHER_REGION: &str = "Other";

/// Selected values per label key.
pub type LabelSelection = BTreeMap<String, Vec<String>>;

fn label_value<'a>(cluster: &'a ClusterView, key: &str) -> Option<&'a str> {
    match cluster.labels.get(key) {
        Some(v) => Some(v.as_str()),
        None if key == labels::REGION => Some(OTHER_REGION),
        None => None,
    }
}

/// Clusters matching `selection`.
///
/// A cluster matches when, for at least one key, its value is among the
/// selected ones. Keys are ORed, not ANDed. An empty selection keeps everything.
pub fn filter_clusters<'a>(clusters: &'a [ClusterView], selection: &LabelSelection) -> Vec<&'a ClusterView> {
    let active: Vec<(&String, &Vec<String>)> = selection.iter().filter(|(_, values)| !values.is_empty()).collect();
    if active.is_empty() {
        return clusters.iter().collect();
    }
    clusters
        .iter()
        .filter(|cluster| {
            active.iter().any(|(key, values)| {
                label_value(cluster, key).map(|v| values.iter().any(|s| s == v)).unwrap_or(false)
            })
        })
        .collect()
}

/// Every label key seen on `clusters` with its distinct values, sorted.
/// `region` always offers [`OTHER_REGION`] when some cluster lacks the label.
pub fn label_options(clusters: &[ClusterView]) -> BTreeMap<String, BTreeSet<String>> {
    let mut options: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for cluster in clusters {
        for (k, v) in &cluster.labels {
            options.entry(k.clone()).or_default().insert(v.clone());
        }
        if !cluster.labels.contains_key(labels::REGION) {
            options.entry(labels::REGION.to_string()).or_default().insert(OTHER_REGION.to_string());
        }
    }
    options
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub total: usize,
    pub ready: usize,
    pub offline: usize,
    pub unknown: usize,
}

/// Pending imports and unaccepted clusters count as unknown.
pub fn summarize_clusters<'a>(clusters: impl IntoIterator<Item = &'a ClusterView>) -> ClusterSummary {
    let mut s = ClusterSummary::default();
    for c in clusters {
        s.total += 1;
        match c.status {
            ClusterStatus::Ready => s.ready += 1,
            ClusterStatus::Offline => s.offline += 1,
            ClusterStatus::Unknown | ClusterStatus::PendingImport | ClusterStatus::NotAccepted => s.unknown += 1,
        }
    }
    s
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSummary {
    pub available: usize,
    pub degraded: usize,
    pub progressing: usize,
    pub unknown: usize,
}

/// Degraded wins over Progressing, which wins over Available.
pub fn summarize_addons(addons: &[ManagedClusterAddOn]) -> AddonSummary {
    let mut s = AddonSummary::default();
    for addon in addons {
        if addon.status.is_true("Degraded") {
            s.degraded += 1;
        } else if addon.status.is_true("Progressing") {
            s.progressing += 1;
        } else if addon.status.is_true("Available") {
            s.available += 1;
        } else {
            s.unknown += 1;
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fleet() -> Vec<ClusterView> {
        vec![
            ClusterView::named("east").with_label("region", "us-east-1").with_label("env", "prod"),
            ClusterView::named("west").with_label("region", "us-west-2").with_label("env", "dev"),
            ClusterView::named("edge").with_label("env", "dev"),
        ]
    }

    fn names(v: Vec<&ClusterView>) -> Vec<&str> {
        v.into_iter().map(|c| c.name.as_str()).collect()
    }

    fn select(pairs: &[(&str, &[&str])]) -> LabelSelection {
        pairs.iter().map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect())).collect()
    }

    #[test]
    fn keys_are_ored() {
        let clusters = fleet();
        let sel = select(&[("region", &["us-east-1"]), ("env", &["dev"])]);
        assert_eq!(names(filter_clusters(&clusters, &sel)), vec!["east", "west", "edge"]);
        let sel = select(&[("region", &["us-west-2"])]);
        assert_eq!(names(filter_clusters(&clusters, &sel)), vec!["west"]);
    }

    #[test]
    fn missing_region_is_other() {
        let clusters = fleet();
        let sel = select(&[("region", &[OTHER_REGION])]);
        assert_eq!(names(filter_clusters(&clusters, &sel)), vec!["edge"]);
        assert!(label_options(&clusters)["region"].contains(OTHER_REGION));
        // no synthetic value for other keys
        let sel = select(&[("zone", &[OTHER_REGION])]);
        assert!(filter_clusters(&clusters, &sel).is_empty());
    }

    #[test]
    fn empty_selection_keeps_all() {
        let clusters = fleet();
        assert_eq!(filter_clusters(&clusters, &LabelSelection::new()).len(), 3);
        assert_eq!(filter_clusters(&clusters, &select(&[("env", &[])])).len(), 3);
    }

    #[test]
    fn addon_priority() {
        let addon = |conds: serde_json::Value| -> ManagedClusterAddOn {
            serde_json::from_value(json!({
                "apiVersion": "addon.open-cluster-management.io/v1alpha1",
                "kind": "ManagedClusterAddOn",
                "metadata": {"name": "work-manager", "namespace": "east"},
                "status": {"conditions": conds},
            }))
            .unwrap()
        };
        let addons = vec![
            addon(json!([{"type": "Available", "status": "True"}, {"type": "Degraded", "status": "True"}])),
            addon(json!([{"type": "Available", "status": "True"}])),
            addon(json!([{"type": "Progressing", "status": "True"}])),
            addon(json!(null)),
        ];
        assert_eq!(summarize_addons(&addons), AddonSummary { available: 1, degraded: 1, progressing: 1, unknown: 1 });
    }
}
