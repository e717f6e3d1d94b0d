//! Cluster placement resolution for applications.

use fleetscope_core::refs::active_subscription_refs;
use fleetscope_core::{
    labels, ArgoApplication, ArgoDestination, ClusterView, FleetResource, PlacementDecision, Subscription, IN_CLUSTER,
    KUBE_DEFAULT_SVC, LOCAL_CLUSTER,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const UNKNOWN_CLUSTER: &str = "unknown";
const DEFAULT_HUB_URL: &str = "https://localhost";

/// Local membership and remote count, kept apart for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCount {
    pub local_placement: bool,
    pub remote_count: usize,
}

/// The hub may be imported under its own name; report it as `local-cluster`.
fn canonical_cluster(name: &str, local_cluster: Option<&ClusterView>) -> String {
    match local_cluster {
        Some(hub) if hub.name == name => LOCAL_CLUSTER.to_string(),
        _ => name.to_string(),
    }
}

fn push_unique(list: &mut Vec<String>, name: String) {
    if !list.contains(&name) {
        list.push(name);
    }
}

/// Distinct clusters `resource` is deployed to, in discovery order.
pub fn get_cluster_list(
    resource: &FleetResource,
    argo_applications: &[ArgoApplication],
    placement_decisions: &[PlacementDecision],
    subscriptions: &[Subscription],
    local_cluster: Option<&ClusterView>,
    managed_clusters: &[ClusterView],
) -> Vec<String> {
    match resource {
        FleetResource::Workload(w) => w.status.cluster.iter().map(|c| canonical_cluster(c, local_cluster)).collect(),
        FleetResource::ArgoApplication(app) => argo_cluster_list([app], local_cluster, managed_clusters),
        FleetResource::ApplicationSet(set) => {
            let owned = argo_applications.iter().filter(|app| {
                app.metadata.owner_references.first().map(|o| o.name == set.metadata.name).unwrap_or(false)
            });
            argo_cluster_list(owned, local_cluster, managed_clusters)
        }
        FleetResource::Application(app) => {
            let mut clusters = Vec::new();
            for sref in active_subscription_refs(&app.metadata) {
                for sub in subscriptions.iter().filter(|s| sref.target.matches(&s.metadata)) {
                    let Some(pref) = sub.spec.placement_ref() else { continue };
                    // Decisions may be sharded over several objects; union all of them.
                    for decision in placement_decisions.iter().filter(|d| {
                        d.namespace() == sub.namespace()
                            && (d.metadata.label(labels::PLACEMENT) == Some(pref.name.as_str())
                                || d.metadata.label(labels::PLACEMENT_RULE) == Some(pref.name.as_str()))
                    }) {
                        for d in &decision.status.decisions {
                            if !d.cluster_name.is_empty() {
                                push_unique(&mut clusters, canonical_cluster(&d.cluster_name, local_cluster));
                            }
                        }
                    }
                }
            }
            debug!(app = %app.name(), clusters = clusters.len(), "resolved subscription placement");
            clusters
        }
        _ => Vec::new(),
    }
}

fn argo_cluster_list<'a>(
    apps: impl IntoIterator<Item = &'a ArgoApplication>,
    local_cluster: Option<&ClusterView>,
    managed_clusters: &[ClusterView],
) -> Vec<String> {
    let mut clusters = Vec::new();
    for app in apps {
        let pulled_from = app.status.cluster.as_deref().filter(|c| !c.is_empty());
        let dest = app.spec.destination.as_ref();
        let dest_name = dest.and_then(|d| d.name.as_deref());
        let dest_local = matches!(dest_name, Some(IN_CLUSTER) | Some(LOCAL_CLUSTER))
            || is_local_cluster_url(dest.and_then(|d| d.server.as_deref()).unwrap_or(""), local_cluster);
        // A pulled record always reports the cluster it came from.
        let cluster = match pulled_from {
            Some(cluster) => canonical_cluster(cluster, local_cluster),
            None if dest_local => LOCAL_CLUSTER.to_string(),
            None => get_argo_destination_cluster(dest, managed_clusters, None),
        };
        push_unique(&mut clusters, cluster);
    }
    clusters
}

/// Hostname with everything up to and including the first `api.` removed.
fn strip_api_prefix(host: &str) -> &str {
    match host.find("api.") {
        Some(idx) => &host[idx + 4..],
        None => host,
    }
}

/// Loose locality check for an Argo destination server URL against the hub.
///
/// Local iff the URL is the in-cluster service address, or its hostname (after
/// `api.`) is a substring of the hub's console host. Overlapping hostnames can
/// produce false positives.
pub fn is_local_cluster_url(url: &str, local_cluster: Option<&ClusterView>) -> bool {
    if url == KUBE_DEFAULT_SVC {
        return true;
    }
    let Ok(dest) = Url::parse(url) else { return false };
    let Some(dest_host) = dest.host_str() else { return false };
    let hub = local_cluster.and_then(|c| c.console_url.as_deref()).unwrap_or(DEFAULT_HUB_URL);
    let Ok(hub) = Url::parse(hub) else { return false };
    let hub_host = match (hub.host_str(), hub.port()) {
        (Some(h), Some(p)) => format!("{}:{}", h, p),
        (Some(h), None) => h.to_string(),
        (None, _) => return false,
    };
    hub_host.contains(strip_api_prefix(dest_host))
}

/// Cluster name an Argo destination points at.
///
/// `pulled_from` is the managed cluster a pulled record was collected from.
pub fn get_argo_destination_cluster(
    destination: Option<&ArgoDestination>,
    managed_clusters: &[ClusterView],
    pulled_from: Option<&str>,
) -> String {
    let Some(dest) = destination else { return UNKNOWN_CLUSTER.to_string() };
    if let Some(server) = dest.server.as_deref().filter(|s| !s.is_empty()) {
        if server == KUBE_DEFAULT_SVC {
            return pulled_from.unwrap_or(LOCAL_CLUSTER).to_string();
        }
        let Some(host) = Url::parse(server).ok().and_then(|u| u.host_str().map(|h| h.to_string())) else {
            return UNKNOWN_CLUSTER.to_string();
        };
        let wanted = strip_api_prefix(&host);
        return managed_clusters
            .iter()
            .find(|c| {
                c.kube_api_server
                    .as_deref()
                    .and_then(|api| Url::parse(api).ok())
                    .and_then(|u| u.host_str().map(|h| h.contains(wanted)))
                    .unwrap_or(false)
            })
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNKNOWN_CLUSTER.to_string());
    }
    match dest.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name @ (IN_CLUSTER | LOCAL_CLUSTER)) => match pulled_from {
            Some(cluster) => cluster.to_string(),
            None if name == IN_CLUSTER => LOCAL_CLUSTER.to_string(),
            None => name.to_string(),
        },
        Some(name) => name.to_string(),
        None => UNKNOWN_CLUSTER.to_string(),
    }
}

/// Pair local membership with the remote count. Duplicates are counted once.
pub fn get_cluster_count(cluster_list: &[String]) -> ClusterCount {
    let mut distinct: Vec<&str> = Vec::with_capacity(cluster_list.len());
    for c in cluster_list {
        if !distinct.contains(&c.as_str()) {
            distinct.push(c.as_str());
        }
    }
    let local_placement = distinct.contains(&LOCAL_CLUSTER);
    ClusterCount { local_placement, remote_count: distinct.len() - usize::from(local_placement) }
}

/// Render a count as "N Remote, 1 Local", "N Remote", "Local" or "None".
///
/// With a single remote cluster and the list at hand, the cluster name is shown instead.
pub fn get_cluster_count_string(count: ClusterCount, cluster_list: Option<&[String]>) -> String {
    match (count.remote_count, count.local_placement) {
        (0, true) => "Local".to_string(),
        (0, false) => "None".to_string(),
        (n, true) => format!("{} Remote, 1 Local", n),
        (1, false) => match cluster_list {
            Some([only]) => only.clone(),
            _ => "1 Remote".to_string(),
        },
        (n, false) => format!("{} Remote", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> ClusterView {
        ClusterView::named(LOCAL_CLUSTER).with_console_url("https://console-openshift-console.apps.hub.example.com")
    }

    #[test]
    fn local_url_heuristic() {
        assert!(is_local_cluster_url(KUBE_DEFAULT_SVC, None));
        assert!(is_local_cluster_url("https://api.hub.example.com:6443", Some(&hub())));
        assert!(!is_local_cluster_url("https://api.spoke.example.com:6443", Some(&hub())));
        assert!(!is_local_cluster_url("not a url", Some(&hub())));
        // Unknown hub console falls back to localhost
        assert!(is_local_cluster_url("https://localhost:6443", None));
    }

    #[test]
    fn destination_by_name_and_server() {
        let spokes = vec![ClusterView::named("spoke").with_api_server("https://api.spoke.example.com:6443")];
        let by_server = ArgoDestination { server: Some("https://api.spoke.example.com:6443".into()), ..Default::default() };
        assert_eq!(get_argo_destination_cluster(Some(&by_server), &spokes, None), "spoke");
        let missing = ArgoDestination { server: Some("https://api.other.example.com:6443".into()), ..Default::default() };
        assert_eq!(get_argo_destination_cluster(Some(&missing), &spokes, None), "unknown");
        let in_cluster = ArgoDestination { name: Some("in-cluster".into()), ..Default::default() };
        assert_eq!(get_argo_destination_cluster(Some(&in_cluster), &spokes, None), "local-cluster");
        assert_eq!(get_argo_destination_cluster(Some(&in_cluster), &spokes, Some("spoke")), "spoke");
        let svc = ArgoDestination { server: Some(KUBE_DEFAULT_SVC.into()), ..Default::default() };
        assert_eq!(get_argo_destination_cluster(Some(&svc), &spokes, Some("spoke")), "spoke");
        assert_eq!(get_argo_destination_cluster(None, &spokes, None), "unknown");
    }

    #[test]
    fn count_strings_never_fold_local_into_remote() {
        let list: Vec<String> = vec!["a".into(), "b".into(), LOCAL_CLUSTER.into()];
        let count = get_cluster_count(&list);
        assert_eq!(count, ClusterCount { local_placement: true, remote_count: 2 });
        assert_eq!(get_cluster_count_string(count, Some(list.as_slice())), "2 Remote, 1 Local");
        let single = vec!["spoke".to_string()];
        assert_eq!(get_cluster_count_string(get_cluster_count(&single), Some(single.as_slice())), "spoke");
        assert_eq!(get_cluster_count_string(get_cluster_count(&single), None), "1 Remote");
        assert_eq!(get_cluster_count_string(get_cluster_count(&[]), None), "None");
        assert_eq!(get_cluster_count_string(get_cluster_count(&[LOCAL_CLUSTER.to_string()]), None), "Local");
    }
}
