//! Fleetscope kubehub: discovery and list/watch wiring for the fleet kinds.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use futures::TryStreamExt;
use kube::{
    api::{Api, ListParams},
    core::{ApiResource, DynamicObject},
    discovery::{Discovery, Scope},
    runtime::watcher::{self, Event},
    Client,
};
use fleetscope_core::{groups, Delta, DeltaKind};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Group and kind of everything the inventory reads. Versions come from discovery.
pub const FLEET_KINDS: &[(&str, &str)] = &[
    (groups::APP_K8S, "Application"),
    (groups::ARGO, "Application"),
    (groups::ARGO, "ApplicationSet"),
    (groups::OCM_APPS, "Subscription"),
    (groups::OCM_APPS, "Channel"),
    (groups::OCM_APPS, "PlacementRule"),
    (groups::OCM_CLUSTER, "Placement"),
    (groups::OCM_CLUSTER, "PlacementDecision"),
    (groups::OCM_CLUSTER, "ManagedCluster"),
    (groups::OCM_ADDON, "ManagedClusterAddOn"),
    (groups::POLICY_REPORT, "PolicyReport"),
    ("apps", "Deployment"),
    ("apps", "StatefulSet"),
    ("apps", "DaemonSet"),
    ("batch", "Job"),
    ("batch", "CronJob"),
    ("apps.openshift.io", "DeploymentConfig"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetApi {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub namespaced: bool,
}

impl FleetApi {
    pub fn gvk_key(&self) -> String {
        if self.group.is_empty() {
            format!("{}/{}", self.version, self.kind)
        } else {
            format!("{}/{}/{}", self.group, self.version, self.kind)
        }
    }

    fn api_resource(&self) -> ApiResource {
        let api_version =
            if self.group.is_empty() { self.version.clone() } else { format!("{}/{}", self.group, self.version) };
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version,
            kind: self.kind.clone(),
            plural: self.plural.clone(),
        }
    }

    fn api(&self, client: Client, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = self.api_resource();
        match (self.namespaced, namespace) {
            (true, Some(ns)) => Api::namespaced_with(client, ns, &ar),
            _ => Api::all_with(client, &ar),
        }
    }
}

/// Resolve [`FLEET_KINDS`] against the server's preferred versions.
/// Kinds whose CRD is not installed are skipped.
pub async fn discover_fleet(client: Client) -> Result<Vec<FleetApi>> {
    let discovery = Discovery::new(client).run().await.context("running API discovery")?;
    let mut out = Vec::new();
    for (group, kind) in FLEET_KINDS {
        let found = discovery
            .groups()
            .filter(|g| g.name() == *group)
            .flat_map(|g| g.recommended_resources())
            .find(|(ar, _)| ar.kind == *kind);
        match found {
            Some((ar, caps)) => out.push(FleetApi {
                group: ar.group.clone(),
                version: ar.version.clone(),
                kind: ar.kind.clone(),
                plural: ar.plural.clone(),
                namespaced: matches!(caps.scope, Scope::Namespaced),
            }),
            None => info!(group = %group, kind = %kind, "kind not served; skipping"),
        }
    }
    Ok(out)
}

fn strip_managed_fields(v: &mut serde_json::Value) {
    if let Some(meta) = v.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        meta.remove("managedFields");
    }
}

fn delta_from(obj: &DynamicObject, kind: DeltaKind) -> Result<Delta> {
    let mut raw = serde_json::to_value(obj).context("serializing DynamicObject")?;
    strip_managed_fields(&mut raw);
    Ok(match kind {
        DeltaKind::Applied => Delta::applied(raw),
        DeltaKind::Deleted => Delta::deleted(raw),
    })
}

/// Keys one watcher has forwarded and not yet seen deleted.
///
/// A watch restart delivers the full current list; anything forwarded earlier
/// but missing from it was deleted while the watch was down.
#[derive(Debug, Default)]
pub struct WatchedKeys {
    keys: FxHashSet<String>,
}

impl WatchedKeys {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn observe(&mut self, d: &Delta) {
        match d.kind {
            DeltaKind::Applied => {
                self.keys.insert(d.key.clone());
            }
            DeltaKind::Deleted => {
                self.keys.remove(&d.key);
            }
        }
    }

    /// Replace the tracked set with `listed`, returning tombstones for vanished
    /// keys followed by `listed` itself.
    pub fn relist(&mut self, listed: Vec<Delta>) -> Vec<Delta> {
        let fresh: FxHashSet<String> = listed.iter().map(|d| d.key.clone()).collect();
        let mut gone: Vec<String> = self.keys.difference(&fresh).cloned().collect();
        gone.sort();
        let mut out: Vec<Delta> = gone.into_iter().map(Delta::tombstone).collect();
        out.extend(listed);
        self.keys = fresh;
        out
    }
}

/// One-shot list of every discovered fleet kind, for non-watch commands.
pub async fn prime_list(namespace: Option<&str>) -> Result<Vec<serde_json::Value>> {
    let client = Client::try_default().await.context("building kube client")?;
    let apis = discover_fleet(client.clone()).await?;
    let mut out = Vec::new();
    for fa in &apis {
        let list = match fa.api(client.clone(), namespace).list(&ListParams::default()).await {
            Ok(list) => list,
            Err(err) => {
                warn!(gvk = %fa.gvk_key(), error = %err, "list failed; skipping kind");
                continue;
            }
        };
        debug!(gvk = %fa.gvk_key(), count = list.items.len(), "listed");
        for o in &list.items {
            let mut raw = serde_json::to_value(o).context("serializing DynamicObject")?;
            strip_managed_fields(&mut raw);
            out.push(raw);
        }
    }
    info!(kinds = apis.len(), objects = out.len(), "primed fleet inventory");
    Ok(out)
}

/// Start list+watch for one fleet kind and forward deltas into `delta_tx`.
pub async fn start_watcher(client: Client, fa: FleetApi, namespace: Option<String>, delta_tx: mpsc::Sender<Delta>) -> Result<()> {
    let api = fa.api(client, namespace.as_deref());
    let stream = watcher::watcher(api, watcher::Config::default());
    futures::pin_mut!(stream);
    let gvk = fa.gvk_key();
    let mut seen = WatchedKeys::default();
    info!(gvk = %gvk, ns = ?namespace, "watcher started");
    while let Some(ev) = stream.try_next().await.with_context(|| format!("watching {}", gvk))? {
        let deltas = match ev {
            Event::Applied(o) => {
                let d = delta_from(&o, DeltaKind::Applied)?;
                seen.observe(&d);
                vec![d]
            }
            Event::Deleted(o) => {
                let d = delta_from(&o, DeltaKind::Deleted)?;
                seen.observe(&d);
                vec![d]
            }
            Event::Restarted(list) => {
                let listed = list.iter().map(|o| delta_from(o, DeltaKind::Applied)).collect::<Result<Vec<_>>>()?;
                let out = seen.relist(listed);
                let retracted = out.iter().take_while(|d| d.kind == DeltaKind::Deleted).count();
                debug!(gvk = %gvk, count = list.len(), retracted, "watch restart");
                out
            }
        };
        for d in deltas {
            if delta_tx.send(d).await.is_err() {
                debug!(gvk = %gvk, "ingest closed; stopping watcher");
                return Ok(());
            }
        }
    }
    warn!(gvk = %gvk, "watcher stream ended");
    Ok(())
}

/// Discover the fleet kinds and spawn one watcher per kind.
pub async fn watch_fleet(namespace: Option<&str>, delta_tx: mpsc::Sender<Delta>) -> Result<Vec<JoinHandle<()>>> {
    let client = Client::try_default().await.context("building kube client")?;
    let apis = discover_fleet(client.clone()).await?;
    let handles = apis
        .into_iter()
        .map(|fa| {
            let client = client.clone();
            let tx = delta_tx.clone();
            let ns = namespace.map(|s| s.to_string());
            tokio::spawn(async move {
                let gvk = fa.gvk_key();
                if let Err(err) = start_watcher(client, fa, ns, tx).await {
                    metrics::counter!("watch_errors_total", 1u64, "gvk" => gvk.clone());
                    warn!(gvk = %gvk, error = %err, "watcher failed");
                }
            })
        })
        .collect();
    Ok(handles)
}
