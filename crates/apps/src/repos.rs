//! Repositories and charts backing an application.

use std::collections::BTreeMap;

use fleetscope_core::refs::active_subscription_refs;
use fleetscope_core::{annotations, ArgoSource, Channel, FleetResource, NamespacedRef, Subscription};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Channel types the console knows how to render, in display order.
pub const KNOWN_CHANNEL_TYPES: [&str; 4] = ["git", "helmrepo", "namespace", "objectbucket"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoDescriptor {
    /// Raw type as found on the source; see [`normalize_repo_type`].
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_filter_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_revision: Option<String>,
}

/// Repositories behind `resource`.
///
/// `None` means the resource is not an application kind; `Some(vec![])` means it
/// is one but nothing could be resolved.
pub fn get_application_repos(
    resource: &FleetResource,
    subscriptions: &[Subscription],
    channels: &[Channel],
) -> Option<Vec<RepoDescriptor>> {
    match resource {
        FleetResource::Application(app) => {
            let mut repos = Vec::new();
            for sref in active_subscription_refs(&app.metadata) {
                let Some(sub) = subscriptions.iter().find(|s| sref.target.matches(&s.metadata)) else {
                    debug!(app = %app.name(), subscription = %sref.raw, "subscription not found");
                    continue;
                };
                let Some(chan_ref) = sub.spec.channel.as_deref().map(NamespacedRef::parse) else { continue };
                let Some(channel) = channels.iter().find(|c| chan_ref.matches(&c.metadata)) else {
                    debug!(subscription = %sref.raw, channel = %chan_ref, "channel not found");
                    continue;
                };
                repos.push(subscription_repo(sub, channel));
            }
            Some(repos)
        }
        FleetResource::ArgoApplication(app) => Some(argo_repos(app.spec.source.as_ref(), &app.spec.sources)),
        FleetResource::ApplicationSet(set) => {
            let spec = &set.spec.template.spec;
            Some(argo_repos(spec.source.as_ref(), &spec.sources))
        }
        _ => None,
    }
}

fn subscription_repo(sub: &Subscription, channel: &Channel) -> RepoDescriptor {
    let meta = &sub.metadata;
    let annotation = |key: &str, legacy: &str| meta.annotation(key).or_else(|| meta.annotation(legacy)).map(|s| s.to_string());
    RepoDescriptor {
        repo_type: channel.spec.channel_type.clone(),
        path_name: channel.spec.pathname.clone(),
        git_branch: annotation(annotations::GIT_BRANCH, annotations::GITHUB_BRANCH),
        git_path: annotation(annotations::GIT_PATH, annotations::GITHUB_PATH),
        package: sub.spec.name.clone(),
        package_filter_version: sub.spec.package_filter.as_ref().and_then(|p| p.version.clone()),
        chart: None,
        target_revision: None,
    }
}

fn argo_repos(source: Option<&ArgoSource>, sources: &[ArgoSource]) -> Vec<RepoDescriptor> {
    match source {
        Some(s) => vec![argo_repo(s)],
        None => sources.iter().map(argo_repo).collect(),
    }
}

/// Chart decides the type; `path` is still carried as the git path.
fn argo_repo(source: &ArgoSource) -> RepoDescriptor {
    let chart = source.chart.clone().filter(|c| !c.is_empty());
    RepoDescriptor {
        repo_type: Some(if chart.is_some() { "helmrepo" } else { "git" }.to_string()),
        path_name: Some(source.repo_url.clone()),
        git_path: source.path.clone(),
        chart,
        target_revision: source.target_revision.clone(),
        ..Default::default()
    }
}

/// Lower-case and fold `github` into `git`. Empty types normalize to `None`.
pub fn normalize_repo_type(raw: Option<&str>) -> Option<String> {
    let t = raw?.trim().to_ascii_lowercase();
    match t.as_str() {
        "" => None,
        "github" => Some("git".to_string()),
        _ => Some(t),
    }
}

/// Group by normalized type, keeping relative order within each group.
/// Untyped entries land under `None`; callers filter it before walking
/// [`KNOWN_CHANNEL_TYPES`].
pub fn group_by_repo_type(repos: &[RepoDescriptor]) -> BTreeMap<Option<String>, Vec<&RepoDescriptor>> {
    let mut groups: BTreeMap<Option<String>, Vec<&RepoDescriptor>> = BTreeMap::new();
    for repo in repos {
        groups.entry(normalize_repo_type(repo.repo_type.as_deref())).or_default().push(repo);
    }
    groups
}
