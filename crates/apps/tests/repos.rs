mod common;

use common::*;
use fleetscope_apps::{get_application_repos, group_by_repo_type, KNOWN_CHANNEL_TYPES};
use fleetscope_core::FleetResource;
use serde_json::json;

#[test]
fn subscription_app_resolves_channel() {
    let subs = vec![from(json!({
        "apiVersion": "apps.open-cluster-management.io/v1",
        "kind": "Subscription",
        "metadata": {"name": "sub1", "namespace": "ns"},
        "spec": {"channel": "ns/chan1", "name": "pkgA"},
    }))];
    let chans = vec![channel("ns", "chan1", "github", "https://github.com/x/y.git")];
    let app = FleetResource::Application(app("ns", "app1", "ns/sub1"));

    let repos = get_application_repos(&app, &subs, &chans).expect("application kind");
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].repo_type.as_deref(), Some("github"));
    assert_eq!(repos[0].path_name.as_deref(), Some("https://github.com/x/y.git"));
    assert_eq!(repos[0].package.as_deref(), Some("pkgA"));

    let groups = group_by_repo_type(&repos);
    assert_eq!(groups.keys().cloned().collect::<Vec<_>>(), vec![Some("git".to_string())]);
    assert_eq!(groups[&Some("git".to_string())], vec![&repos[0]]);
}

#[test]
fn subscription_annotations_and_package_filter() {
    let mut s = sub("ns", "sub1", "ns/chan1", None);
    s.spec.package_filter = Some(fleetscope_core::PackageFilter { version: Some("1.2.x".into()) });
    let s = annotate(s, "apps.open-cluster-management.io/github-branch", "release");
    let s = annotate(s, "apps.open-cluster-management.io/git-path", "deploy/prod");
    let chans = vec![channel("ns", "chan1", "Git", "https://example.com/repo.git")];
    let app = FleetResource::Application(app("ns", "app1", "ns/sub1"));

    let repos = get_application_repos(&app, &[s], &chans).unwrap();
    assert_eq!(repos[0].git_branch.as_deref(), Some("release"));
    assert_eq!(repos[0].git_path.as_deref(), Some("deploy/prod"));
    assert_eq!(repos[0].package_filter_version.as_deref(), Some("1.2.x"));
    // type is carried unnormalized
    assert_eq!(repos[0].repo_type.as_deref(), Some("Git"));
}

#[test]
fn shadow_and_unresolved_subscriptions_are_skipped() {
    let subs = vec![
        sub("ns", "sub1", "ns/chan1", None),
        sub("ns", "sub1-local", "ns/chan1", None),
        sub("ns", "orphan", "ns/missing", None),
    ];
    let chans = vec![channel("ns", "chan1", "helmrepo", "https://charts.example.com")];
    let app = FleetResource::Application(app("ns", "app1", "ns/sub1,ns/sub1-local,ns/orphan,ns/nosuch,garbage"));
    let repos = get_application_repos(&app, &subs, &chans).unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].package.as_deref(), Some("sub1-pkg"));
}

#[test]
fn channel_namespace_must_match() {
    let subs = vec![sub("ns", "sub1", "other/chan1", None)];
    let chans = vec![channel("ns", "chan1", "git", "https://example.com/repo.git")];
    let app = FleetResource::Application(app("ns", "app1", "ns/sub1"));
    assert_eq!(get_application_repos(&app, &subs, &chans), Some(vec![]));
}

#[test]
fn chart_wins_type_but_path_is_kept() {
    let app = fleet(json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "Application",
        "metadata": {"name": "helm-app", "namespace": "openshift-gitops"},
        "spec": {
            "source": {
                "repoURL": "https://github.com/x/helm-charts.git",
                "path": "charts/my-chart",
                "chart": "my-chart",
                "targetRevision": "HEAD",
            },
        },
    }));
    let repos = get_application_repos(&app, &[], &[]).unwrap();
    assert_eq!(repos.len(), 1);
    let r = &repos[0];
    assert_eq!(r.repo_type.as_deref(), Some("helmrepo"));
    assert_eq!(r.path_name.as_deref(), Some("https://github.com/x/helm-charts.git"));
    assert_eq!(r.chart.as_deref(), Some("my-chart"));
    assert_eq!(r.git_path.as_deref(), Some("charts/my-chart"));
    assert_eq!(r.target_revision.as_deref(), Some("HEAD"));
}

#[test]
fn argo_without_source_is_empty_not_absent() {
    let app = fleet(json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "Application",
        "metadata": {"name": "bare", "namespace": "openshift-gitops"},
        "spec": {"destination": {"name": "in-cluster"}},
    }));
    assert_eq!(get_application_repos(&app, &[], &[]), Some(vec![]));
}

#[test]
fn unrelated_kinds_are_not_applicable() {
    let dep = fleet(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": "web", "namespace": "ns"},
    }));
    assert_eq!(get_application_repos(&dep, &[], &[]), None);
    let cm = fleet(json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "c"}}));
    assert_eq!(get_application_repos(&cm, &[], &[]), None);
}

#[test]
fn appset_multi_source_keeps_order() {
    let set = fleet(json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "ApplicationSet",
        "metadata": {"name": "set", "namespace": "openshift-gitops"},
        "spec": {
            "generators": [],
            "template": {"spec": {"sources": [
                {"repoURL": "https://charts.example.com", "chart": "redis", "targetRevision": "17.0.0"},
                {"repoURL": "https://github.com/x/values.git", "path": "values"},
                {"repoURL": "https://charts.example.com", "chart": "nginx"},
            ]}},
        },
    }));
    let repos = get_application_repos(&set, &[], &[]).unwrap();
    let types: Vec<_> = repos.iter().map(|r| r.repo_type.as_deref().unwrap()).collect();
    assert_eq!(types, vec!["helmrepo", "git", "helmrepo"]);

    let groups = group_by_repo_type(&repos);
    assert_eq!(groups.len(), 2);
    let helm: Vec<_> = groups[&Some("helmrepo".to_string())].iter().map(|r| r.chart.as_deref().unwrap()).collect();
    assert_eq!(helm, vec!["redis", "nginx"]);
    let known: Vec<_> = KNOWN_CHANNEL_TYPES
        .iter()
        .filter(|t| groups.contains_key(&Some(t.to_string())))
        .collect();
    assert_eq!(known, vec![&"git", &"helmrepo"]);
}

#[test]
fn appset_single_source() {
    let set = fleet(json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "ApplicationSet",
        "metadata": {"name": "set", "namespace": "openshift-gitops"},
        "spec": {"template": {"spec": {"source": {"repoURL": "https://github.com/x/y.git", "path": "guestbook"}}}},
    }));
    let repos = get_application_repos(&set, &[], &[]).unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].repo_type.as_deref(), Some("git"));
    assert_eq!(repos[0].git_path.as_deref(), Some("guestbook"));
}
