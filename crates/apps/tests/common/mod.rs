#![allow(dead_code)]

use fleetscope_core::{
    Application, ApplicationSet, ArgoApplication, Channel, FleetResource, Placement, PlacementDecision, PlacementRule,
    Subscription,
};
use serde_json::{json, Value};

pub fn from<T: serde::de::DeserializeOwned>(v: Value) -> T {
    serde_json::from_value(v).expect("fixture decodes")
}

pub fn fleet(v: Value) -> FleetResource {
    FleetResource::decode(v).expect("fixture decodes")
}

pub fn app_json(ns: &str, name: &str, subs: &str) -> Value {
    json!({
        "apiVersion": "app.k8s.io/v1beta1",
        "kind": "Application",
        "metadata": {
            "name": name,
            "namespace": ns,
            "annotations": {"apps.open-cluster-management.io/subscriptions": subs},
        },
    })
}

pub fn app(ns: &str, name: &str, subs: &str) -> Application {
    from(app_json(ns, name, subs))
}

pub fn sub(ns: &str, name: &str, channel: &str, placement: Option<(&str, &str)>) -> Subscription {
    let mut v = json!({
        "apiVersion": "apps.open-cluster-management.io/v1",
        "kind": "Subscription",
        "metadata": {"name": name, "namespace": ns},
        "spec": {"channel": channel, "name": format!("{}-pkg", name)},
    });
    if let Some((kind, pname)) = placement {
        v["spec"]["placement"] = json!({"placementRef": {"kind": kind, "name": pname}});
    }
    from(v)
}

pub fn annotate<S, T>(mut obj: fleetscope_core::Object<S, T>, key: &str, value: &str) -> fleetscope_core::Object<S, T> {
    obj.metadata.annotations.insert(key.to_string(), value.to_string());
    obj
}

pub fn channel(ns: &str, name: &str, ty: &str, path: &str) -> Channel {
    from(json!({
        "apiVersion": "apps.open-cluster-management.io/v1",
        "kind": "Channel",
        "metadata": {"name": name, "namespace": ns},
        "spec": {"type": ty, "pathname": path},
    }))
}

pub fn rule(ns: &str, name: &str) -> PlacementRule {
    from(json!({
        "apiVersion": "apps.open-cluster-management.io/v1",
        "kind": "PlacementRule",
        "metadata": {"name": name, "namespace": ns},
    }))
}

pub fn placement(ns: &str, name: &str) -> Placement {
    from(json!({
        "apiVersion": "cluster.open-cluster-management.io/v1beta1",
        "kind": "Placement",
        "metadata": {"name": name, "namespace": ns},
    }))
}

pub fn decision(ns: &str, name: &str, label: &str, placement: &str, clusters: &[&str]) -> PlacementDecision {
    let decisions: Vec<Value> = clusters.iter().map(|c| json!({"clusterName": c, "reason": ""})).collect();
    from(json!({
        "apiVersion": "cluster.open-cluster-management.io/v1beta1",
        "kind": "PlacementDecision",
        "metadata": {"name": name, "namespace": ns, "labels": {label: placement}},
        "status": {"decisions": decisions},
    }))
}

pub fn argo_json(name: &str, destination: Value, status_cluster: Option<&str>) -> Value {
    let mut v = json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "Application",
        "metadata": {"name": name, "namespace": "openshift-gitops"},
        "spec": {
            "destination": destination,
            "source": {"repoURL": "https://github.com/x/y.git", "path": "app", "targetRevision": "main"},
        },
    });
    if let Some(c) = status_cluster {
        v["status"] = json!({"cluster": c});
    }
    v
}

pub fn argo(name: &str, destination: Value, status_cluster: Option<&str>) -> ArgoApplication {
    from(argo_json(name, destination, status_cluster))
}

pub fn appset(ns: &str, name: &str, placement: Option<&str>) -> ApplicationSet {
    let generators = match placement {
        Some(p) => json!([{"clusterDecisionResource": {
            "configMapRef": "acm-placement",
            "labelSelector": {"matchLabels": {"cluster.open-cluster-management.io/placement": p}},
        }}]),
        None => json!([{"list": {"elements": []}}]),
    };
    from(json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "ApplicationSet",
        "metadata": {"name": name, "namespace": ns},
        "spec": {"generators": generators, "template": {"spec": {}}},
    }))
}
