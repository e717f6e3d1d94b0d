//! What deleting a subscription-based application would remove, and what it must leave alone.

use fleetscope_core::refs::{
    active_subscription_refs, hosting_deployable_starts_with, hosting_subscriptions, parse_subscription_refs,
};
use fleetscope_core::{
    annotations, Application, Channel, NamespacedRef, ObjectMeta, Placement, PlacementKind, PlacementRule, Subscription,
    LOCAL_CLUSTER,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A resource that can be deleted together with the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildResource {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub kind: String,
    /// `name [Kind]`, used for display and ordering.
    pub label: String,
    /// Labels of objects deployed by this resource.
    pub sub_child_resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "by", content = "names")]
pub enum SharedWith {
    /// Other applications listing the same subscription.
    Applications(Vec<String>),
    /// Other subscriptions using the same placement.
    Subscriptions(Vec<String>),
}

/// A resource still needed by something else; it must survive the delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedChildResource {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub kind: String,
    pub label: String,
    pub shared_with: SharedWith,
}

struct ResolvedPlacement<'a> {
    kind: PlacementKind,
    meta: &'a ObjectMeta,
}

impl ResolvedPlacement<'_> {
    fn kind_str(&self) -> &'static str {
        match self.kind {
            PlacementKind::PlacementRule => "PlacementRule",
            PlacementKind::Placement => "Placement",
        }
    }

    fn id(&self) -> String {
        let prefix = match self.kind {
            PlacementKind::PlacementRule => "rules",
            PlacementKind::Placement => "placements",
        };
        format!("{}-{}-{}", prefix, self.meta.namespace(), self.meta.name)
    }

    fn same_as(&self, other: &ResolvedPlacement<'_>) -> bool {
        self.kind == other.kind && self.meta.is(other.meta.namespace(), &other.meta.name)
    }
}

fn label(name: &str, kind: &str) -> String {
    format!("{} [{}]", name, kind)
}

/// Placements are unique per namespace, so the lookup is scoped to the subscription's namespace.
fn resolve_placement<'a>(
    sub: &Subscription,
    placement_rules: &'a [PlacementRule],
    placements: &'a [Placement],
) -> Option<ResolvedPlacement<'a>> {
    let pref = sub.spec.placement_ref()?;
    let kind = pref.placement_kind()?;
    let meta = match kind {
        PlacementKind::PlacementRule => placement_rules.iter().map(|p| &p.metadata).find(|m| m.is(sub.namespace(), &pref.name)),
        PlacementKind::Placement => placements.iter().map(|p| &p.metadata).find(|m| m.is(sub.namespace(), &pref.name)),
    }?;
    Some(ResolvedPlacement { kind, meta })
}

/// Split the application's dependents into removable children and shared resources.
///
/// Children come back sorted by label; shared entries keep discovery order.
pub fn get_app_child_resources(
    app: &Application,
    applications: &[Application],
    subscriptions: &[Subscription],
    placement_rules: &[PlacementRule],
    placements: &[Placement],
    channels: &[Channel],
) -> (Vec<ChildResource>, Vec<SharedChildResource>) {
    let mut children = Vec::new();
    let mut shared = Vec::new();
    let mut removable: Vec<NamespacedRef> = Vec::new();
    let mut candidate_placements: Vec<ResolvedPlacement<'_>> = Vec::new();

    for sref in active_subscription_refs(&app.metadata) {
        let target = &sref.target;
        let mut sibling_apps = Vec::new();
        let mut sub_children = Vec::new();

        for other in applications {
            if other.metadata.is(app.namespace(), app.name()) {
                continue;
            }
            if other.namespace() == app.namespace()
                && parse_subscription_refs(&other.metadata).iter().any(|r| r.target == *target)
            {
                sibling_apps.push(other.name().to_string());
            }
            if hosting_subscriptions(&other.metadata).contains(target) {
                let kind = if other.kind.is_empty() { "Application" } else { other.kind.as_str() };
                sub_children.push(label(other.name(), kind));
            }
        }

        let Some(sub) = subscriptions.iter().find(|s| target.matches(&s.metadata)) else {
            debug!(app = %app.name(), subscription = %sref.raw, "subscription not found; nothing to remove");
            continue;
        };

        for deployed in subscriptions {
            if hosting_subscriptions(&deployed.metadata).contains(target)
                && !hosting_deployable_starts_with(&deployed.metadata, LOCAL_CLUSTER)
            {
                sub_children.push(label(deployed.name(), "Subscription"));
            }
        }

        let placement = resolve_placement(sub, placement_rules, placements);

        for chn in channels {
            if chn.metadata.annotation(annotations::HOSTING_SUBSCRIPTION) == Some(sref.raw.as_str()) {
                sub_children.push(label(chn.name(), "Channel"));
            }
        }

        let id = format!("subscriptions-{}-{}", sub.namespace(), sub.name());
        if sibling_apps.is_empty() {
            removable.push(NamespacedRef::of(&sub.metadata));
            children.push(ChildResource {
                id,
                name: sub.name().to_string(),
                namespace: sub.namespace().to_string(),
                kind: "Subscription".to_string(),
                label: label(sub.name(), "Subscription"),
                sub_child_resources: sub_children,
            });
            if let Some(p) = placement {
                if !candidate_placements.iter().any(|c| c.same_as(&p)) {
                    candidate_placements.push(p);
                }
            }
        } else {
            debug!(subscription = %sref.raw, siblings = ?sibling_apps, "subscription shared with other applications");
            shared.push(SharedChildResource {
                id,
                name: sub.name().to_string(),
                namespace: sub.namespace().to_string(),
                kind: "Subscription".to_string(),
                label: label(sub.name(), "Subscription"),
                shared_with: SharedWith::Applications(sibling_apps),
            });
        }
    }

    for p in candidate_placements {
        let sibling_subs: Vec<String> = subscriptions
            .iter()
            .filter(|s| {
                !hosting_deployable_starts_with(&s.metadata, LOCAL_CLUSTER)
                    && !removable.contains(&NamespacedRef::of(&s.metadata))
                    && s.namespace() == p.meta.namespace()
                    && s.spec.placement_ref().map(|r| r.name == p.meta.name).unwrap_or(false)
            })
            .map(|s| s.name().to_string())
            .collect();
        let name = p.meta.name.clone();
        let namespace = p.meta.namespace().to_string();
        let kind = p.kind_str().to_string();
        let lbl = label(&name, &kind);
        if sibling_subs.is_empty() {
            children.push(ChildResource { id: p.id(), name, namespace, kind, label: lbl, sub_child_resources: Vec::new() });
        } else {
            shared.push(SharedChildResource {
                id: p.id(),
                name,
                namespace,
                kind,
                label: lbl,
                shared_with: SharedWith::Subscriptions(sibling_subs),
            });
        }
    }

    children.sort_by(|a, b| a.label.cmp(&b.label));
    (children, shared)
}
