//! References encoded as `namespace/name` strings inside annotations and specs.
//!
//! Annotation values are parsed once into typed references; the local-shadow
//! rule is decided at parse time so callers never re-split strings.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::resource::ObjectMeta;
use crate::{annotations, LOCAL_SUFFIX};

/// `namespace/name` pointer to another object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedRef {
    pub namespace: String,
    pub name: String,
}

impl NamespacedRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self { namespace: namespace.to_string(), name: name.to_string() }
    }

    /// Parse `namespace/name`. A value without `/` yields an empty namespace,
    /// which never matches a namespaced object.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().split_once('/') {
            Some((ns, name)) => Self::new(ns.trim(), name.trim()),
            None => Self::new("", raw.trim()),
        }
    }

    /// Parse a comma-separated list, dropping empty entries.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        split_refs(raw).iter().map(|s| Self::parse(s)).collect()
    }

    pub fn is_complete(&self) -> bool {
        !self.namespace.is_empty() && !self.name.is_empty()
    }

    /// Points at the object described by `meta`.
    pub fn matches(&self, meta: &ObjectMeta) -> bool {
        self.is_complete() && meta.is(&self.namespace, &self.name)
    }

    pub fn of(meta: &ObjectMeta) -> Self {
        Self::new(meta.namespace(), &meta.name)
    }
}

impl std::fmt::Display for NamespacedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One entry of an application's subscription annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionRef {
    /// Entry as written in the annotation.
    pub raw: String,
    pub target: NamespacedRef,
    /// Hub-generated `-local` twin of another entry in the same list.
    pub local_shadow: bool,
}

pub type SubscriptionRefs = SmallVec<[SubscriptionRef; 4]>;

/// Split a comma-separated annotation value into trimmed, non-empty entries.
pub fn split_refs(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// True iff `entry` ends with the local suffix and its stripped form is also in `all`.
pub fn is_local_shadow<S: AsRef<str>>(entry: &str, all: &[S]) -> bool {
    match entry.strip_suffix(LOCAL_SUFFIX) {
        Some(base) => all.iter().any(|other| other.as_ref() == base),
        None => false,
    }
}

/// Ordered subscription entries of `meta`; empty when the annotation is absent.
pub fn parse_subscription_refs(meta: &ObjectMeta) -> SubscriptionRefs {
    let entries = meta.annotation(annotations::SUBSCRIPTIONS).map(split_refs).unwrap_or_default();
    entries
        .iter()
        .map(|entry| SubscriptionRef {
            raw: entry.clone(),
            target: NamespacedRef::parse(entry),
            local_shadow: is_local_shadow(entry, &entries),
        })
        .collect()
}

/// Subscription entries with local shadows removed.
pub fn active_subscription_refs(meta: &ObjectMeta) -> SubscriptionRefs {
    parse_subscription_refs(meta).into_iter().filter(|r| !r.local_shadow).collect()
}

/// References listed in the hosting-subscription annotation.
pub fn hosting_subscriptions(meta: &ObjectMeta) -> Vec<NamespacedRef> {
    meta.annotation(annotations::HOSTING_SUBSCRIPTION).map(NamespacedRef::parse_list).unwrap_or_default()
}

/// True iff the hosting-deployable annotation starts with `prefix`.
pub fn hosting_deployable_starts_with(meta: &ObjectMeta, prefix: &str) -> bool {
    meta.annotation(annotations::HOSTING_DEPLOYABLE).map(|v| v.starts_with(prefix)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_with_subs(value: &str) -> ObjectMeta {
        let mut m = ObjectMeta::new(Some("ns"), "app");
        m.annotations.insert(annotations::SUBSCRIPTIONS.to_string(), value.to_string());
        m
    }

    #[test]
    fn parse_keeps_order_and_marks_shadows() {
        let refs = parse_subscription_refs(&meta_with_subs("ns/a,ns/a-local, ns/b-local ,ns/c"));
        let raws: Vec<_> = refs.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(raws, vec!["ns/a", "ns/a-local", "ns/b-local", "ns/c"]);
        let shadows: Vec<_> = refs.iter().map(|r| r.local_shadow).collect();
        // b-local has no plain twin, so it is a real subscription
        assert_eq!(shadows, vec![false, true, false, false]);
        let active: Vec<_> = active_subscription_refs(&meta_with_subs("ns/a,ns/a-local")).into_iter().map(|r| r.raw).collect();
        assert_eq!(active, vec!["ns/a"]);
    }

    #[test]
    fn absent_annotation_is_empty() {
        assert!(parse_subscription_refs(&ObjectMeta::new(Some("ns"), "app")).is_empty());
    }

    #[test]
    fn malformed_entries_never_match() {
        let refs = parse_subscription_refs(&meta_with_subs("justname,,/x,ns/"));
        assert_eq!(refs.len(), 3);
        let sub = ObjectMeta::new(Some("ns"), "justname");
        assert!(refs.iter().all(|r| !r.target.matches(&sub)));
        assert_eq!(refs[0].target, NamespacedRef::new("", "justname"));
    }

    #[test]
    fn shadow_rule() {
        let all = ["ns/a", "ns/a-local"];
        assert!(is_local_shadow("ns/a-local", &all));
        assert!(!is_local_shadow("ns/a", &all));
        assert!(!is_local_shadow("ns/b-local", &all));
    }
}
