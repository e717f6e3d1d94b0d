//! Policy report results bucketed by total risk.

use fleetscope_core::{PolicyReport, PolicyReportResult};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBuckets {
    pub critical: usize,
    pub important: usize,
    pub moderate: usize,
    pub low: usize,
}

impl RiskBuckets {
    /// Add one result. Risks outside 1..=4, or missing, are ignored.
    pub fn record(&mut self, result: &PolicyReportResult) {
        match result.total_risk() {
            Some(4) => self.critical += 1,
            Some(3) => self.important += 1,
            Some(2) => self.moderate += 1,
            Some(1) => self.low += 1,
            _ => {}
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.important + self.moderate + self.low
    }
}

pub fn risk_buckets<'a>(reports: impl IntoIterator<Item = &'a PolicyReport>) -> RiskBuckets {
    let mut buckets = RiskBuckets::default();
    for r in reports.into_iter().flat_map(|r| r.results.iter()) {
        buckets.record(r);
    }
    buckets
}

/// Per-cluster buckets, keyed by the report namespace (the cluster namespace),
/// sorted by cluster name. Clusters with no rated result are left out.
pub fn risk_buckets_by_cluster<'a>(reports: impl IntoIterator<Item = &'a PolicyReport>) -> Vec<(String, RiskBuckets)> {
    let mut per_cluster: FxHashMap<&str, RiskBuckets> = FxHashMap::default();
    for report in reports {
        let entry = per_cluster.entry(report.metadata.namespace()).or_default();
        for r in &report.results {
            entry.record(r);
        }
    }
    let mut out: Vec<(String, RiskBuckets)> =
        per_cluster.into_iter().filter(|(_, b)| b.total() > 0).map(|(k, b)| (k.to_string(), b)).collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(cluster: &str, risks: &[serde_json::Value]) -> PolicyReport {
        let results: Vec<_> = risks
            .iter()
            .enumerate()
            .map(|(i, r)| json!({"policy": format!("rule-{}", i), "source": "insights", "properties": {"total_risk": r}}))
            .collect();
        serde_json::from_value(json!({
            "apiVersion": "wgpolicyk8s.io/v1alpha2",
            "kind": "PolicyReport",
            "metadata": {"name": cluster, "namespace": cluster},
            "results": results,
        }))
        .unwrap()
    }

    #[test]
    fn four_tiers() {
        let reports = vec![
            report("east", &[json!("4"), json!(3), json!("2"), json!("1"), json!("4")]),
            report("west", &[json!(0), json!("high"), json!(9)]),
        ];
        assert_eq!(risk_buckets(&reports), RiskBuckets { critical: 2, important: 1, moderate: 1, low: 1 });
    }

    #[test]
    fn per_cluster_skips_unrated() {
        let reports = vec![
            report("west", &[json!("2")]),
            report("east", &[json!("4")]),
            report("quiet", &[json!("0")]),
            report("east", &[json!("1")]),
        ];
        let by = risk_buckets_by_cluster(&reports);
        let names: Vec<_> = by.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["east", "west"]);
        assert_eq!(by[0].1, RiskBuckets { critical: 1, low: 1, ..Default::default() });
    }
}
