//! Metrics-backend query responses and the operator/alert classifiers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// `{status, data: {resultType, result}}` as returned by an instant or range query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrometheusResponse {
    pub status: String,
    pub data: MetricsData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsData {
    pub result_type: String,
    /// Absent on some backends when nothing matched.
    pub result: Option<Vec<Sample>>,
}

impl PrometheusResponse {
    pub fn samples(&self) -> &[Sample] {
        self.data.result.as_deref().unwrap_or(&[])
    }
}

/// `[unix_time, "value"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleValue(pub f64, pub String);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sample {
    pub metric: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<SampleValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<SampleValue>,
}

impl Sample {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metric.get(key).map(|s| s.as_str())
    }

    /// Instant value, or the latest point of a range.
    pub fn current(&self) -> Option<&str> {
        self.value.as_ref().or_else(|| self.values.last()).map(|v| v.1.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorCounts {
    pub degraded: usize,
    pub not_available: usize,
    pub other: usize,
}

/// Classify `cluster_operator_conditions` samples.
///
/// `Degraded=1` is degraded and `Available=0` is not available. `Available=1`
/// and `Degraded=0` are healthy and not counted. Anything else is other.
pub fn classify_operators(samples: &[Sample]) -> OperatorCounts {
    let mut counts = OperatorCounts::default();
    for s in samples {
        match (s.label("condition"), s.current()) {
            (Some("Degraded"), Some("1")) => counts.degraded += 1,
            (Some("Available"), Some("0")) => counts.not_available += 1,
            (Some("Available"), Some("1")) | (Some("Degraded"), Some("0")) => {}
            _ => counts.other += 1,
        }
    }
    counts
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub other: usize,
}

impl AlertCounts {
    pub fn total(&self) -> usize {
        self.critical + self.warning + self.info + self.other
    }
}

/// Count firing alerts by `severity`. Pending and resolved alerts are skipped.
pub fn classify_alerts(samples: &[Sample]) -> AlertCounts {
    let mut counts = AlertCounts::default();
    for s in samples.iter().filter(|s| s.label("alertstate") == Some("firing")) {
        match s.label("severity") {
            Some("critical") => counts.critical += 1,
            Some("warning") => counts.warning += 1,
            Some("info") => counts.info += 1,
            _ => counts.other += 1,
        }
    }
    debug!(firing = counts.total(), "classified alerts");
    counts
}
