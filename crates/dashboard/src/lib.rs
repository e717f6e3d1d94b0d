//! Fleetscope dashboard aggregators.
//!
//! Pure reducers over cluster, addon, policy report and metrics collections.
//! They never fail; missing or malformed fields fall into an "other" bucket.

#![forbid(unsafe_code)]

pub mod clusters;
pub mod metrics;
pub mod policy;

pub use clusters::{
    filter_clusters, label_options, summarize_addons, summarize_clusters, AddonSummary, ClusterSummary, LabelSelection,
    OTHER_REGION,
};
pub use metrics::{
    classify_alerts, classify_operators, AlertCounts, MetricsData, OperatorCounts, PrometheusResponse, Sample,
    SampleValue,
};
pub use policy::{risk_buckets, risk_buckets_by_cluster, RiskBuckets};
