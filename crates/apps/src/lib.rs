//! Fleetscope application resolution: which repositories back an application,
//! where it is placed, and what deleting it would remove.
//!
//! Every function here is a pure computation over already-fetched collections.
//! Unresolvable references contribute nothing; they are never errors.

#![forbid(unsafe_code)]

pub mod appset;
pub mod children;
pub mod counts;
pub mod placement;
pub mod repos;

pub use appset::get_app_set_related_resources;
pub use children::{get_app_child_resources, ChildResource, SharedChildResource, SharedWith};
pub use counts::{application_type_counts, AppTypeCounts};
pub use placement::{
    get_argo_destination_cluster, get_cluster_count, get_cluster_count_string, get_cluster_list, is_local_cluster_url,
    ClusterCount,
};
pub use repos::{get_application_repos, group_by_repo_type, normalize_repo_type, RepoDescriptor, KNOWN_CHANNEL_TYPES};
