//! Identity resolution services

pub mod cluster_resolver;
pub mod cluster_view;

pub use cluster_resolver::{resolve_in, select_canonical, ClusterResolver, IdentifyInput};
pub use cluster_view::{format_cluster, ClusterView, IdentifyResponse};
