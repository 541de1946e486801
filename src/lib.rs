//! kube-resource-map library
//!
//! Keeps a force-graph model of Kubernetes resources in sync with a cluster:
//! cached collections fed by watches, a node/edge store re-derived from them,
//! and a controller that publishes immutable snapshots for renderers.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod graph;
pub mod models;
pub mod sync;
pub mod watcher;

// Re-export commonly used types for convenience
pub use graph::{GraphEdge, GraphNode, GraphSnapshot, GraphStore, NodeId};
pub use models::{ResourceKind, ResourceObject};
pub use sync::GraphController;
pub use watcher::{NamespaceScope, ResourceSource, ResourceState, WatchEvent};
