//! Resource graph
//!
//! Structure:
//! - `node.rs` - Node and edge types
//! - `store.rs` - Node/edge store with reconciliation passes
//! - `derive.rs` - Per-kind relationship rules
//! - `presentation.rs` - Styles, pod health, detail strategies, navigation
//! - `helm.rs` - Helm release detection and decoding
//! - `snapshot.rs` - Immutable snapshots and exports

pub mod derive;
pub mod helm;
mod node;
mod presentation;
mod snapshot;
mod store;

pub use derive::{DeriveContext, derive_all, reconcile};
pub use helm::{HelmDecodeError, HelmReleaseInfo};
pub use node::{AsNodeId, GraphEdge, GraphNode, NodeId};
pub use presentation::{
    DetailStrategy, NodeDetails, NodeStyle, PodHealth, Presentation, StyleTable, format_age,
    navigation_target,
};
pub use snapshot::{ExportError, ExportFormat, ForceLayout, GraphSnapshot, Highlight};
pub use store::{GraphStore, PassSummary};
