//! Graph node and edge types

use super::presentation::DetailStrategy;
use crate::models::{ResourceKind, ResourceObject};
use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Deterministic node key: `"{kind}-{name}"`
///
/// The namespace is deliberately not part of the key, so two objects of the
/// same kind and name in different namespaces share one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(kind: ResourceKind, name: &str) -> Self {
        Self(Arc::from(format!("{}-{}", kind, name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Anything that can name a node: ids, id strings or the node itself
pub trait AsNodeId {
    fn node_id(&self) -> &str;
}

impl AsNodeId for NodeId {
    fn node_id(&self) -> &str {
        self.as_str()
    }
}

impl AsNodeId for GraphNode {
    fn node_id(&self) -> &str {
        self.id.as_str()
    }
}

impl AsNodeId for str {
    fn node_id(&self) -> &str {
        self
    }
}

impl AsNodeId for String {
    fn node_id(&self) -> &str {
        self.as_str()
    }
}

/// A node in the resource graph
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    /// Creation sequence number; unchanged while the node is reused
    #[serde(skip)]
    pub serial: u64,
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    /// Text drawn under the node (the object name)
    pub label: String,
    pub size_hint: u32,
    pub color_hint: String,
    pub icon_ref: String,
    /// Object this node represents; `None` only for synthetic kinds
    #[serde(skip)]
    pub backing: Option<ResourceObject>,
    #[serde(skip)]
    pub detail: DetailStrategy,
}

impl GraphNode {
    pub fn is_synthetic(&self) -> bool {
        self.backing.is_none()
    }

    /// Controller nodes are drawn with an outer ring
    pub fn has_ring(&self) -> bool {
        self.kind.is_controller()
    }

    /// Drawn radius for the size hint
    pub fn radius(&self) -> f64 {
        f64::from(self.size_hint.max(1)).sqrt() * 4.0
    }
}

/// An undirected relationship between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
}

impl GraphEdge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    /// True if `id` is either endpoint
    pub fn touches(&self, id: &str) -> bool {
        self.source.as_str() == id || self.target.as_str() == id
    }

    /// True if this edge joins `a` and `b`, in either direction
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source.as_str() == a && self.target.as_str() == b)
            || (self.source.as_str() == b && self.target.as_str() == a)
    }

    /// The other endpoint, if `id` is one of them
    pub fn other(&self, id: &str) -> Option<&NodeId> {
        if self.source.as_str() == id {
            Some(&self.target)
        } else if self.target.as_str() == id {
            Some(&self.source)
        } else {
            None
        }
    }

    /// Direction-independent identity
    pub(crate) fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.source, &self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EdgeKey(NodeId, NodeId);

impl EdgeKey {
    pub(crate) fn new(a: &NodeId, b: &NodeId) -> Self {
        if a <= b {
            Self(a.clone(), b.clone())
        } else {
            Self(b.clone(), a.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_format() {
        let id = NodeId::new(ResourceKind::Deployment, "web");
        assert_eq!(id.as_str(), "Deployment-web");
        assert_eq!(id.to_string(), "Deployment-web");
    }

    #[test]
    fn test_edge_connects_in_either_direction() {
        let a = NodeId::new(ResourceKind::Pod, "a");
        let b = NodeId::new(ResourceKind::Service, "b");
        let edge = GraphEdge::new(a.clone(), b.clone());

        assert!(edge.connects("Pod-a", "Service-b"));
        assert!(edge.connects("Service-b", "Pod-a"));
        assert!(!edge.connects("Pod-a", "Pod-a"));
        assert_eq!(edge.other("Service-b"), Some(&a));
        assert_eq!(
            EdgeKey::new(&a, &b),
            GraphEdge::new(b.clone(), a.clone()).key()
        );
    }
}
