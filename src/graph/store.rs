//! Node/Edge store
//!
//! Owns the canonical graph: at most one node per `(kind, name)` and at most
//! one edge per unordered node pair. Nodes are reused across updates so a
//! renderer can keep their physics state.
//!
//! Reconciliation passes are bracketed by `begin_pass`/`end_pass`. Every node
//! upserted and every edge added during a pass is marked; `end_pass` drops
//! what was not re-derived. Presentation is compared between the start and
//! the end of a pass, so same-named objects that overwrite each other within
//! one pass do not count as a change.

use super::node::{AsNodeId, EdgeKey, GraphEdge, GraphNode, NodeId};
use super::presentation::{DetailStrategy, Presentation, StyleTable};
use crate::models::{ResourceKind, ResourceObject};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct PassMarks {
    nodes: HashSet<NodeId>,
    edges: HashSet<EdgeKey>,
    /// Presentation of every node present when the pass began
    before: HashMap<NodeId, Presentation>,
}

/// What `end_pass` swept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub removed_nodes: usize,
    pub removed_edges: usize,
    /// A surviving node's presentation changed during the pass
    pub presentation_changed: bool,
}

#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeId, usize>,
    edges: Vec<GraphEdge>,
    edge_keys: HashSet<EdgeKey>,
    styles: StyleTable,
    next_serial: u64,
    pass: Option<PassMarks>,
}

impl GraphStore {
    pub fn new(styles: StyleTable) -> Self {
        Self {
            styles,
            ..Self::default()
        }
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    /// Node for `object`, created on first use
    ///
    /// An existing node keeps its identity; its backing object and
    /// presentation are refreshed.
    pub fn upsert_node(&mut self, object: &ResourceObject) -> NodeId {
        let id = NodeId::new(object.kind(), object.name());
        let presentation = Presentation::resolve(&self.styles, object.kind(), Some(object));

        match self.index.get(&id).copied() {
            Some(idx) => {
                let node = &mut self.nodes[idx];
                presentation.apply(node);
                node.namespace = object.namespace().to_string();
                node.backing = Some(object.clone());
            }
            None => {
                self.insert_node(
                    id.clone(),
                    object.kind(),
                    object.name(),
                    object.namespace(),
                    Some(object.clone()),
                    presentation,
                );
            }
        }

        self.mark_node(&id);
        id
    }

    /// Synthetic node for a Helm release
    pub fn upsert_helm_release(&mut self, name: &str, namespace: &str) -> NodeId {
        let kind = ResourceKind::HelmRelease;
        let id = NodeId::new(kind, name);
        if !self.index.contains_key(&id) {
            let presentation = Presentation::resolve(&self.styles, kind, None);
            self.insert_node(id.clone(), kind, name, namespace, None, presentation);
        }
        self.mark_node(&id);
        id
    }

    fn insert_node(
        &mut self,
        id: NodeId,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
        backing: Option<ResourceObject>,
        presentation: Presentation,
    ) {
        let node = GraphNode {
            id: id.clone(),
            serial: self.next_serial,
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
            label: name.to_string(),
            size_hint: presentation.size_hint,
            color_hint: presentation.color_hint,
            icon_ref: presentation.icon_ref,
            backing,
            detail: DetailStrategy::for_kind(kind),
        };
        self.next_serial += 1;
        self.index.insert(id, self.nodes.len());
        self.nodes.push(node);
    }

    /// Node by kind and name
    ///
    /// Namespace is not considered: same-named objects of one kind in
    /// different namespaces resolve to the same node.
    pub fn find_node(&self, kind: ResourceKind, name: &str) -> Option<&GraphNode> {
        self.node(NodeId::new(kind, name).as_str())
    }

    pub fn node<I: AsNodeId + ?Sized>(&self, id: &I) -> Option<&GraphNode> {
        self.index.get(id.node_id()).map(|&idx| &self.nodes[idx])
    }

    pub fn contains<I: AsNodeId + ?Sized>(&self, id: &I) -> bool {
        self.index.contains_key(id.node_id())
    }

    /// Link two nodes
    ///
    /// Returns `true` if a new edge was stored. No-op when either endpoint
    /// is unknown, both endpoints are the same node, or the pair is already
    /// linked in either direction.
    pub fn add_edge<S, T>(&mut self, source: &S, target: &T) -> bool
    where
        S: AsNodeId + ?Sized,
        T: AsNodeId + ?Sized,
    {
        let (Some(&s), Some(&t)) = (
            self.index.get(source.node_id()),
            self.index.get(target.node_id()),
        ) else {
            return false;
        };
        if s == t {
            return false;
        }

        let source = self.nodes[s].id.clone();
        let target = self.nodes[t].id.clone();
        let key = EdgeKey::new(&source, &target);
        if let Some(marks) = self.pass.as_mut() {
            marks.edges.insert(key.clone());
        }
        if !self.edge_keys.insert(key) {
            return false;
        }
        self.edges.push(GraphEdge::new(source, target));
        true
    }

    pub fn has_edge<S, T>(&self, a: &S, b: &T) -> bool
    where
        S: AsNodeId + ?Sized,
        T: AsNodeId + ?Sized,
    {
        self.edges
            .iter()
            .any(|e| e.connects(a.node_id(), b.node_id()))
    }

    /// All edges touching a node
    pub fn edges_of<I: AsNodeId + ?Sized>(&self, id: &I) -> Vec<&GraphEdge> {
        let id = id.node_id();
        self.edges.iter().filter(|e| e.touches(id)).collect()
    }

    /// Remove a node and every edge touching it
    pub fn remove_node<I: AsNodeId + ?Sized>(&mut self, id: &I) -> Option<GraphNode> {
        let idx = self.index.get(id.node_id()).copied()?;
        let node = self.nodes.remove(idx);
        self.index.remove(node.id.as_str());
        for i in self.index.values_mut() {
            if *i > idx {
                *i -= 1;
            }
        }

        let edge_keys = &mut self.edge_keys;
        self.edges.retain(|e| {
            let keep = !e.touches(node.id.as_str());
            if !keep {
                edge_keys.remove(&e.key());
            }
            keep
        });

        tracing::trace!(node = %node.id, "Removed node");
        Some(node)
    }

    /// Start a reconciliation pass
    pub fn begin_pass(&mut self) {
        let before = self
            .nodes
            .iter()
            .map(|n| (n.id.clone(), Presentation::of(n)))
            .collect();
        self.pass = Some(PassMarks {
            before,
            ..PassMarks::default()
        });
    }

    /// Finish a pass, dropping every edge and node that was not re-derived
    ///
    /// Without a matching `begin_pass` nothing is swept.
    pub fn end_pass(&mut self) -> PassSummary {
        let Some(marks) = self.pass.take() else {
            return PassSummary::default();
        };

        let edges_before = self.edges.len();
        let edge_keys = &mut self.edge_keys;
        self.edges.retain(|e| {
            let key = e.key();
            let keep = marks.edges.contains(&key);
            if !keep {
                edge_keys.remove(&key);
            }
            keep
        });
        let edges_swept = edges_before - self.edges.len();

        let stale: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| !marks.nodes.contains(&n.id))
            .map(|n| n.id.clone())
            .collect();
        let mut removed_edges = edges_swept;
        for id in &stale {
            removed_edges += self.edges_of(id).len();
            self.remove_node(id);
        }

        let presentation_changed = self.nodes.iter().any(|n| {
            marks
                .before
                .get(&n.id)
                .is_some_and(|before| !before.matches(n))
        });

        PassSummary {
            removed_nodes: stale.len(),
            removed_edges,
            presentation_changed,
        }
    }

    fn mark_node(&mut self, id: &NodeId) {
        if let Some(marks) = self.pass.as_mut() {
            marks.nodes.insert(id.clone());
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Nodes of one kind
    pub fn nodes_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// (node count, edge count)
    pub fn counts(&self) -> (usize, usize) {
        (self.nodes.len(), self.edges.len())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node and edge
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.edges.clear();
        self.edge_keys.clear();
        self.pass = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(kind: ResourceKind, name: &str, ns: &str) -> ResourceObject {
        ResourceObject::from_value(kind, json!({"metadata": {"name": name, "namespace": ns}}))
            .unwrap()
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = GraphStore::default();
        let pod = object(ResourceKind::Pod, "web-1", "default");

        let first = store.upsert_node(&pod);
        let serial = store.node(&first).unwrap().serial;
        let second = store.upsert_node(&pod);

        assert_eq!(first, second);
        assert_eq!(store.counts(), (1, 0));
        assert_eq!(store.node(&second).unwrap().serial, serial);
    }

    #[test]
    fn test_upsert_refreshes_backing_object() {
        let mut store = GraphStore::default();
        let old = object(ResourceKind::Pod, "p", "default");
        let new = object(ResourceKind::Pod, "p", "default");
        let id = store.upsert_node(&old);
        store.upsert_node(&new);

        let backing = store.node(&id).unwrap().backing.as_ref().unwrap();
        assert!(backing.same_object(&new));
    }

    #[test]
    fn test_add_edge_dedups_unordered_pairs() {
        let mut store = GraphStore::default();
        let a = store.upsert_node(&object(ResourceKind::Pod, "a", "default"));
        let b = store.upsert_node(&object(ResourceKind::Service, "b", "default"));

        assert!(store.add_edge(&a, &b));
        assert!(!store.add_edge(&a, &b));
        assert!(!store.add_edge(&b, &a));
        assert!(!store.add_edge("Service-b", "Pod-a"));
        assert_eq!(store.edges().len(), 1);
    }

    #[test]
    fn test_add_edge_ignores_unknown_endpoints() {
        let mut store = GraphStore::default();
        let a = store.upsert_node(&object(ResourceKind::Pod, "a", "default"));
        assert!(!store.add_edge(&a, "Secret-missing"));
        assert!(!store.add_edge(&a, &a));
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_remove_node_cascades_edges() {
        let mut store = GraphStore::default();
        let a = store.upsert_node(&object(ResourceKind::Pod, "a", "default"));
        let b = store.upsert_node(&object(ResourceKind::Service, "b", "default"));
        let c = store.upsert_node(&object(ResourceKind::Secret, "c", "default"));
        store.add_edge(&a, &b);
        store.add_edge(&a, &c);
        store.add_edge(&b, &c);

        let removed = store.remove_node(&a).unwrap();
        assert_eq!(removed.id, a);
        assert!(store.node(&a).is_none());
        assert_eq!(store.edges().len(), 1);
        assert!(store.edges().iter().all(|e| !e.touches(a.as_str())));
        // Index still resolves the shifted nodes
        assert_eq!(store.node(&c).unwrap().name, "c");
        // The pair can be linked again after removal
        let a = store.upsert_node(&object(ResourceKind::Pod, "a", "default"));
        assert!(store.add_edge(&a, &b));
    }

    #[test]
    fn test_find_node_ignores_namespace() {
        let mut store = GraphStore::default();
        store.upsert_node(&object(ResourceKind::Service, "api", "one"));
        store.upsert_node(&object(ResourceKind::Service, "api", "two"));

        assert_eq!(store.counts().0, 1);
        let node = store.find_node(ResourceKind::Service, "api").unwrap();
        assert_eq!(node.namespace, "two");
    }

    #[test]
    fn test_pass_sweeps_unmarked_edges_and_nodes() {
        let mut store = GraphStore::default();
        let a = store.upsert_node(&object(ResourceKind::Pod, "a", "default"));
        let b = store.upsert_node(&object(ResourceKind::Service, "b", "default"));
        let c = store.upsert_node(&object(ResourceKind::ConfigMap, "c", "default"));
        store.add_edge(&a, &b);
        store.add_edge(&a, &c);

        store.begin_pass();
        store.upsert_node(&object(ResourceKind::Pod, "a", "default"));
        store.upsert_node(&object(ResourceKind::Service, "b", "default"));
        let summary = store.end_pass();

        assert_eq!(summary.removed_nodes, 1);
        assert_eq!(summary.removed_edges, 2);
        assert!(store.node(&c).is_none());
        assert!(!store.has_edge(&a, &b));
        assert!(store.node(&a).is_some());
    }

    #[test]
    fn test_pass_reports_presentation_change() {
        let mut store = GraphStore::default();
        let pending = ResourceObject::from_value(
            ResourceKind::Pod,
            json!({"metadata": {"name": "p"}, "status": {"phase": "Pending"}}),
        )
        .unwrap();
        let running = ResourceObject::from_value(
            ResourceKind::Pod,
            json!({"metadata": {"name": "p"}, "status": {"phase": "Running"}}),
        )
        .unwrap();
        let id = store.upsert_node(&pending);

        store.begin_pass();
        store.upsert_node(&pending);
        assert!(!store.end_pass().presentation_changed);

        store.begin_pass();
        store.upsert_node(&running);
        assert!(store.end_pass().presentation_changed);
        assert_eq!(store.node(&id).unwrap().color_hint, "#4caf50");
    }

    #[test]
    fn test_same_named_pods_overwriting_within_a_pass_are_not_a_change() {
        let pod = |ns: &str, phase: &str| {
            ResourceObject::from_value(
                ResourceKind::Pod,
                json!({"metadata": {"name": "p", "namespace": ns}, "status": {"phase": phase}}),
            )
            .unwrap()
        };
        let mut store = GraphStore::default();

        for _ in 0..3 {
            store.begin_pass();
            store.upsert_node(&pod("a", "Running"));
            store.upsert_node(&pod("b", "Pending"));
            store.end_pass();
        }

        store.begin_pass();
        store.upsert_node(&pod("a", "Running"));
        store.upsert_node(&pod("b", "Pending"));
        let summary = store.end_pass();

        assert!(!summary.presentation_changed);
        assert_eq!(store.counts(), (1, 0));
    }
}
