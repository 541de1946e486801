//! Resource state management
//!
//! Caches the current objects of every watched kind. This is the read side the
//! relationship rules query: point lookups by name, per-namespace listings and
//! the controller → pod association.

use super::NamespaceScope;
use crate::models::{ObjectKey, ResourceKind, ResourceObject};
use std::collections::{BTreeMap, HashMap};

/// Per-kind object collections
#[derive(Debug, Clone, Default)]
pub struct ResourceState {
    collections: HashMap<ResourceKind, BTreeMap<ObjectKey, ResourceObject>>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update an object
    pub fn upsert(&mut self, object: ResourceObject) {
        self.collections
            .entry(object.kind())
            .or_default()
            .insert(object.key(), object);
    }

    /// Remove an object
    pub fn remove(&mut self, kind: ResourceKind, namespace: &str, name: &str) -> Option<ResourceObject> {
        self.collections
            .get_mut(&kind)
            .and_then(|objects| objects.remove(&ObjectKey::new(namespace, name)))
    }

    /// Replace a kind's whole collection with a fresh listing
    pub fn replace(&mut self, kind: ResourceKind, objects: Vec<ResourceObject>) {
        let collection = self.collections.entry(kind).or_default();
        collection.clear();
        for object in objects.into_iter().filter(|o| o.kind() == kind) {
            collection.insert(object.key(), object);
        }
    }

    /// Replace the objects of one namespace (or all, with `None`) after a watch resync
    pub fn replace_namespace(
        &mut self,
        kind: ResourceKind,
        namespace: Option<&str>,
        objects: Vec<ResourceObject>,
    ) {
        match namespace {
            None => self.replace(kind, objects),
            Some(ns) => {
                let collection = self.collections.entry(kind).or_default();
                collection.retain(|key, _| key.namespace != ns);
                for object in objects
                    .into_iter()
                    .filter(|o| o.kind() == kind && o.namespace() == ns)
                {
                    collection.insert(object.key(), object);
                }
            }
        }
    }

    /// Point lookup by name within a namespace
    pub fn get_by_name(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Option<&ResourceObject> {
        self.collections
            .get(&kind)
            .and_then(|objects| objects.get(&ObjectKey::new(namespace, name)))
    }

    /// Every object of a kind, across all namespaces
    pub fn all(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceObject> {
        self.collections
            .get(&kind)
            .into_iter()
            .flat_map(|objects| objects.values())
    }

    /// Objects of a kind restricted to the given namespace scope
    pub fn all_by_namespaces<'a>(
        &'a self,
        kind: ResourceKind,
        scope: &'a NamespaceScope,
    ) -> impl Iterator<Item = &'a ResourceObject> {
        self.all(kind).filter(move |o| scope.contains(o.namespace()))
    }

    /// Is this exact object (by namespace and name) still present?
    pub fn contains(&self, object: &ResourceObject) -> bool {
        self.get_by_name(object.kind(), object.name(), object.namespace())
            .is_some()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.collections.get(&kind).map_or(0, BTreeMap::len)
    }

    /// Count objects by kind
    pub fn count_by_kind(&self) -> HashMap<ResourceKind, usize> {
        self.collections
            .iter()
            .map(|(kind, objects)| (*kind, objects.len()))
            .collect()
    }

    /// Pods owned by a controller
    ///
    /// Deployments match pods by their pod-template labels within the same
    /// namespace; StatefulSets and DaemonSets match by owner reference uid.
    pub fn child_pods(&self, controller: &ResourceObject) -> Vec<&ResourceObject> {
        let pods = self
            .all(ResourceKind::Pod)
            .filter(|pod| pod.namespace() == controller.namespace());

        match controller.kind() {
            ResourceKind::Deployment => {
                let Some(template_labels) = controller
                    .get("/spec/template/metadata/labels")
                    .and_then(|l| l.as_object())
                else {
                    return Vec::new();
                };
                pods.filter(|pod| pod.matches_labels(template_labels))
                    .collect()
            }
            ResourceKind::StatefulSet | ResourceKind::DaemonSet => {
                let Some(uid) = controller.uid() else {
                    return Vec::new();
                };
                pods.filter(|pod| {
                    pod.array_at("/metadata/ownerReferences")
                        .iter()
                        .any(|owner| owner.get("uid").and_then(|u| u.as_str()) == Some(uid))
                })
                .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Clear all collections (used when the namespace scope changes)
    pub fn clear(&mut self) {
        self.collections.clear();
    }
}
