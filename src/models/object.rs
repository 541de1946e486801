//! Watched resource objects
//!
//! `ResourceObject` is the read-only view the graph layer has of a Kubernetes
//! object. The raw JSON is shared behind an `Arc` so nodes, collections and
//! snapshots can all hold the same object without copying it.

use super::ResourceKind;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Errors raised when a JSON document cannot be turned into a `ResourceObject`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectError {
    #[error("object has no kind")]
    MissingKind,

    #[error("unsupported kind: {0}")]
    UnsupportedKind(String),

    #[error("{0} object is missing metadata.name")]
    MissingName(ResourceKind),
}

/// Identity of an object within one kind's collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// A Kubernetes object delivered by a resource source
#[derive(Debug, Clone)]
pub struct ResourceObject {
    kind: ResourceKind,
    name: String,
    namespace: String,
    uid: Option<String>,
    raw: Arc<Value>,
}

impl ResourceObject {
    /// Wrap a serialized object of a known kind
    pub fn from_value(kind: ResourceKind, raw: Value) -> Result<Self, ObjectError> {
        let metadata = raw.get("metadata");
        let name = metadata
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
            .ok_or(ObjectError::MissingName(kind))?
            .to_string();
        let namespace = metadata
            .and_then(|m| m.get("namespace"))
            .and_then(|n| n.as_str())
            .unwrap_or("default")
            .to_string();
        let uid = metadata
            .and_then(|m| m.get("uid"))
            .and_then(|u| u.as_str())
            .map(str::to_string);

        Ok(Self {
            kind,
            name,
            namespace,
            uid,
            raw: Arc::new(raw),
        })
    }

    /// Wrap a manifest, reading the kind from its `kind` field
    pub fn from_manifest(raw: Value) -> Result<Self, ObjectError> {
        let kind_str = raw
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or(ObjectError::MissingKind)?;
        let kind = ResourceKind::parse_optional(kind_str)
            .filter(|k| !k.is_synthetic())
            .ok_or_else(|| ObjectError::UnsupportedKind(kind_str.to_string()))?;
        Self::from_value(kind, raw)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// The full object as delivered by the source
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// True when both handles point at the same delivered object
    pub fn same_object(&self, other: &ResourceObject) -> bool {
        Arc::ptr_eq(&self.raw, &other.raw)
    }

    /// Look up a value by JSON pointer (e.g. `/spec/selector`)
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.raw.pointer(pointer)
    }

    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.get(pointer).and_then(|v| v.as_str())
    }

    /// Array at a JSON pointer, empty when absent or not an array
    pub fn array_at(&self, pointer: &str) -> &[Value] {
        self.get(pointer)
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn labels(&self) -> Option<&Map<String, Value>> {
        self.get("/metadata/labels").and_then(|l| l.as_object())
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels()
            .and_then(|labels| labels.get(key))
            .and_then(|v| v.as_str())
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.get("/metadata/annotations")
            .and_then(|a| a.get(key))
            .and_then(|v| v.as_str())
    }

    /// Secret `type` field (`Opaque` when unset, as the API server defaults it)
    pub fn secret_type(&self) -> &str {
        self.str_at("/type").unwrap_or("Opaque")
    }

    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        self.str_at("/metadata/creationTimestamp")
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// True if every `selector` entry is present with the same value in this
    /// object's labels. An empty selector matches nothing.
    pub fn matches_labels(&self, selector: &Map<String, Value>) -> bool {
        if selector.is_empty() {
            return false;
        }
        let Some(labels) = self.labels() else {
            return false;
        };
        selector
            .iter()
            .all(|(key, value)| labels.get(key).is_some_and(|v| v == value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_reads_metadata() {
        let obj = ResourceObject::from_value(
            ResourceKind::Pod,
            json!({
                "metadata": {"name": "web-1", "namespace": "prod", "uid": "abc"}
            }),
        )
        .unwrap();

        assert_eq!(obj.name(), "web-1");
        assert_eq!(obj.namespace(), "prod");
        assert_eq!(obj.uid(), Some("abc"));
        assert_eq!(obj.key(), ObjectKey::new("prod", "web-1"));
    }

    #[test]
    fn test_from_value_requires_name() {
        let err = ResourceObject::from_value(ResourceKind::Pod, json!({"metadata": {}}));
        assert_eq!(err.unwrap_err(), ObjectError::MissingName(ResourceKind::Pod));
    }

    #[test]
    fn test_from_manifest_rejects_unknown_and_synthetic_kinds() {
        let node = json!({"kind": "Node", "metadata": {"name": "n1"}});
        assert_eq!(
            ResourceObject::from_manifest(node).unwrap_err(),
            ObjectError::UnsupportedKind("Node".to_string())
        );

        let release = json!({"kind": "HelmRelease", "metadata": {"name": "r"}});
        assert!(ResourceObject::from_manifest(release).is_err());
    }

    #[test]
    fn test_secret_type_defaults_to_opaque() {
        let secret =
            ResourceObject::from_value(ResourceKind::Secret, json!({"metadata": {"name": "s"}}))
                .unwrap();
        assert_eq!(secret.secret_type(), "Opaque");
    }

    #[test]
    fn test_matches_labels() {
        let pod = ResourceObject::from_value(
            ResourceKind::Pod,
            json!({"metadata": {"name": "p", "labels": {"app": "x", "tier": "web"}}}),
        )
        .unwrap();

        let selector = json!({"app": "x"});
        assert!(pod.matches_labels(selector.as_object().unwrap()));

        let selector = json!({"app": "x", "tier": "db"});
        assert!(!pod.matches_labels(selector.as_object().unwrap()));

        let empty = Map::new();
        assert!(!pod.matches_labels(&empty));
    }
}
