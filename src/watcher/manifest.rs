//! Static manifest sources
//!
//! Reads YAML or JSON manifests from disk so a map can be rendered without a
//! cluster. Files may hold several `---` separated documents and `List`
//! objects; kinds the map does not show are skipped.

use super::{NamespaceScope, ResourceSource, SourceError, Subscription, WatchEvent};
use crate::models::{ObjectError, ResourceKind, ResourceObject};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

enum Contents {
    Files(Vec<PathBuf>),
    Objects(Vec<ResourceObject>),
}

/// A kind's collection backed by manifests
///
/// Static: `subscribe` never delivers events.
pub struct ManifestSource {
    kind: ResourceKind,
    contents: Contents,
}

impl ManifestSource {
    /// Read `paths` on every load, keeping objects of `kind`
    pub fn from_files(kind: ResourceKind, paths: Vec<PathBuf>) -> Self {
        Self {
            kind,
            contents: Contents::Files(paths),
        }
    }

    /// Serve already-parsed objects, keeping those of `kind`
    pub fn from_objects(kind: ResourceKind, objects: Vec<ResourceObject>) -> Self {
        let objects = objects.into_iter().filter(|o| o.kind() == kind).collect();
        Self {
            kind,
            contents: Contents::Objects(objects),
        }
    }
}

#[async_trait]
impl ResourceSource for ManifestSource {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn load_all(&self, scope: &NamespaceScope) -> Result<Vec<ResourceObject>, SourceError> {
        let objects = match &self.contents {
            Contents::Objects(objects) => objects.clone(),
            Contents::Files(paths) => read_manifests(paths)
                .await?
                .into_iter()
                .filter(|o| o.kind() == self.kind)
                .collect(),
        };
        Ok(objects
            .into_iter()
            .filter(|o| scope.contains(o.namespace()))
            .collect())
    }

    fn subscribe(
        &self,
        _scope: &NamespaceScope,
        _events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Subscription {
        Subscription::noop()
    }
}

/// One source per watched kind, all serving `objects`
pub fn manifest_sources(objects: &[ResourceObject]) -> Vec<Box<dyn ResourceSource>> {
    ResourceKind::watched()
        .iter()
        .map(|kind| -> Box<dyn ResourceSource> {
            Box::new(ManifestSource::from_objects(*kind, objects.to_vec()))
        })
        .collect()
}

/// Read and parse every manifest in `paths`
pub async fn read_manifests(paths: &[PathBuf]) -> Result<Vec<ResourceObject>, SourceError> {
    let mut objects = Vec::new();
    for path in paths {
        tracing::debug!("Reading manifest: {:?}", path);
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SourceError::Io {
                    path: path.clone(),
                    source,
                })?;
        objects.extend(parse_manifests(path, &content)?);
    }
    Ok(objects)
}

/// Parse a (possibly multi-document) manifest string
pub fn parse_manifests(path: &Path, content: &str) -> Result<Vec<ResourceObject>, SourceError> {
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        collect_objects(value, &mut objects);
    }
    Ok(objects)
}

fn collect_objects(value: Value, out: &mut Vec<ResourceObject>) {
    if value.is_null() {
        return;
    }
    if value.get("kind").and_then(|k| k.as_str()) == Some("List") {
        if let Some(Value::Array(items)) = value.get("items") {
            for item in items {
                collect_objects(item.clone(), out);
            }
        }
        return;
    }

    match ResourceObject::from_manifest(value) {
        Ok(object) => out.push(object),
        Err(ObjectError::UnsupportedKind(kind)) => {
            tracing::debug!("Skipping unsupported kind: {}", kind);
        }
        Err(e) => tracing::warn!("Skipping manifest document: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_document_and_lists() {
        let content = r#"
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: prod
---
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: Pod
    metadata:
      name: web-1
      namespace: prod
  - apiVersion: v1
    kind: Namespace
    metadata:
      name: prod
"#;
        let objects = parse_manifests(Path::new("test.yaml"), content).unwrap();
        let names: Vec<(ResourceKind, &str)> =
            objects.iter().map(|o| (o.kind(), o.name())).collect();
        assert_eq!(
            names,
            vec![(ResourceKind::Service, "web"), (ResourceKind::Pod, "web-1")]
        );
    }

    #[test]
    fn test_parse_json_manifest() {
        let content = r#"{"kind": "Secret", "metadata": {"name": "creds"}, "type": "Opaque"}"#;
        let objects = parse_manifests(Path::new("secret.json"), content).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].namespace(), "default");
    }

    #[test]
    fn test_parse_error_reports_path() {
        let err = parse_manifests(Path::new("broken.yaml"), "kind: [unclosed").unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[tokio::test]
    async fn test_load_all_filters_kind_and_scope() {
        let content = r#"
kind: Pod
metadata: {name: a, namespace: one}
---
kind: Pod
metadata: {name: b, namespace: two}
---
kind: Service
metadata: {name: s, namespace: one}
"#;
        let objects = parse_manifests(Path::new("m.yaml"), content).unwrap();
        let source = ManifestSource::from_objects(ResourceKind::Pod, objects);

        let all = source.load_all(&NamespaceScope::All).await.unwrap();
        assert_eq!(all.len(), 2);

        let scoped = source
            .load_all(&NamespaceScope::from_namespaces(["two"]))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name(), "b");
    }
}
