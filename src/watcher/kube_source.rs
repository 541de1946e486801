//! Live cluster sources backed by `kube::runtime::watcher`

use super::{NamespaceScope, ResourceSource, SourceError, Subscription, WatchEvent};
use crate::models::{ResourceKind, ResourceObject};
use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ListParams;
use kube::core::NamespaceResourceScope;
use kube::runtime::watcher;
use kube::{Api, Client, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;
use tokio::sync::mpsc;

const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Bounds every watched k8s-openapi type satisfies
pub trait WatchableResource:
    kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> WatchableResource for K where
    K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// A kind's collection read from the API server
pub struct KubeSource<K> {
    client: Client,
    kind: ResourceKind,
    _resource: PhantomData<fn() -> K>,
}

impl<K: WatchableResource> KubeSource<K> {
    pub fn new(client: Client, kind: ResourceKind) -> Self {
        Self {
            client,
            kind,
            _resource: PhantomData,
        }
    }

    /// One API handle per namespace in scope (`Api::all` for every namespace)
    fn apis(&self, scope: &NamespaceScope) -> Vec<(Option<String>, Api<K>)> {
        match scope.namespaces() {
            Some(namespaces) => namespaces
                .map(|ns| {
                    (
                        Some(ns.to_string()),
                        Api::namespaced(self.client.clone(), ns),
                    )
                })
                .collect(),
            None => vec![(None, Api::all(self.client.clone()))],
        }
    }
}

fn to_object<K: WatchableResource>(
    kind: ResourceKind,
    obj: &K,
) -> Result<ResourceObject, SourceError> {
    let value =
        serde_json::to_value(obj).map_err(|source| SourceError::Serialize { kind, source })?;
    Ok(ResourceObject::from_value(kind, value)?)
}

#[async_trait]
impl<K: WatchableResource> ResourceSource for KubeSource<K> {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn load_all(&self, scope: &NamespaceScope) -> Result<Vec<ResourceObject>, SourceError> {
        let mut objects = Vec::new();
        for (_, api) in self.apis(scope) {
            let list = api
                .list(&ListParams::default())
                .await
                .map_err(|source| SourceError::Api {
                    kind: self.kind,
                    source,
                })?;
            for item in &list.items {
                objects.push(to_object(self.kind, item)?);
            }
        }
        tracing::debug!(kind = %self.kind, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    fn subscribe(
        &self,
        scope: &NamespaceScope,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Subscription {
        let handles = self
            .apis(scope)
            .into_iter()
            .map(|(namespace, api)| {
                tokio::spawn(watch_loop(self.kind, namespace, api, events.clone()))
            })
            .collect();
        Subscription::from_handles(handles)
    }
}

/// Forward watcher events for one API handle until the receiver goes away
/// or the stream keeps failing.
///
/// Initial listings (`Init` .. `InitDone`) are buffered and sent as a single
/// `Resynced` event so objects deleted during a reconnect are dropped too.
async fn watch_loop<K: WatchableResource>(
    kind: ResourceKind,
    namespace: Option<String>,
    api: Api<K>,
    event_tx: mpsc::UnboundedSender<WatchEvent>,
) {
    let mut stream = Box::pin(watcher(api, watcher::Config::default()));
    let mut error_count = 0u32;
    let mut init_buffer: Option<Vec<ResourceObject>> = None;

    while let Some(event) = stream.next().await {
        let outgoing = match event {
            Ok(watcher::Event::Init) => {
                error_count = 0;
                init_buffer = Some(Vec::new());
                None
            }
            Ok(watcher::Event::InitApply(obj)) => {
                error_count = 0;
                match to_object(kind, &obj) {
                    Ok(object) => match init_buffer.as_mut() {
                        Some(buffer) => {
                            buffer.push(object);
                            None
                        }
                        None => Some(WatchEvent::Applied(object)),
                    },
                    Err(e) => {
                        tracing::warn!(%kind, name = %obj.name_any(), "Skipping object: {}", e);
                        None
                    }
                }
            }
            Ok(watcher::Event::InitDone) => {
                error_count = 0;
                Some(WatchEvent::Resynced {
                    kind,
                    namespace: namespace.clone(),
                    objects: init_buffer.take().unwrap_or_default(),
                })
            }
            Ok(watcher::Event::Apply(obj)) => {
                error_count = 0;
                match to_object(kind, &obj) {
                    Ok(object) => Some(WatchEvent::Applied(object)),
                    Err(e) => {
                        tracing::warn!(%kind, name = %obj.name_any(), "Skipping object: {}", e);
                        None
                    }
                }
            }
            Ok(watcher::Event::Delete(obj)) => {
                error_count = 0;
                Some(WatchEvent::Deleted {
                    kind,
                    namespace: obj.namespace().unwrap_or_else(|| "default".to_string()),
                    name: obj.name_any(),
                })
            }
            Err(e) => {
                error_count += 1;
                // Only report occasionally to avoid spam
                if error_count == 1 || error_count.is_multiple_of(10) {
                    let _ = event_tx.send(WatchEvent::Error {
                        kind,
                        message: format!("{} watcher error ({}): {}", kind, error_count, e),
                    });
                }
                if error_count >= MAX_CONSECUTIVE_ERRORS {
                    let _ = event_tx.send(WatchEvent::Error {
                        kind,
                        message: format!(
                            "{} watcher stopped after {} consecutive errors",
                            kind, error_count
                        ),
                    });
                    break;
                }
                tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                None
            }
        };

        let Some(event) = outgoing else {
            continue;
        };
        if event_tx.send(event).is_err() {
            tracing::debug!(%kind, "Event receiver dropped, stopping watcher");
            break;
        }
    }
}

/// Live source for one kind, `None` for synthetic kinds
pub fn kube_source(client: Client, kind: ResourceKind) -> Option<Box<dyn ResourceSource>> {
    let source: Box<dyn ResourceSource> = match kind {
        ResourceKind::Pod => Box::new(KubeSource::<Pod>::new(client, kind)),
        ResourceKind::Deployment => Box::new(KubeSource::<Deployment>::new(client, kind)),
        ResourceKind::StatefulSet => Box::new(KubeSource::<StatefulSet>::new(client, kind)),
        ResourceKind::DaemonSet => Box::new(KubeSource::<DaemonSet>::new(client, kind)),
        ResourceKind::Service => Box::new(KubeSource::<Service>::new(client, kind)),
        ResourceKind::Ingress => Box::new(KubeSource::<Ingress>::new(client, kind)),
        ResourceKind::Secret => Box::new(KubeSource::<Secret>::new(client, kind)),
        ResourceKind::ConfigMap => Box::new(KubeSource::<ConfigMap>::new(client, kind)),
        ResourceKind::PersistentVolumeClaim => {
            Box::new(KubeSource::<PersistentVolumeClaim>::new(client, kind))
        }
        ResourceKind::HelmRelease => return None,
    };
    Some(source)
}

/// Live sources for every watched kind
pub fn kube_sources(client: Client) -> Vec<Box<dyn ResourceSource>> {
    ResourceKind::watched()
        .iter()
        .filter_map(|kind| kube_source(client.clone(), *kind))
        .collect()
}
