//! Synchronization controller
//!
//! Owns the cached collections, the node/edge store and the watch
//! subscriptions. Every mutation goes through `&mut self`, so reconciliation
//! passes never overlap. Results are published through `tokio::sync::watch`
//! channels: the current snapshot, the hover highlight and the status.

use super::status::{ControllerStatus, LoadPhase};
use crate::graph::{
    self, DeriveContext, GraphSnapshot, GraphStore, Highlight, NodeDetails, NodeId, StyleTable,
};
use crate::models::ResourceKind;
use crate::watcher::{NamespaceScope, ResourceSource, ResourceState, Subscription, WatchEvent};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub struct GraphController {
    sources: Vec<Box<dyn ResourceSource>>,
    state: ResourceState,
    store: GraphStore,
    scope: NamespaceScope,
    status: ControllerStatus,
    subscriptions: Vec<Subscription>,
    event_tx: mpsc::UnboundedSender<WatchEvent>,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    revision: u64,
    loaded: bool,
    status_tx: watch::Sender<ControllerStatus>,
    snapshot_tx: watch::Sender<Arc<GraphSnapshot>>,
    highlight_tx: watch::Sender<Highlight>,
}

impl GraphController {
    pub fn new(sources: Vec<Box<dyn ResourceSource>>, scope: NamespaceScope) -> Self {
        Self::with_styles(sources, scope, StyleTable::default())
    }

    pub fn with_styles(
        sources: Vec<Box<dyn ResourceSource>>,
        scope: NamespaceScope,
        styles: StyleTable,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let status = ControllerStatus {
            kinds: sources
                .iter()
                .map(|s| (s.kind(), Default::default()))
                .collect(),
            ..Default::default()
        };
        let (status_tx, _) = watch::channel(status.clone());
        let (snapshot_tx, _) = watch::channel(Arc::new(GraphSnapshot::default()));
        let (highlight_tx, _) = watch::channel(Highlight::default());

        Self {
            sources,
            state: ResourceState::new(),
            store: GraphStore::new(styles),
            scope,
            status,
            subscriptions: Vec::new(),
            event_tx,
            event_rx,
            revision: 0,
            loaded: false,
            status_tx,
            snapshot_tx,
            highlight_tx,
        }
    }

    /// Initial load for the current scope
    ///
    /// Every kind is fetched concurrently; a failing kind is logged and
    /// contributes no objects. Each kind is then subscribed for changes, the
    /// graph is derived from scratch and a snapshot is published.
    pub async fn load(&mut self) {
        self.status.ready = false;
        self.publish_status();

        // Release old subscriptions and forget what they already queued
        self.subscriptions.clear();
        while self.event_rx.try_recv().is_ok() {}
        self.state.clear();
        self.store.clear();
        self.highlight_tx.send_replace(Highlight::default());

        let scope = self.scope.clone();
        let results = join_all(self.sources.iter().map(|s| s.load_all(&scope))).await;

        let mut total = 0;
        for (source, result) in self.sources.iter().zip(results) {
            let kind = source.kind();
            let entry = self.status.kinds.entry(kind).or_default();
            match result {
                Ok(objects) => {
                    if kind.counts_as_resource() {
                        total += objects.len();
                    }
                    tracing::debug!(%kind, count = objects.len(), "Loaded collection");
                    entry.phase = LoadPhase::Loaded;
                    entry.objects = objects.len();
                    entry.last_error = None;
                    self.state.replace(kind, objects);
                }
                Err(e) => {
                    tracing::warn!(%kind, "Failed to load collection: {}", e);
                    entry.phase = LoadPhase::Unloaded;
                    entry.objects = 0;
                    entry.last_error = Some(e.to_string());
                }
            }

            self.subscriptions
                .push(source.subscribe(&scope, self.event_tx.clone()));
            entry.phase = LoadPhase::Watching;
        }

        self.status.no_resources = total == 0;
        self.status.ready = true;
        self.loaded = true;
        tracing::info!(scope = %self.scope, objects = total, "Initial load complete");

        self.reconcile(true);
        self.publish_status();
    }

    /// Switch the namespace scope; a different scope forces a full reload
    pub async fn set_scope(&mut self, scope: NamespaceScope) -> bool {
        if self.loaded && scope == self.scope {
            return false;
        }
        tracing::info!(from = %self.scope, to = %scope, "Namespace scope changed");
        self.scope = scope;
        self.load().await;
        true
    }

    /// Fold one watch event into the cached collections
    ///
    /// Returns `true` if the collections changed.
    pub fn apply_event(&mut self, event: WatchEvent) -> bool {
        let kind = event.kind();
        let changed = match event {
            WatchEvent::Applied(object) => {
                if !self.scope.contains(object.namespace()) {
                    return false;
                }
                self.state.upsert(object);
                true
            }
            WatchEvent::Deleted {
                kind,
                namespace,
                name,
            } => self.state.remove(kind, &namespace, &name).is_some(),
            WatchEvent::Resynced {
                kind,
                namespace,
                objects,
            } => {
                let objects = objects
                    .into_iter()
                    .filter(|o| self.scope.contains(o.namespace()))
                    .collect();
                self.state
                    .replace_namespace(kind, namespace.as_deref(), objects);
                if let Some(entry) = self.status.kinds.get_mut(&kind) {
                    entry.last_error = None;
                }
                true
            }
            WatchEvent::Error { kind, message } => {
                tracing::warn!(%kind, "{}", message);
                self.status.kinds.entry(kind).or_default().last_error = Some(message);
                self.publish_status();
                false
            }
        };

        if changed {
            let count = self.state.count(kind);
            if let Some(entry) = self.status.kinds.get_mut(&kind) {
                entry.objects = count;
            }
        }
        changed
    }

    /// Apply one event and reconcile if it changed anything
    pub fn handle_event(&mut self, event: WatchEvent) -> bool {
        let changed = self.apply_event(event);
        if changed {
            self.refresh();
        }
        changed
    }

    /// Apply every queued event, then reconcile once
    ///
    /// Returns the number of events applied.
    pub fn process_pending(&mut self) -> usize {
        let mut count = 0;
        let mut changed = false;
        while let Ok(event) = self.event_rx.try_recv() {
            changed |= self.apply_event(event);
            count += 1;
        }
        if changed {
            self.refresh();
        }
        count
    }

    /// Reconcile the graph against the cached collections
    ///
    /// Removes nodes whose objects are gone, re-derives every relationship
    /// and publishes a snapshot if the graph visibly changed.
    pub fn refresh(&mut self) -> bool {
        self.remove_stale_nodes();
        let published = self.reconcile(false);
        self.publish_status();
        published
    }

    fn remove_stale_nodes(&mut self) {
        let stale: Vec<(NodeId, Option<NodeId>)> = self
            .store
            .nodes()
            .iter()
            .filter_map(|node| {
                let backing = node.backing.as_ref()?;
                if self.state.contains(backing) {
                    return None;
                }
                let release = node
                    .kind
                    .is_controller()
                    .then(|| graph::helm::release_name(backing))
                    .flatten()
                    .map(|name| NodeId::new(ResourceKind::HelmRelease, name));
                Some((node.id.clone(), release))
            })
            .collect();

        for (id, release) in stale {
            // A release whose only link is this controller goes with it
            let orphaned = release.filter(|r| self.store.edges_of(r).len() == 1);
            if let Some(release) = orphaned {
                self.store.remove_node(&release);
            }
            self.store.remove_node(&id);
            tracing::debug!(node = %id, "Removed node for deleted object");
        }
    }

    fn reconcile(&mut self, force_publish: bool) -> bool {
        let before = self.snapshot_tx.borrow().counts();
        let previous_empty = self.snapshot_tx.borrow().is_empty();

        let ctx = DeriveContext::new(&self.state, &self.scope);
        let summary = graph::reconcile(ctx, &mut self.store);

        let publish = force_publish
            || previous_empty
            || before != self.store.counts()
            || summary.presentation_changed;
        if publish {
            self.revision += 1;
            let snapshot = GraphSnapshot::from_store(&self.store, self.revision);
            tracing::debug!(
                revision = self.revision,
                nodes = snapshot.nodes.len(),
                links = snapshot.links.len(),
                "Publishing snapshot"
            );
            self.snapshot_tx.send_replace(Arc::new(snapshot));
            self.refresh_highlight();
        }
        publish
    }

    /// Run until the task is dropped
    ///
    /// Applies scope changes from `scope_rx` (including its current value)
    /// and coalesces bursts of watch events into one reconciliation pass.
    pub async fn run(&mut self, mut scope_rx: watch::Receiver<NamespaceScope>) {
        let initial = scope_rx.borrow_and_update().clone();
        self.set_scope(initial).await;

        let mut scope_open = true;
        loop {
            tokio::select! {
                changed = scope_rx.changed(), if scope_open => {
                    if changed.is_err() {
                        scope_open = false;
                        continue;
                    }
                    let scope = scope_rx.borrow_and_update().clone();
                    self.set_scope(scope).await;
                }
                event = self.event_rx.recv() => {
                    let Some(event) = event else { break };
                    let mut changed = self.apply_event(event);
                    while let Ok(event) = self.event_rx.try_recv() {
                        changed |= self.apply_event(event);
                    }
                    if changed {
                        self.refresh();
                    }
                }
            }
        }
    }

    /// Highlight the edges of a hovered node (`None` clears)
    pub fn on_node_hover(&mut self, node: Option<&str>) -> Highlight {
        let highlight = match node.filter(|id| self.store.contains(*id)) {
            Some(id) => Highlight {
                node: self.store.node(id).map(|n| n.id.clone()),
                links: self.store.edges_of(id).into_iter().cloned().collect(),
            },
            None => Highlight::default(),
        };
        self.highlight_tx.send_replace(highlight.clone());
        highlight
    }

    /// Dragging highlights like hovering
    pub fn on_node_drag(&mut self, node: Option<&str>) -> Highlight {
        self.on_node_hover(node)
    }

    /// Navigation target of a clicked node
    pub fn on_node_click(&self, node: &str) -> Option<String> {
        self.store.node(node).and_then(graph::navigation_target)
    }

    /// Tooltip details of a node
    pub fn describe_node(&self, node: &str) -> Option<NodeDetails> {
        let node = self.store.node(node)?;
        Some(node.detail.describe(node, &self.state))
    }

    fn refresh_highlight(&mut self) {
        let hovered = self.highlight_tx.borrow().node.clone();
        if let Some(id) = hovered {
            self.on_node_hover(Some(id.as_str()));
        }
    }

    /// Release every watch subscription
    pub fn shutdown(&mut self) {
        self.subscriptions.clear();
        tracing::debug!("Released watch subscriptions");
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status.clone());
    }

    pub fn is_ready(&self) -> bool {
        self.status.ready
    }

    pub fn no_resources(&self) -> bool {
        self.status.no_resources
    }

    pub fn status(&self) -> &ControllerStatus {
        &self.status
    }

    pub fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn highlight(&self) -> Highlight {
        self.highlight_tx.borrow().clone()
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<Arc<GraphSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ControllerStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_highlight(&self) -> watch::Receiver<Highlight> {
        self.highlight_tx.subscribe()
    }

    /// Sender feeding this controller's event queue
    pub fn event_sender(&self) -> mpsc::UnboundedSender<WatchEvent> {
        self.event_tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceObject;
    use crate::watcher::{MockResourceSource, SourceError};
    use serde_json::json;

    fn object(kind: ResourceKind, value: serde_json::Value) -> ResourceObject {
        ResourceObject::from_value(kind, value).unwrap()
    }

    fn mock_source(
        kind: ResourceKind,
        result: impl Fn() -> Result<Vec<ResourceObject>, SourceError> + Send + 'static,
    ) -> Box<dyn ResourceSource> {
        let mut source = MockResourceSource::new();
        source.expect_kind().return_const(kind);
        source.expect_load_all().returning(move |_| result());
        source
            .expect_subscribe()
            .returning(|_, _| Subscription::noop());
        Box::new(source)
    }

    #[tokio::test]
    async fn test_failed_kind_does_not_abort_load() {
        let sources = vec![
            mock_source(ResourceKind::Pod, || {
                Ok(vec![object(
                    ResourceKind::Pod,
                    json!({"metadata": {"name": "p"}, "status": {"phase": "Running"}}),
                )])
            }),
            mock_source(ResourceKind::Service, || {
                Err(SourceError::InvalidObject(
                    crate::models::ObjectError::MissingKind,
                ))
            }),
        ];
        let mut controller = GraphController::new(sources, NamespaceScope::All);
        controller.load().await;

        assert!(controller.is_ready());
        assert!(!controller.no_resources());
        let pods = controller.status().kind(ResourceKind::Pod).unwrap();
        assert_eq!(pods.phase, LoadPhase::Watching);
        assert_eq!(pods.objects, 1);
        let services = controller.status().kind(ResourceKind::Service).unwrap();
        assert_eq!(services.phase, LoadPhase::Watching);
        assert!(services.last_error.is_some());
        assert_eq!(controller.snapshot().counts(), (1, 0));
    }

    #[tokio::test]
    async fn test_config_maps_alone_are_no_resources() {
        let sources = vec![
            mock_source(ResourceKind::ConfigMap, || {
                Ok(vec![object(
                    ResourceKind::ConfigMap,
                    json!({"metadata": {"name": "cm"}}),
                )])
            }),
            mock_source(ResourceKind::Pod, || Ok(Vec::new())),
        ];
        let mut controller = GraphController::new(sources, NamespaceScope::All);
        controller.load().await;

        assert!(controller.is_ready());
        assert!(controller.no_resources());
    }

    #[tokio::test]
    async fn test_load_publishes_status() {
        let sources = vec![mock_source(ResourceKind::Pod, || Ok(Vec::new()))];
        let mut controller = GraphController::new(sources, NamespaceScope::All);
        let status_rx = controller.subscribe_status();
        assert!(!status_rx.borrow().ready);

        controller.load().await;
        assert!(status_rx.borrow().ready);
    }

    #[tokio::test]
    async fn test_events_outside_scope_are_ignored() {
        let sources = vec![mock_source(ResourceKind::Pod, || Ok(Vec::new()))];
        let mut controller =
            GraphController::new(sources, NamespaceScope::from_namespaces(["prod"]));
        controller.load().await;

        let outside = object(
            ResourceKind::Pod,
            json!({"metadata": {"name": "p", "namespace": "dev"}}),
        );
        assert!(!controller.handle_event(WatchEvent::Applied(outside)));
        assert!(controller.store().is_empty());
    }

    #[tokio::test]
    async fn test_watch_error_is_recorded() {
        let sources = vec![mock_source(ResourceKind::Pod, || Ok(Vec::new()))];
        let mut controller = GraphController::new(sources, NamespaceScope::All);
        controller.load().await;

        controller.handle_event(WatchEvent::Error {
            kind: ResourceKind::Pod,
            message: "Pod watcher error (1): boom".to_string(),
        });
        let failed: Vec<_> = controller.status().failed_kinds().collect();
        assert_eq!(failed, vec![(ResourceKind::Pod, "Pod watcher error (1): boom")]);
    }
}
