//! Relationship deriver
//!
//! One rule per kind. A rule reads its object plus the cached collections and
//! upserts the nodes and edges the object implies. Rules are independent of
//! each other's order: node dedup in the store makes repeated upserts safe, and
//! a reference that resolves to nothing simply yields no edge.

use super::helm::{self, RELEASE_SECRET_TYPE};
use super::node::NodeId;
use super::presentation::backend_service_name;
use super::store::{GraphStore, PassSummary};
use crate::models::{ResourceKind, ResourceObject};
use crate::watcher::{NamespaceScope, ResourceState};
use serde_json::Value;

pub const SERVICE_ACCOUNT_TOKEN_TYPE: &str = "kubernetes.io/service-account-token";
pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

/// Read access shared by every rule
#[derive(Debug, Clone, Copy)]
pub struct DeriveContext<'a> {
    pub state: &'a ResourceState,
    pub scope: &'a NamespaceScope,
}

impl<'a> DeriveContext<'a> {
    pub fn new(state: &'a ResourceState, scope: &'a NamespaceScope) -> Self {
        Self { state, scope }
    }

    fn lookup(&self, kind: ResourceKind, name: &str, namespace: &str) -> Option<&'a ResourceObject> {
        self.state.get_by_name(kind, name, namespace)
    }
}

/// Run a full reconciliation pass: derive everything, then sweep what was
/// not re-derived
pub fn reconcile(ctx: DeriveContext<'_>, store: &mut GraphStore) -> PassSummary {
    store.begin_pass();
    derive_all(ctx, store);
    let summary = store.end_pass();
    tracing::debug!(
        nodes = store.nodes().len(),
        edges = store.edges().len(),
        swept_nodes = summary.removed_nodes,
        swept_edges = summary.removed_edges,
        "Reconciliation pass complete"
    );
    summary
}

/// Apply every rule to every object in scope
pub fn derive_all(ctx: DeriveContext<'_>, store: &mut GraphStore) {
    for pod in ctx.state.all_by_namespaces(ResourceKind::Pod, ctx.scope) {
        derive_pod(pod, ctx, store);
    }
    for secret in ctx.state.all_by_namespaces(ResourceKind::Secret, ctx.scope) {
        derive_secret(secret, ctx, store);
    }
    for pvc in ctx
        .state
        .all_by_namespaces(ResourceKind::PersistentVolumeClaim, ctx.scope)
    {
        derive_volume_claim(pvc, store);
    }
    for kind in [
        ResourceKind::Deployment,
        ResourceKind::StatefulSet,
        ResourceKind::DaemonSet,
    ] {
        for controller in ctx.state.all_by_namespaces(kind, ctx.scope) {
            derive_controller(controller, ctx, store);
        }
    }
    for service in ctx.state.all_by_namespaces(ResourceKind::Service, ctx.scope) {
        derive_service(service, ctx, store);
    }
    for ingress in ctx.state.all_by_namespaces(ResourceKind::Ingress, ctx.scope) {
        derive_ingress(ingress, ctx, store);
    }
}

/// Containers and init containers of a pod
fn containers(pod: &ResourceObject) -> impl Iterator<Item = &Value> {
    pod.array_at("/spec/containers")
        .iter()
        .chain(pod.array_at("/spec/initContainers"))
}

fn array<'v>(value: &'v Value, key: &str) -> &'v [Value] {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn str_at<'v>(value: &'v Value, pointer: &str) -> Option<&'v str> {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Names of secrets a pod's containers reference through env or envFrom
fn env_secret_refs(pod: &ResourceObject) -> Vec<&str> {
    let mut names = Vec::new();
    for container in containers(pod) {
        for env in array(container, "env") {
            names.extend(str_at(env, "/valueFrom/secretKeyRef/name"));
        }
        for env_from in array(container, "envFrom") {
            names.extend(str_at(env_from, "/secretRef/name"));
        }
    }
    names
}

/// Secret node, unless the secret is a service account token
fn secret_node(store: &mut GraphStore, secret: &ResourceObject) -> Option<NodeId> {
    if secret.secret_type() == SERVICE_ACCOUNT_TOKEN_TYPE {
        return None;
    }
    Some(store.upsert_node(secret))
}

fn link_secret(
    ctx: DeriveContext<'_>,
    store: &mut GraphStore,
    from: &NodeId,
    name: &str,
    namespace: &str,
) {
    let Some(secret) = ctx.lookup(ResourceKind::Secret, name, namespace) else {
        return;
    };
    if let Some(secret_id) = secret_node(store, secret) {
        store.add_edge(from, &secret_id);
    }
}

fn link_lookup(
    ctx: DeriveContext<'_>,
    store: &mut GraphStore,
    from: &NodeId,
    kind: ResourceKind,
    name: &str,
    namespace: &str,
) {
    if let Some(object) = ctx.lookup(kind, name, namespace) {
        let id = store.upsert_node(object);
        store.add_edge(from, &id);
    }
}

/// Pod: secrets and config maps from env/envFrom, claim/config map/secret
/// volumes and image pull secrets
pub fn derive_pod(pod: &ResourceObject, ctx: DeriveContext<'_>, store: &mut GraphStore) -> NodeId {
    let pod_id = store.upsert_node(pod);
    let ns = pod.namespace();

    for container in containers(pod) {
        for env in array(container, "env") {
            if let Some(name) = str_at(env, "/valueFrom/secretKeyRef/name") {
                link_secret(ctx, store, &pod_id, name, ns);
            }
            if let Some(name) = str_at(env, "/valueFrom/configMapKeyRef/name") {
                link_lookup(ctx, store, &pod_id, ResourceKind::ConfigMap, name, ns);
            }
        }
        for env_from in array(container, "envFrom") {
            if let Some(name) = str_at(env_from, "/configMapRef/name") {
                link_lookup(ctx, store, &pod_id, ResourceKind::ConfigMap, name, ns);
            }
            if let Some(name) = str_at(env_from, "/secretRef/name") {
                link_secret(ctx, store, &pod_id, name, ns);
            }
        }
    }

    for volume in pod.array_at("/spec/volumes") {
        if let Some(claim) = str_at(volume, "/persistentVolumeClaim/claimName") {
            link_lookup(
                ctx,
                store,
                &pod_id,
                ResourceKind::PersistentVolumeClaim,
                claim,
                ns,
            );
        }
        if let Some(name) = str_at(volume, "/configMap/name") {
            link_lookup(ctx, store, &pod_id, ResourceKind::ConfigMap, name, ns);
        }
        if let Some(name) = str_at(volume, "/secret/secretName") {
            link_secret(ctx, store, &pod_id, name, ns);
        }
    }

    for pull_secret in pod.array_at("/spec/imagePullSecrets") {
        if let Some(name) = str_at(pull_secret, "/name") {
            link_secret(ctx, store, &pod_id, name, ns);
        }
    }

    pod_id
}

/// Deployment, StatefulSet or DaemonSet: child pods and Helm release
pub fn derive_controller(
    controller: &ResourceObject,
    ctx: DeriveContext<'_>,
    store: &mut GraphStore,
) -> NodeId {
    let controller_id = store.upsert_node(controller);

    for pod in ctx.state.child_pods(controller) {
        let pod_id = derive_pod(pod, ctx, store);
        store.add_edge(&controller_id, &pod_id);
    }

    if let Some(release) = helm::release_name(controller) {
        let release_id = store.upsert_helm_release(release, controller.namespace());
        store.add_edge(&controller_id, &release_id);
    }

    controller_id
}

/// Secret: Helm release grouping and back-links from pods already on the map
///
/// Service account tokens and TLS secrets are skipped.
pub fn derive_secret(
    secret: &ResourceObject,
    _ctx: DeriveContext<'_>,
    store: &mut GraphStore,
) -> Option<NodeId> {
    let secret_type = secret.secret_type();
    if secret_type == SERVICE_ACCOUNT_TOKEN_TYPE || secret_type == TLS_SECRET_TYPE {
        return None;
    }
    let secret_id = store.upsert_node(secret);

    let release = secret
        .label("name")
        .filter(|n| !n.is_empty() && secret_type == RELEASE_SECRET_TYPE);
    if let Some(release) = release {
        let release_id = store.upsert_helm_release(release, secret.namespace());
        store.add_edge(&secret_id, &release_id);
    }

    let referencing: Vec<NodeId> = store
        .nodes_of_kind(ResourceKind::Pod)
        .filter(|node| node.namespace == secret.namespace())
        .filter(|node| {
            node.backing
                .as_ref()
                .is_some_and(|pod| env_secret_refs(pod).contains(&secret.name()))
        })
        .map(|node| node.id.clone())
        .collect();
    for pod_id in referencing {
        store.add_edge(&pod_id, &secret_id);
    }

    Some(secret_id)
}

/// Persistent volume claim: node only
pub fn derive_volume_claim(pvc: &ResourceObject, store: &mut GraphStore) -> NodeId {
    store.upsert_node(pvc)
}

/// Service: pods in the same namespace matching every selector entry
///
/// An empty or absent selector matches nothing. Only pods that already have
/// a node are linked.
pub fn derive_service(
    service: &ResourceObject,
    ctx: DeriveContext<'_>,
    store: &mut GraphStore,
) -> NodeId {
    let service_id = store.upsert_node(service);

    let Some(selector) = service.get("/spec/selector").and_then(|s| s.as_object()) else {
        return service_id;
    };

    let matching: Vec<NodeId> = ctx
        .state
        .all(ResourceKind::Pod)
        .filter(|pod| pod.namespace() == service.namespace() && pod.matches_labels(selector))
        .filter_map(|pod| store.find_node(ResourceKind::Pod, pod.name()))
        .map(|node| node.id.clone())
        .collect();
    for pod_id in matching {
        store.add_edge(&pod_id, &service_id);
    }

    service_id
}

/// Ingress: TLS secrets and backend services
pub fn derive_ingress(
    ingress: &ResourceObject,
    ctx: DeriveContext<'_>,
    store: &mut GraphStore,
) -> NodeId {
    let ingress_id = store.upsert_node(ingress);
    let ns = ingress.namespace();

    for tls in ingress.array_at("/spec/tls") {
        if let Some(name) = str_at(tls, "/secretName") {
            link_secret(ctx, store, &ingress_id, name, ns);
        }
    }

    let mut backends: Vec<&Value> = Vec::new();
    backends.extend(ingress.get("/spec/defaultBackend"));
    backends.extend(ingress.get("/spec/backend"));
    for rule in ingress.array_at("/spec/rules") {
        let paths = rule
            .pointer("/http/paths")
            .and_then(|p| p.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        backends.extend(paths.iter().filter_map(|p| p.get("backend")));
    }

    for backend in backends {
        if let Some(name) = backend_service_name(backend) {
            link_lookup(ctx, store, &ingress_id, ResourceKind::Service, name, ns);
        }
    }

    ingress_id
}
