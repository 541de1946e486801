//! Relationship derivation tests
//!
//! Full reconciliation passes over hand-built collections.

use base64::Engine;
use kube_resource_map::graph::derive::{derive_ingress, derive_service};
use kube_resource_map::graph::{DeriveContext, GraphStore, NodeId, PodHealth, reconcile};
use kube_resource_map::models::{ResourceKind, ResourceObject};
use kube_resource_map::watcher::{NamespaceScope, ResourceState};
use serde_json::{Value, json};

fn object(kind: ResourceKind, value: Value) -> ResourceObject {
    ResourceObject::from_value(kind, value).unwrap()
}

fn derive(state: &ResourceState) -> GraphStore {
    let scope = NamespaceScope::All;
    let mut store = GraphStore::default();
    reconcile(DeriveContext::new(state, &scope), &mut store);
    store
}

fn id(kind: ResourceKind, name: &str) -> NodeId {
    NodeId::new(kind, name)
}

#[test]
fn test_helm_deployment_with_pod() {
    let mut state = ResourceState::new();
    state.upsert(object(
        ResourceKind::Deployment,
        json!({
            "metadata": {
                "name": "web",
                "namespace": "default",
                "labels": {"heritage": "Helm", "release": "rel1"}
            },
            "spec": {"template": {"metadata": {"labels": {"app": "web"}}}}
        }),
    ));
    state.upsert(object(
        ResourceKind::Pod,
        json!({
            "metadata": {"name": "web-1", "namespace": "default", "labels": {"app": "web"}},
            "status": {"phase": "Running"}
        }),
    ));

    let store = derive(&state);

    assert_eq!(store.counts(), (3, 2));
    let deploy = id(ResourceKind::Deployment, "web");
    assert!(store.has_edge(&deploy, &id(ResourceKind::Pod, "web-1")));
    assert!(store.has_edge(&deploy, &id(ResourceKind::HelmRelease, "rel1")));

    let release = store.node(&id(ResourceKind::HelmRelease, "rel1")).unwrap();
    assert!(release.is_synthetic());
    assert_eq!(release.namespace, "default");

    let pod = store.node(&id(ResourceKind::Pod, "web-1")).unwrap();
    assert_eq!(pod.color_hint, PodHealth::Healthy.color());
}

#[test]
fn test_service_selector_links_matching_pods_in_namespace() {
    let mut state = ResourceState::new();
    for (name, ns, app) in [
        ("api-1", "default", "api"),
        ("api-2", "default", "api"),
        ("worker", "default", "worker"),
        ("api-other", "other", "api"),
    ] {
        state.upsert(object(
            ResourceKind::Pod,
            json!({"metadata": {"name": name, "namespace": ns, "labels": {"app": app, "tier": "backend"}}}),
        ));
    }
    state.upsert(object(
        ResourceKind::Service,
        json!({"metadata": {"name": "api", "namespace": "default"}, "spec": {"selector": {"app": "api"}}}),
    ));
    state.upsert(object(
        ResourceKind::Service,
        json!({"metadata": {"name": "headless", "namespace": "default"}, "spec": {"clusterIP": "None"}}),
    ));

    let store = derive(&state);

    let api = id(ResourceKind::Service, "api");
    let linked: Vec<_> = store
        .edges_of(&api)
        .into_iter()
        .filter_map(|e| e.other(api.as_str()))
        .map(|n| n.as_str().to_string())
        .collect();
    assert_eq!(linked.len(), 2);
    assert!(linked.contains(&"Pod-api-1".to_string()));
    assert!(linked.contains(&"Pod-api-2".to_string()));

    // No selector, no edges
    assert!(store.edges_of(&id(ResourceKind::Service, "headless")).is_empty());
}

#[test]
fn test_service_links_only_pods_already_on_the_map() {
    let mut state = ResourceState::new();
    state.upsert(object(
        ResourceKind::Pod,
        json!({"metadata": {"name": "api-1", "labels": {"app": "api"}}}),
    ));
    let service = object(
        ResourceKind::Service,
        json!({"metadata": {"name": "api"}, "spec": {"selector": {"app": "api"}}}),
    );

    let scope = NamespaceScope::All;
    let mut store = GraphStore::default();
    derive_service(&service, DeriveContext::new(&state, &scope), &mut store);

    assert_eq!(store.counts(), (1, 0));
}

#[test]
fn test_service_account_tokens_never_appear() {
    let mut state = ResourceState::new();
    state.upsert(object(
        ResourceKind::Secret,
        json!({
            "metadata": {"name": "default-token-abc"},
            "type": "kubernetes.io/service-account-token"
        }),
    ));
    state.upsert(object(
        ResourceKind::Pod,
        json!({
            "metadata": {"name": "app"},
            "spec": {
                "containers": [{"name": "c", "envFrom": [{"secretRef": {"name": "default-token-abc"}}]}],
                "volumes": [{"name": "token", "secret": {"secretName": "default-token-abc"}}]
            }
        }),
    ));

    let store = derive(&state);

    assert!(store.find_node(ResourceKind::Secret, "default-token-abc").is_none());
    assert_eq!(store.counts(), (1, 0));
}

#[test]
fn test_secrets_and_claims_get_nodes_but_config_maps_only_when_referenced() {
    let mut state = ResourceState::new();
    state.upsert(object(ResourceKind::Secret, json!({"metadata": {"name": "creds"}})));
    state.upsert(object(
        ResourceKind::PersistentVolumeClaim,
        json!({"metadata": {"name": "data"}}),
    ));
    state.upsert(object(ResourceKind::ConfigMap, json!({"metadata": {"name": "unused"}})));
    state.upsert(object(ResourceKind::ConfigMap, json!({"metadata": {"name": "settings"}})));
    state.upsert(object(
        ResourceKind::Pod,
        json!({
            "metadata": {"name": "app"},
            "spec": {"containers": [{
                "name": "c",
                "env": [{"name": "MODE", "valueFrom": {"configMapKeyRef": {"name": "settings", "key": "mode"}}}]
            }]}
        }),
    ));

    let store = derive(&state);

    assert!(store.find_node(ResourceKind::Secret, "creds").is_some());
    assert!(store.find_node(ResourceKind::PersistentVolumeClaim, "data").is_some());
    assert!(store.find_node(ResourceKind::ConfigMap, "unused").is_none());
    assert!(store.has_edge(
        &id(ResourceKind::Pod, "app"),
        &id(ResourceKind::ConfigMap, "settings")
    ));
}

#[test]
fn test_ingress_links_tls_secret_and_backend_service() {
    let mut state = ResourceState::new();
    let tls = object(
        ResourceKind::Secret,
        json!({"metadata": {"name": "tls-sec"}, "type": "kubernetes.io/tls"}),
    );
    let svc = object(ResourceKind::Service, json!({"metadata": {"name": "svc1"}}));
    state.upsert(tls.clone());
    state.upsert(svc.clone());

    let mut store = GraphStore::default();
    store.upsert_node(&tls);
    store.upsert_node(&svc);

    let ingress = object(
        ResourceKind::Ingress,
        json!({
            "metadata": {"name": "ing1"},
            "spec": {
                "tls": [{"hosts": ["example.com"], "secretName": "tls-sec"}],
                "rules": [{
                    "host": "example.com",
                    "http": {"paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": {"service": {"name": "svc1", "port": {"number": 80}}}
                    }]}
                }]
            }
        }),
    );
    state.upsert(ingress.clone());

    let scope = NamespaceScope::All;
    let ing = derive_ingress(&ingress, DeriveContext::new(&state, &scope), &mut store);

    assert_eq!(store.nodes().len(), 3);
    assert_eq!(store.edges().len(), 2);
    assert!(store.has_edge(&ing, &id(ResourceKind::Secret, "tls-sec")));
    assert!(store.has_edge(&ing, &id(ResourceKind::Service, "svc1")));
}

#[test]
fn test_service_skips_pods_without_the_selector_label() {
    let mut state = ResourceState::new();
    state.upsert(object(
        ResourceKind::Pod,
        json!({"metadata": {"name": "labelled", "namespace": "ns1", "labels": {"app": "x"}}}),
    ));
    state.upsert(object(
        ResourceKind::Pod,
        json!({"metadata": {"name": "other-label", "namespace": "ns1", "labels": {"tier": "x"}}}),
    ));
    state.upsert(object(
        ResourceKind::Pod,
        json!({"metadata": {"name": "bare", "namespace": "ns1"}}),
    ));
    state.upsert(object(
        ResourceKind::Service,
        json!({"metadata": {"name": "svc", "namespace": "ns1"}, "spec": {"selector": {"app": "x"}}}),
    ));

    let store = derive(&state);

    let svc = id(ResourceKind::Service, "svc");
    assert!(store.has_edge(&svc, &id(ResourceKind::Pod, "labelled")));
    assert!(!store.has_edge(&svc, &id(ResourceKind::Pod, "other-label")));
    assert!(!store.has_edge(&svc, &id(ResourceKind::Pod, "bare")));
    assert_eq!(store.edges_of(&svc).len(), 1);
}

#[test]
fn test_ingress_legacy_service_name_backend() {
    let mut state = ResourceState::new();
    let old = object(ResourceKind::Service, json!({"metadata": {"name": "old"}}));
    let api = object(ResourceKind::Service, json!({"metadata": {"name": "api"}}));
    state.upsert(old.clone());
    state.upsert(api.clone());

    let mut store = GraphStore::default();
    store.upsert_node(&old);
    store.upsert_node(&api);

    let ingress = object(
        ResourceKind::Ingress,
        json!({
            "metadata": {"name": "legacy"},
            "spec": {
                "backend": {"serviceName": "old", "servicePort": 80},
                "rules": [{
                    "http": {"paths": [{
                        "path": "/api",
                        "backend": {"serviceName": "api", "servicePort": "http"}
                    }]}
                }]
            }
        }),
    );
    state.upsert(ingress.clone());

    let scope = NamespaceScope::All;
    let ing = derive_ingress(&ingress, DeriveContext::new(&state, &scope), &mut store);

    assert!(store.has_edge(&ing, &id(ResourceKind::Service, "old")));
    assert!(store.has_edge(&ing, &id(ResourceKind::Service, "api")));
    assert_eq!(store.counts(), (3, 2));
}

#[test]
fn test_release_secret_groups_under_helm_release() {
    let release = json!({
        "name": "rel1",
        "namespace": "default",
        "version": 2,
        "info": {"status": "deployed"},
        "chart": {"metadata": {"name": "nginx", "version": "1.0.0", "appVersion": "1.25"}}
    });
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.encode(engine.encode(release.to_string()));

    let mut state = ResourceState::new();
    state.upsert(object(
        ResourceKind::Secret,
        json!({
            "metadata": {
                "name": "sh.helm.release.v1.rel1.v2",
                "labels": {"name": "rel1", "owner": "helm", "version": "2"}
            },
            "type": "helm.sh/release.v1",
            "data": {"release": data}
        }),
    ));

    let store = derive(&state);

    let release_id = id(ResourceKind::HelmRelease, "rel1");
    assert!(store.has_edge(
        &id(ResourceKind::Secret, "sh.helm.release.v1.rel1.v2"),
        &release_id
    ));

    let node = store.node(&release_id).unwrap();
    let details = node.detail.describe(node, &state);
    let text = details.to_string();
    assert!(text.contains("nginx"));
    assert!(text.contains("deployed"));
}

#[test]
fn test_unresolved_references_yield_no_edges() {
    let mut state = ResourceState::new();
    state.upsert(object(
        ResourceKind::Pod,
        json!({
            "metadata": {"name": "app"},
            "spec": {
                "containers": [{"name": "c", "env": [{"name": "X", "valueFrom": {"secretKeyRef": {"name": "missing", "key": "k"}}}]}],
                "volumes": [{"name": "v", "persistentVolumeClaim": {"claimName": "missing"}}]
            }
        }),
    ));

    let store = derive(&state);
    assert_eq!(store.counts(), (1, 0));
}
