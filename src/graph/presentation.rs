//! Node presentation
//!
//! Size/color/icon lookup keyed by kind, pod health colors, the kind → detail
//! strategy dispatch used for tooltips, and click navigation targets.

use super::helm;
use super::node::GraphNode;
use crate::models::{ResourceKind, ResourceObject, pod_ready_containers, pod_status_message};
use crate::watcher::ResourceState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Presentation defaults for one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStyle {
    pub color: String,
    pub size: u32,
    pub icon: String,
}

impl NodeStyle {
    fn new(color: &str, size: u32, icon: &str) -> Self {
        Self {
            color: color.to_string(),
            size,
            icon: icon.to_string(),
        }
    }
}

/// Kind → style table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTable {
    styles: HashMap<ResourceKind, NodeStyle>,
}

impl Default for StyleTable {
    fn default() -> Self {
        let styles = [
            (ResourceKind::Deployment, NodeStyle::new("#6771dc", 25, "icons/deployment.svg")),
            (ResourceKind::DaemonSet, NodeStyle::new("#a367dc", 25, "icons/daemonset.svg")),
            (ResourceKind::StatefulSet, NodeStyle::new("#dc67ce", 25, "icons/statefulset.svg")),
            (ResourceKind::Service, NodeStyle::new("#808af5", 20, "icons/service.svg")),
            (ResourceKind::Secret, NodeStyle::new("#ff9933", 20, "icons/secret.svg")),
            (ResourceKind::Pod, NodeStyle::new("#80f58e", 20, "icons/pod.svg")),
            (ResourceKind::Ingress, NodeStyle::new("#67dcbb", 20, "icons/ingress.svg")),
            (
                ResourceKind::PersistentVolumeClaim,
                NodeStyle::new("#cdff93", 20, "icons/persistentvolumeclaim.svg"),
            ),
            (ResourceKind::ConfigMap, NodeStyle::new("#ffc107", 20, "icons/configmap.svg")),
            (ResourceKind::HelmRelease, NodeStyle::new("#0f1689", 30, "icons/helmrelease.svg")),
        ];
        Self {
            styles: styles.into_iter().collect(),
        }
    }
}

impl StyleTable {
    pub fn style(&self, kind: ResourceKind) -> NodeStyle {
        self.styles
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| NodeStyle::new("#1f78b4", 10, ""))
    }

    pub fn set(&mut self, kind: ResourceKind, style: NodeStyle) {
        self.styles.insert(kind, style);
    }

    /// Override parts of a kind's style
    pub fn apply_override(
        &mut self,
        kind: ResourceKind,
        color: Option<String>,
        size: Option<u32>,
        icon: Option<String>,
    ) {
        let mut style = self.style(kind);
        if let Some(color) = color {
            style.color = color;
        }
        if let Some(size) = size {
            style.size = size;
        }
        if let Some(icon) = icon {
            style.icon = icon;
        }
        self.set(kind, style);
    }
}

/// Pod health buckets derived from the pod status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodHealth {
    Healthy,
    Neutral,
    Waiting,
    Error,
}

impl PodHealth {
    /// `None` for statuses that keep the default pod color
    pub fn classify(status: &str) -> Option<Self> {
        match status {
            "Running" | "Succeeded" => Some(PodHealth::Healthy),
            "Terminating" | "Terminated" | "Completed" => Some(PodHealth::Neutral),
            "Pending" | "ContainerCreating" => Some(PodHealth::Waiting),
            "CrashLoopBackOff" | "Failed" | "Error" => Some(PodHealth::Error),
            _ => None,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PodHealth::Healthy => "#4caf50",
            PodHealth::Neutral => "#9dabb5",
            PodHealth::Waiting => "#2F4F4F",
            PodHealth::Error => "#ce3933",
        }
    }
}

/// Presentation attributes assigned to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub size_hint: u32,
    pub color_hint: String,
    pub icon_ref: String,
}

impl Presentation {
    /// Resolve the presentation of an object (or a synthetic node, with `None`)
    pub fn resolve(styles: &StyleTable, kind: ResourceKind, backing: Option<&ResourceObject>) -> Self {
        let style = styles.style(kind);
        let health = backing
            .filter(|o| o.kind() == ResourceKind::Pod)
            .and_then(|pod| PodHealth::classify(&pod_status_message(pod)));

        Self {
            size_hint: style.size,
            color_hint: health.map_or(style.color, |h| h.color().to_string()),
            icon_ref: style.icon,
        }
    }

    /// Presentation currently applied to a node
    pub(crate) fn of(node: &GraphNode) -> Self {
        Self {
            size_hint: node.size_hint,
            color_hint: node.color_hint.clone(),
            icon_ref: node.icon_ref.clone(),
        }
    }

    pub(crate) fn matches(&self, node: &GraphNode) -> bool {
        node.size_hint == self.size_hint
            && node.color_hint == self.color_hint
            && node.icon_ref == self.icon_ref
    }

    pub(crate) fn apply(self, node: &mut GraphNode) {
        node.size_hint = self.size_hint;
        node.color_hint = self.color_hint;
        node.icon_ref = self.icon_ref;
    }
}

/// Tooltip content for a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDetails {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

impl NodeDetails {
    fn new(node: &GraphNode) -> Self {
        Self {
            title: format!("{} - {}", node.kind, node.name),
            rows: vec![("Namespace".to_string(), node.namespace.clone())],
        }
    }

    fn row(&mut self, name: &str, value: impl Into<String>) {
        self.rows.push((name.to_string(), value.into()));
    }
}

impl fmt::Display for NodeDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        let width = self.rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (name, value) in &self.rows {
            writeln!(f, "  {:<width$}  {}", name, value, width = width)?;
        }
        Ok(())
    }
}

/// How a node's details are rendered, chosen once from its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailStrategy {
    Pod,
    Service,
    Workload,
    Ingress,
    HelmRelease,
    #[default]
    Default,
}

impl DetailStrategy {
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Pod => DetailStrategy::Pod,
            ResourceKind::Service => DetailStrategy::Service,
            ResourceKind::Deployment | ResourceKind::StatefulSet | ResourceKind::DaemonSet => {
                DetailStrategy::Workload
            }
            ResourceKind::Ingress => DetailStrategy::Ingress,
            ResourceKind::HelmRelease => DetailStrategy::HelmRelease,
            _ => DetailStrategy::Default,
        }
    }

    pub fn describe(&self, node: &GraphNode, state: &ResourceState) -> NodeDetails {
        self.describe_at(node, state, Utc::now())
    }

    /// Details with ages computed relative to `now`
    pub fn describe_at(
        &self,
        node: &GraphNode,
        state: &ResourceState,
        now: DateTime<Utc>,
    ) -> NodeDetails {
        let mut details = NodeDetails::new(node);

        if *self == DetailStrategy::HelmRelease {
            describe_helm_release(&mut details, node, state);
            return details;
        }

        let Some(obj) = node.backing.as_ref() else {
            return details;
        };

        match self {
            DetailStrategy::Pod => {
                let (ready, total) = pod_ready_containers(obj);
                details.row("Status", pod_status_message(obj));
                details.row("Node", obj.str_at("/spec/nodeName").unwrap_or("-"));
                details.row("Pod IP", obj.str_at("/status/podIP").unwrap_or("-"));
                details.row("Containers", format!("{}/{}", ready, total));
            }
            DetailStrategy::Service => {
                details.row("Type", obj.str_at("/spec/type").unwrap_or("ClusterIP"));
                details.row("Cluster IP", obj.str_at("/spec/clusterIP").unwrap_or("-"));
                details.row("Ports", service_ports(obj));
                details.row("Selector", selector_text(obj));
            }
            DetailStrategy::Workload => {
                let (ready, desired) = workload_replicas(obj);
                details.row("Replicas", format!("{}/{}", ready, desired));
            }
            DetailStrategy::Ingress => {
                let hosts: Vec<&str> = obj
                    .array_at("/spec/rules")
                    .iter()
                    .filter_map(|r| r.get("host").and_then(|h| h.as_str()))
                    .collect();
                details.row(
                    "Hosts",
                    if hosts.is_empty() {
                        "*".to_string()
                    } else {
                        hosts.join(", ")
                    },
                );
                for route in ingress_routes(obj) {
                    details.row("Route", route);
                }
            }
            DetailStrategy::HelmRelease | DetailStrategy::Default => {}
        }

        if let Some(created) = obj.creation_timestamp() {
            details.row("Age", format_age(now - created));
        }
        details
    }
}

fn describe_helm_release(details: &mut NodeDetails, node: &GraphNode, state: &ResourceState) {
    match helm::latest_release(state, &node.name, &node.namespace) {
        Ok(Some(release)) => {
            details.row("Chart", format!("{}-{}", release.chart, release.chart_version));
            details.row("App Version", release.app_version);
            details.row("Revision", release.revision.to_string());
            details.row("Status", release.status);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(release = %node.name, "Failed to decode release: {}", e);
        }
    }
}

fn service_ports(obj: &ResourceObject) -> String {
    let ports: Vec<String> = obj
        .array_at("/spec/ports")
        .iter()
        .map(|p| {
            let port = p.get("port").map(value_text).unwrap_or_default();
            let protocol = p.get("protocol").and_then(|v| v.as_str()).unwrap_or("TCP");
            match p.get("targetPort").map(value_text) {
                Some(target) if target != port => format!("{}:{}/{}", port, target, protocol),
                _ => format!("{}/{}", port, protocol),
            }
        })
        .collect();
    if ports.is_empty() {
        "-".to_string()
    } else {
        ports.join(", ")
    }
}

fn selector_text(obj: &ResourceObject) -> String {
    obj.get("/spec/selector")
        .and_then(|s| s.as_object())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.iter()
                .map(|(k, v)| format!("{}={}", k, value_text(v)))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| "-".to_string())
}

fn workload_replicas(obj: &ResourceObject) -> (i64, i64) {
    let int = |pointer: &str| obj.get(pointer).and_then(|v| v.as_i64()).unwrap_or(0);
    match obj.kind() {
        ResourceKind::DaemonSet => (
            int("/status/numberReady"),
            int("/status/desiredNumberScheduled"),
        ),
        _ => (
            int("/status/readyReplicas"),
            obj.get("/spec/replicas")
                .and_then(|v| v.as_i64())
                .unwrap_or(1),
        ),
    }
}

fn ingress_routes(obj: &ResourceObject) -> Vec<String> {
    let mut routes = Vec::new();
    for rule in obj.array_at("/spec/rules") {
        let host = rule.get("host").and_then(|h| h.as_str()).unwrap_or("*");
        let paths = rule
            .pointer("/http/paths")
            .and_then(|p| p.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for path in paths {
            let Some(backend) = path.get("backend") else {
                continue;
            };
            let p = path.get("path").and_then(|p| p.as_str()).unwrap_or("/");
            let service = backend_service_name(backend).unwrap_or("<unknown>");
            let port = backend
                .pointer("/service/port/number")
                .or_else(|| backend.pointer("/service/port/name"))
                .or_else(|| backend.get("servicePort"))
                .map(value_text)
                .unwrap_or_else(|| "<unknown>".to_string());
            routes.push(format!("{}{} -> {}:{}", host, p, service, port));
        }
    }
    routes
}

/// Service name of an ingress backend, legacy `serviceName` first
pub(crate) fn backend_service_name(backend: &serde_json::Value) -> Option<&str> {
    backend
        .get("serviceName")
        .and_then(|n| n.as_str())
        .or_else(|| backend.pointer("/service/name").and_then(|n| n.as_str()))
        .filter(|n| !n.is_empty())
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compact age: `42s`, `5m`, `3h`, `12d`
pub fn format_age(age: chrono::Duration) -> String {
    let seconds = age.num_seconds().max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h", seconds / 3600)
    } else {
        format!("{}d", seconds / 86400)
    }
}

/// Where clicking a node navigates to
pub fn navigation_target(node: &GraphNode) -> Option<String> {
    if node.kind == ResourceKind::HelmRelease {
        return Some(format!("/apps/releases/{}/{}", node.namespace, node.name));
    }
    let obj = node.backing.as_ref()?;
    let kind = obj.kind();
    let prefix = match kind.api_group() {
        "" => format!("/api/{}", kind.api_version()),
        group => format!("/apis/{}/{}", group, kind.api_version()),
    };
    Some(format!(
        "{}/namespaces/{}/{}/{}",
        prefix,
        obj.namespace(),
        kind.plural(),
        obj.name()
    ))
}
