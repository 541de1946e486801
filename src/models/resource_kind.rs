//! Resource kind definitions
//!
//! Centralized enum for every Kubernetes kind that can appear on the resource
//! map. Removes hardcoded kind strings from the graph and watcher layers.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Enumeration of all kinds that can become graph nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    // Workloads
    Pod,
    Deployment,
    StatefulSet,
    DaemonSet,
    // Networking
    Service,
    Ingress,
    // Configuration and storage
    Secret,
    ConfigMap,
    PersistentVolumeClaim,
    // Synthetic: grouped from Helm labels and release secrets, never watched
    HelmRelease,
}

impl ResourceKind {
    /// Get the Kubernetes kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::Service => "Service",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::Secret => "Secret",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::HelmRelease => "HelmRelease",
        }
    }

    /// Lower-cased kind, used as the key of the presentation table
    pub fn style_key(&self) -> String {
        self.as_str().to_lowercase()
    }

    /// Try to parse a string into a ResourceKind, returning None if invalid
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Kinds that have a live collection behind them, in derivation-friendly order
    pub fn watched() -> &'static [Self] {
        &[
            ResourceKind::Pod,
            ResourceKind::Deployment,
            ResourceKind::StatefulSet,
            ResourceKind::DaemonSet,
            ResourceKind::Service,
            ResourceKind::Ingress,
            ResourceKind::PersistentVolumeClaim,
            ResourceKind::ConfigMap,
            ResourceKind::Secret,
        ]
    }

    /// Workload kinds that own pods
    pub fn is_controller(&self) -> bool {
        matches!(
            self,
            ResourceKind::Deployment | ResourceKind::StatefulSet | ResourceKind::DaemonSet
        )
    }

    /// Synthetic kinds have no backing object
    pub fn is_synthetic(&self) -> bool {
        matches!(self, ResourceKind::HelmRelease)
    }

    /// Whether objects of this kind count towards "resources found"
    ///
    /// Config maps alone never make the map non-empty.
    pub fn counts_as_resource(&self) -> bool {
        !matches!(self, ResourceKind::ConfigMap)
    }

    /// API group (empty for the core group)
    pub fn api_group(&self) -> &'static str {
        match self {
            ResourceKind::Deployment | ResourceKind::StatefulSet | ResourceKind::DaemonSet => {
                "apps"
            }
            ResourceKind::Ingress => "networking.k8s.io",
            ResourceKind::HelmRelease => "helm.sh",
            _ => "",
        }
    }

    /// API version within the group
    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::HelmRelease => "v3",
            _ => "v1",
        }
    }

    /// Plural resource name
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pods",
            ResourceKind::Deployment => "deployments",
            ResourceKind::StatefulSet => "statefulsets",
            ResourceKind::DaemonSet => "daemonsets",
            ResourceKind::Service => "services",
            ResourceKind::Ingress => "ingresses",
            ResourceKind::Secret => "secrets",
            ResourceKind::ConfigMap => "configmaps",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaims",
            ResourceKind::HelmRelease => "releases",
        }
    }

    /// Try to parse a string (case-insensitive, common aliases) into a ResourceKind
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pod" | "pods" | "po" => Some(ResourceKind::Pod),
            "deployment" | "deployments" | "deploy" => Some(ResourceKind::Deployment),
            "statefulset" | "statefulsets" | "sts" => Some(ResourceKind::StatefulSet),
            "daemonset" | "daemonsets" | "ds" => Some(ResourceKind::DaemonSet),
            "service" | "services" | "svc" => Some(ResourceKind::Service),
            "ingress" | "ingresses" | "ing" => Some(ResourceKind::Ingress),
            "secret" | "secrets" => Some(ResourceKind::Secret),
            "configmap" | "configmaps" | "cm" => Some(ResourceKind::ConfigMap),
            "persistentvolumeclaim" | "persistentvolumeclaims" | "pvc" => {
                Some(ResourceKind::PersistentVolumeClaim)
            }
            "helmrelease" | "helmreleases" | "release" => Some(ResourceKind::HelmRelease),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pod" => Ok(ResourceKind::Pod),
            "Deployment" => Ok(ResourceKind::Deployment),
            "StatefulSet" => Ok(ResourceKind::StatefulSet),
            "DaemonSet" => Ok(ResourceKind::DaemonSet),
            "Service" => Ok(ResourceKind::Service),
            "Ingress" => Ok(ResourceKind::Ingress),
            "Secret" => Ok(ResourceKind::Secret),
            "ConfigMap" => Ok(ResourceKind::ConfigMap),
            "PersistentVolumeClaim" => Ok(ResourceKind::PersistentVolumeClaim),
            "HelmRelease" => Ok(ResourceKind::HelmRelease),
            _ => Err(format!("Unknown resource kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_round_trips_through_from_str() {
        for kind in ResourceKind::watched() {
            assert_eq!(ResourceKind::parse_optional(kind.as_str()), Some(*kind));
        }
        assert_eq!(
            ResourceKind::parse_optional("HelmRelease"),
            Some(ResourceKind::HelmRelease)
        );
        assert_eq!(ResourceKind::parse_optional("pod"), None);
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!(
            ResourceKind::from_str_case_insensitive("svc"),
            Some(ResourceKind::Service)
        );
        assert_eq!(
            ResourceKind::from_str_case_insensitive("PVC"),
            Some(ResourceKind::PersistentVolumeClaim)
        );
        assert_eq!(ResourceKind::from_str_case_insensitive("node"), None);
    }

    #[test]
    fn test_controller_kinds() {
        assert!(ResourceKind::Deployment.is_controller());
        assert!(ResourceKind::StatefulSet.is_controller());
        assert!(ResourceKind::DaemonSet.is_controller());
        assert!(!ResourceKind::Pod.is_controller());
        assert!(!ResourceKind::HelmRelease.is_controller());
    }

    #[test]
    fn test_helm_release_is_not_watched() {
        assert!(!ResourceKind::watched().contains(&ResourceKind::HelmRelease));
        assert!(ResourceKind::HelmRelease.is_synthetic());
    }

    #[test]
    fn test_style_key_is_lowercase() {
        assert_eq!(
            ResourceKind::PersistentVolumeClaim.style_key(),
            "persistentvolumeclaim"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ResourceKind::StatefulSet), "StatefulSet");
    }
}
