//! Kubernetes client construction
//!
//! Standard proxy environment variables are honoured (`HTTP_PROXY`,
//! `HTTPS_PROXY`, `NO_PROXY`). API servers on private or internal hosts are
//! added to `NO_PROXY` so corporate proxies don't swallow cluster traffic.

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::net::IpAddr;
use url::Url;

/// Build a client from the kubeconfig (or in-cluster config)
///
/// `context` selects a kubeconfig context other than the current one.
pub async fn create_client(context: Option<&str>) -> Result<Client> {
    let config = match context {
        Some(name) => {
            let options = KubeConfigOptions {
                context: Some(name.to_string()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context '{}'", name))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    if let Some(host) = Url::parse(&config.cluster_url.to_string())
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
    {
        bypass_proxy_for(&host);
    }

    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Name of the current kubeconfig context, if any
pub fn current_context() -> Option<String> {
    Kubeconfig::read().ok().and_then(|kc| kc.current_context)
}

fn bypass_proxy_for(host: &str) {
    let current = std::env::var("NO_PROXY")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var("no_proxy").ok())
        .unwrap_or_default();

    let Some(updated) = no_proxy_with(&current, host) else {
        return;
    };
    tracing::debug!(host, "Adding cluster host to NO_PROXY");
    // SAFETY: runs once during startup, before the client spawns watch tasks
    unsafe {
        std::env::set_var("NO_PROXY", &updated);
        std::env::set_var("no_proxy", &updated);
    }
}

/// New `NO_PROXY` value including `host`, or None when nothing changes
fn no_proxy_with(current: &str, host: &str) -> Option<String> {
    if !is_internal_host(host) || no_proxy_contains(current, host) {
        return None;
    }
    Some(if current.is_empty() {
        host.to_string()
    } else {
        format!("{},{}", current, host)
    })
}

/// Private, loopback, or internal-TLD hosts
fn is_internal_host(host: &str) -> bool {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
            IpAddr::V6(v6) => v6.is_loopback(),
        };
    }

    bare == "localhost"
        || [".local", ".internal", ".localhost"]
            .iter()
            .any(|suffix| bare.ends_with(suffix))
}

/// Exact, `.suffix` and parent-domain matches
fn no_proxy_contains(no_proxy: &str, host: &str) -> bool {
    no_proxy
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|pattern| {
            if pattern == "*" || pattern == host {
                return true;
            }
            let domain = pattern.strip_prefix('.').unwrap_or(pattern);
            host == domain || host.ends_with(&format!(".{}", domain))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_internal_host() {
        assert!(is_internal_host("10.0.0.1"));
        assert!(is_internal_host("172.20.1.5"));
        assert!(is_internal_host("192.168.1.1"));
        assert!(is_internal_host("127.0.0.1"));
        assert!(is_internal_host("[::1]"));
        assert!(is_internal_host("localhost"));
        assert!(is_internal_host("api.cluster.local"));
        assert!(is_internal_host("k8s.corp.internal"));

        assert!(!is_internal_host("172.32.0.1"));
        assert!(!is_internal_host("8.8.8.8"));
        assert!(!is_internal_host("example.com"));
    }

    #[test]
    fn test_no_proxy_contains() {
        assert!(no_proxy_contains("localhost, 10.0.0.1", "10.0.0.1"));
        assert!(no_proxy_contains(".cluster.local", "api.cluster.local"));
        assert!(no_proxy_contains("cluster.local", "api.cluster.local"));
        assert!(no_proxy_contains("*", "anything"));
        assert!(!no_proxy_contains("", "10.0.0.1"));
        assert!(!no_proxy_contains("other.local", "api.cluster.local"));
    }

    #[test]
    fn test_no_proxy_with() {
        assert_eq!(no_proxy_with("", "10.0.0.1"), Some("10.0.0.1".to_string()));
        assert_eq!(
            no_proxy_with("localhost", "api.cluster.local"),
            Some("localhost,api.cluster.local".to_string())
        );
        assert_eq!(no_proxy_with("10.0.0.1", "10.0.0.1"), None);
        assert_eq!(no_proxy_with("", "example.com"), None);
    }
}
