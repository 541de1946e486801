//! Graph command handlers
//!
//! Each command builds a `GraphController` over cluster or manifest sources,
//! loads it for the resolved namespace scope and prints snapshots to stdout.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use crate::cluster;
use crate::config::{Config, ConfigLoader};
use crate::graph::{ExportFormat, GraphSnapshot};
use crate::sync::GraphController;
use crate::watcher::{NamespaceScope, ResourceSource, kube_sources, manifest_sources, read_manifests};

/// Options shared by the graph commands
#[derive(Args, Debug, Clone, Default)]
pub struct GraphOptions {
    /// Namespace to include (repeatable, or comma separated)
    #[arg(short = 'n', long = "namespace", value_delimiter = ',', global = true)]
    pub namespaces: Vec<String>,

    /// Include every namespace
    #[arg(
        short = 'A',
        long = "all-namespaces",
        global = true,
        conflicts_with = "namespaces"
    )]
    pub all_namespaces: bool,

    /// Output format: json, yaml or dot
    #[arg(long, short = 'o', default_value = "json", global = true)]
    pub format: ExportFormat,

    /// Kubeconfig context to use instead of the current one
    #[arg(long, global = true)]
    pub context: Option<String>,
}

impl GraphOptions {
    /// Flags win over the configured namespaces
    pub fn scope(&self, config: &Config) -> NamespaceScope {
        if self.all_namespaces {
            NamespaceScope::All
        } else if !self.namespaces.is_empty() {
            NamespaceScope::from_namespaces(self.namespaces.iter().cloned())
        } else {
            NamespaceScope::from_namespaces(config.namespaces.iter().cloned())
        }
    }
}

/// Where objects come from
#[derive(Debug, Clone)]
pub enum Input {
    Cluster,
    Manifests(Vec<PathBuf>),
}

impl Input {
    pub fn from_files(files: Vec<PathBuf>) -> Self {
        if files.is_empty() {
            Input::Cluster
        } else {
            Input::Manifests(files)
        }
    }

    async fn sources(&self, options: &GraphOptions) -> Result<Vec<Box<dyn ResourceSource>>> {
        match self {
            Input::Cluster => {
                let client = cluster::create_client(options.context.as_deref()).await?;
                if let Some(context) = options
                    .context
                    .clone()
                    .or_else(cluster::current_context)
                {
                    tracing::info!("Using Kubernetes context: {}", context);
                }
                Ok(kube_sources(client))
            }
            Input::Manifests(paths) => {
                let objects = read_manifests(paths)
                    .await
                    .context("Failed to read manifests")?;
                tracing::debug!(objects = objects.len(), "Parsed manifests");
                Ok(manifest_sources(&objects))
            }
        }
    }
}

async fn loaded_controller(
    input: &Input,
    options: &GraphOptions,
    config: &Config,
) -> Result<GraphController> {
    let styles = config.style_table().context("Invalid style configuration")?;
    let sources = input.sources(options).await?;
    let mut controller = GraphController::with_styles(sources, options.scope(config), styles);
    controller.load().await;

    for (kind, error) in controller.status().failed_kinds() {
        eprintln!("warning: could not load {}: {}", kind, error);
    }
    if controller.no_resources() {
        eprintln!("No resources found in {}", controller.scope());
    }
    Ok(controller)
}

fn print_snapshot(snapshot: &GraphSnapshot, options: &GraphOptions, config: &Config) -> Result<()> {
    let rendered = snapshot
        .export(options.format, &config.layout)
        .context("Failed to export snapshot")?;
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Load once and print the graph
pub async fn snapshot(input: Input, options: &GraphOptions) -> Result<()> {
    let config = ConfigLoader::load()?;
    let mut controller = loaded_controller(&input, options, &config).await?;
    print_snapshot(&controller.snapshot(), options, &config)?;
    controller.shutdown();
    Ok(())
}

/// Print every published snapshot until interrupted
pub async fn watch(options: &GraphOptions) -> Result<()> {
    let config = ConfigLoader::load()?;
    let styles = config.style_table().context("Invalid style configuration")?;
    let sources = Input::Cluster.sources(options).await?;

    let scope = options.scope(&config);
    let (_scope_tx, scope_rx) = watch::channel(scope.clone());
    let mut controller = GraphController::with_styles(sources, scope, styles);
    let mut snapshots = controller.subscribe_snapshots();
    let task = tokio::spawn(async move { controller.run(scope_rx).await });

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot: Arc<GraphSnapshot> = snapshots.borrow_and_update().clone();
                if let Err(e) = print_snapshot(&snapshot, options, &config) {
                    break Err(e);
                }
            }
        }
    };

    task.abort();
    result
}

/// Print tooltip details and the navigation target of one node
pub async fn describe(input: Input, node: &str, options: &GraphOptions) -> Result<()> {
    let config = ConfigLoader::load()?;
    let mut controller = loaded_controller(&input, options, &config).await?;

    let details = controller
        .describe_node(node)
        .with_context(|| format!("Node '{}' not found", node))?;
    print!("{}", details);
    if let Some(target) = controller.on_node_click(node) {
        println!("Path: {}", target);
    }
    let highlight = controller.on_node_hover(Some(node));
    for other in highlight.links.iter().filter_map(|link| link.other(node)) {
        println!("Linked: {}", other);
    }

    controller.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_flags_override_config() {
        let config = Config {
            namespaces: vec!["from-config".to_string()],
            ..Default::default()
        };

        let defaults = GraphOptions::default();
        assert_eq!(
            defaults.scope(&config),
            NamespaceScope::from_namespaces(["from-config"])
        );

        let all = GraphOptions {
            all_namespaces: true,
            ..Default::default()
        };
        assert!(all.scope(&config).is_all());

        let explicit = GraphOptions {
            namespaces: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        assert_eq!(
            explicit.scope(&config),
            NamespaceScope::from_namespaces(["a", "b"])
        );
    }

    #[test]
    fn test_empty_config_means_all_namespaces() {
        assert!(GraphOptions::default().scope(&Config::default()).is_all());
    }
}
