//! Immutable graph snapshots and exports

use super::node::{GraphEdge, GraphNode, NodeId};
use super::store::GraphStore;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

/// `{nodes, links}` view handed to renderers
///
/// Replaced wholesale on publish, never mutated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphSnapshot {
    pub revision: u64,
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphEdge>,
}

impl GraphSnapshot {
    pub fn from_store(store: &GraphStore, revision: u64) -> Self {
        Self {
            revision,
            nodes: store.nodes().to_vec(),
            links: store.edges().to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.nodes.len(), self.links.len())
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    /// Render in `format`; JSON output carries the force parameters
    pub fn export(&self, format: ExportFormat, layout: &ForceLayout) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json => self.to_json(layout),
            ExportFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            ExportFormat::Dot => Ok(self.to_dot()),
        }
    }

    pub fn to_json(&self, layout: &ForceLayout) -> Result<String, ExportError> {
        #[derive(Serialize)]
        struct WithLayout<'a> {
            #[serde(flatten)]
            snapshot: &'a GraphSnapshot,
            layout: &'a ForceLayout,
        }
        Ok(serde_json::to_string_pretty(&WithLayout {
            snapshot: self,
            layout,
        })?)
    }

    /// Graphviz DOT; links take the color of their source node
    pub fn to_dot(&self) -> String {
        let mut out = String::from("graph resources {\n");
        out.push_str("  node [shape=circle, style=filled, fontsize=8];\n");
        for node in &self.nodes {
            let _ = writeln!(
                out,
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\", tooltip=\"{} {}/{}\"];",
                escape(node.id.as_str()),
                escape(&node.label),
                escape(&node.color_hint),
                node.kind,
                escape(&node.namespace),
                escape(&node.name),
            );
        }
        for link in &self.links {
            let color = self
                .node(link.source.as_str())
                .map(|n| n.color_hint.as_str())
                .unwrap_or("black");
            let _ = writeln!(
                out,
                "  \"{}\" -- \"{}\" [color=\"{}\"];",
                escape(link.source.as_str()),
                escape(link.target.as_str()),
                escape(color),
            );
        }
        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Edges highlighted while hovering or dragging a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub node: Option<NodeId>,
    pub links: Vec<GraphEdge>,
}

impl Highlight {
    pub fn is_highlighted(&self, edge: &GraphEdge) -> bool {
        self.links.iter().any(|l| l == edge)
    }
}

/// Force simulation parameters handed to renderers unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForceLayout {
    pub link_strength: f64,
    pub link_distance: f64,
    pub charge_strength: f64,
    pub charge_distance_max: f64,
    pub collide_radius: f64,
    pub initial_zoom: f64,
    pub max_zoom: f64,
    pub cooldown_ticks: u32,
    /// Above this many nodes the initial view zooms to fit
    pub zoom_to_fit_threshold: usize,
}

impl Default for ForceLayout {
    fn default() -> Self {
        Self {
            link_strength: 1.3,
            link_distance: 60.0,
            charge_strength: -60.0,
            charge_distance_max: 250.0,
            collide_radius: 40.0,
            initial_zoom: 1.3,
            max_zoom: 2.0,
            cooldown_ticks: 200,
            zoom_to_fit_threshold: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Yaml,
    Dot,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "dot" | "graphviz" => Ok(ExportFormat::Dot),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to serialize snapshot as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to serialize snapshot as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
