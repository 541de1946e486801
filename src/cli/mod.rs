//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod commands;
mod graph;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::{ConfigSubcommand, handle_config_command};
pub use graph::{GraphOptions, Input};
pub use logging::init_logging;

/// Live graph of Kubernetes resources and their relationships
#[derive(Parser, Debug)]
#[command(name = "kube-resource-map", version)]
#[command(about = "Live graph of Kubernetes resources and their relationships", long_about = None)]
pub struct Args {
    /// Write debug logs to a temporary file
    #[arg(long, short = 'd', global = true)]
    pub debug: bool,

    #[command(flatten)]
    pub graph: GraphOptions,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the cluster once and print the graph (default)
    Snapshot,
    /// Print a new graph every time the cluster changes
    Watch,
    /// Render the graph of manifest files without a cluster
    Render {
        /// YAML or JSON manifest files
        #[arg(long = "file", short = 'f', required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
    /// Show details of one node, e.g. `Pod-web-1`
    Describe {
        node: String,
        /// Read objects from manifest files instead of the cluster
        #[arg(long = "file", short = 'f', num_args = 1..)]
        files: Vec<PathBuf>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Dispatch parsed arguments
pub async fn run(args: Args) -> Result<()> {
    let Args {
        debug,
        graph: options,
        command,
    } = args;

    if let Some(log_path) = init_logging(debug) {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    match command.unwrap_or(Command::Snapshot) {
        Command::Snapshot => graph::snapshot(Input::Cluster, &options).await,
        Command::Watch => graph::watch(&options).await,
        Command::Render { files } => graph::snapshot(Input::Manifests(files), &options).await,
        Command::Describe { node, files } => {
            graph::describe(Input::from_files(files), &node, &options).await
        }
        Command::Config { subcommand } => handle_config_command(subcommand),
    }
}
