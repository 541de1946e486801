//! kube-resource-map - live graph of Kubernetes resources and their relationships

use anyhow::Result;
use clap::Parser;
use kube_resource_map::cli::{self, Args};

#[tokio::main]
async fn main() -> Result<()> {
    cli::run(Args::parse()).await
}
