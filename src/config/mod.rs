//! Configuration for kube-resource-map
//!
//! A single optional `config.yaml` supplies the initial namespace scope,
//! per-kind style overrides and force layout parameters.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::{ConfigLoader, NAMESPACES_ENV, parse_namespace_list};
pub use schema::{Config, StyleOverride};
