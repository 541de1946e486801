//! Configuration loading and merging logic
//!
//! Precedence (highest to lowest): environment, config file, built-in defaults.
//! Command-line flags are applied on top by the CLI.

use super::{paths, schema::Config};
use crate::graph::StyleTable;
use anyhow::{Context, Result};
use std::path::Path;

/// Comma-separated namespace list overriding `namespaces`
pub const NAMESPACES_ENV: &str = "KUBE_RESOURCE_MAP_NAMESPACES";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// A missing config file is not an error; an unreadable or invalid one is.
    pub fn load() -> Result<Config> {
        let path = paths::root_config_path();
        let config = if path.exists() {
            Self::load_file(&path)?
        } else {
            Config::default()
        };
        Ok(Self::apply_env_overrides(config))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load the merged configuration and check its styles
    pub fn validate() -> Result<StyleTable> {
        let config = Self::load().context("Failed to load configuration")?;
        config
            .style_table()
            .context("Invalid style configuration")
    }

    fn apply_env_overrides(config: Config) -> Config {
        Self::apply_namespaces_override(config, std::env::var(NAMESPACES_ENV).ok())
    }

    fn apply_namespaces_override(mut config: Config, value: Option<String>) -> Config {
        if let Some(value) = value {
            config.namespaces = parse_namespace_list(&value);
        }
        config
    }
}

/// Split a comma-separated namespace list, dropping blanks
pub fn parse_namespace_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
        .collect()
}
