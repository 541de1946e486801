//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use crate::graph::{ForceLayout, StyleTable};
use crate::models::ResourceKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Initial namespace scope; empty means all namespaces
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,

    /// Per-kind presentation overrides, keyed by lower-cased kind
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<String, StyleOverride>,

    /// Force parameters handed to renderers
    #[serde(default)]
    pub layout: ForceLayout,
}

/// Partial style for one kind
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StyleOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Config {
    /// Built-in styles with the configured overrides applied
    ///
    /// Fails on unknown kinds, unparsable colors and zero sizes.
    pub fn style_table(&self) -> Result<StyleTable> {
        let mut table = StyleTable::default();
        for (key, style) in &self.styles {
            let kind = ResourceKind::from_str_case_insensitive(key)
                .with_context(|| format!("styles.{}: unknown resource kind", key))?;

            let color = style
                .color
                .as_deref()
                .map(normalize_color)
                .transpose()
                .with_context(|| format!("styles.{}.color", key))?;

            if style.size == Some(0) {
                anyhow::bail!("styles.{}.size must be greater than 0", key);
            }

            table.apply_override(kind, color, style.size, style.icon.clone());
        }
        Ok(table)
    }
}

/// Parse any CSS color and return it as lower-case hex
fn normalize_color(input: &str) -> Result<String> {
    let color = csscolorparser::parse(input)
        .map_err(|e| anyhow::anyhow!("invalid color '{}': {}", input, e))?;
    let [r, g, b, a] = color.to_rgba8();
    Ok(if a == 255 {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    })
}
