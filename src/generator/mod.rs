//! Target-format document generation.

pub mod clash;
pub mod ss_sub;
pub mod v2ray;

use std::collections::HashMap;

use crate::error::RenderError;
use crate::models::{ConversionOptions, Node, OutputFormat};
use crate::template::Template;

use clash::ClashConfig;
use v2ray::V2rayConfig;

/// A rendered configuration, kept structured until the caller serializes it.
#[derive(Debug, Clone)]
pub enum Document {
    Clash(ClashConfig),
    V2ray(V2rayConfig),
}

impl Document {
    /// Serializes the document to its textual form (YAML for Clash, JSON for
    /// V2Ray).
    pub fn to_output_string(&self) -> Result<String, Box<dyn std::error::Error>> {
        match self {
            Document::Clash(config) => Ok(serde_yaml::to_string(config)?),
            Document::V2ray(config) => Ok(serde_json::to_string_pretty(config)?),
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            Document::Clash(_) => "yaml",
            Document::V2ray(_) => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Document::Clash(_) => "text/yaml; charset=utf-8",
            Document::V2ray(_) => "application/json",
        }
    }
}

/// Renders a node list against a template into the requested format.
///
/// Names are de-duplicated first (clients require unique proxy names within
/// a config). Returns the document plus the names of any nodes skipped under
/// `UnsupportedPolicy::Skip`.
pub fn render(
    nodes: &[Node],
    template: &Template,
    options: &ConversionOptions,
) -> Result<(Document, Vec<String>), RenderError> {
    let mut nodes = nodes.to_vec();
    ensure_unique_names(&mut nodes);

    match options.output_format {
        OutputFormat::Clash => clash::render_clash(&nodes, template, options)
            .map(|(config, skipped)| (Document::Clash(config), skipped)),
        OutputFormat::V2ray => v2ray::render_v2ray(&nodes, options.unsupported_policy)
            .map(|(config, skipped)| (Document::V2ray(config), skipped)),
    }
}

/// Appends a numeric suffix to repeated names, first occurrence unchanged.
pub fn ensure_unique_names(nodes: &mut [Node]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for node in nodes.iter_mut() {
        match seen.get_mut(&node.name) {
            Some(count) => {
                *count += 1;
                node.name = format!("{} {}", node.name, count);
            }
            None => {
                seen.insert(node.name.clone(), 0);
            }
        }
    }
}
