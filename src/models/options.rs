//! User-facing conversion options, deserialized straight from request bodies.

use serde::{Deserialize, Serialize};

/// The output document family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Clash,
    V2ray,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Clash => "clash",
            OutputFormat::V2ray => "v2ray",
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            OutputFormat::Clash => "yaml",
            OutputFormat::V2ray => "json",
        }
    }
}

/// Where the subscription payload comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `payload` is a URL to fetch.
    Url,
    /// `payload` is a server-local file path.
    File,
    /// `payload` is the subscription content itself.
    Text,
}

/// What to do with a node the target format cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Drop the node and record it in diagnostics.
    #[default]
    Skip,
    /// Fail the whole render.
    Abort,
}

/// Options applied between decoding and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    pub output_format: OutputFormat,
    /// Template id: a built-in name or a custom template file stem.
    pub template: String,
    /// `None` or `Some(0)` means unlimited.
    pub node_limit: Option<usize>,
    pub filter_info_nodes: bool,
    pub compatible_mode: bool,
    pub unsupported_policy: UnsupportedPolicy,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        ConversionOptions {
            output_format: OutputFormat::Clash,
            template: "standard".to_string(),
            node_limit: None,
            filter_info_nodes: true,
            compatible_mode: true,
            unsupported_policy: UnsupportedPolicy::Skip,
        }
    }
}

impl ConversionOptions {
    /// Effective limit, treating 0 as "no limit".
    pub fn effective_limit(&self) -> Option<usize> {
        match self.node_limit {
            Some(0) | None => None,
            Some(n) => Some(n),
        }
    }
}
