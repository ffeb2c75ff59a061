//! Config templates: the skeletons node lists are spliced into.
//!
//! Three built-ins ship with the binary; custom templates are YAML files in
//! the settings-configured template directory, addressed by file stem. A
//! template stays structured all the way through rendering, with the
//! `$nodes` group member marking the insertion point for proxy names.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::generator::clash::{ClashBase, ClashDns};

const HEALTH_CHECK_URL: &str = "http://www.gstatic.com/generate_204";

/// One member of a proxy group: a fixed policy, a named group, or the
/// node-list insertion point (`$nodes` in template files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GroupMember {
    Direct,
    Reject,
    Nodes,
    Named(String),
}

impl From<String> for GroupMember {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DIRECT" => GroupMember::Direct,
            "REJECT" => GroupMember::Reject,
            "$nodes" => GroupMember::Nodes,
            _ => GroupMember::Named(value),
        }
    }
}

impl From<GroupMember> for String {
    fn from(member: GroupMember) -> Self {
        match member {
            GroupMember::Direct => "DIRECT".to_string(),
            GroupMember::Reject => "REJECT".to_string(),
            GroupMember::Nodes => "$nodes".to_string(),
            GroupMember::Named(name) => name,
        }
    }
}

/// A proxy-group skeleton before node names are spliced in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub proxies: Vec<GroupMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl GroupSpec {
    fn select(name: &str, proxies: Vec<GroupMember>) -> Self {
        GroupSpec {
            name: name.to_string(),
            group_type: "select".to_string(),
            proxies,
            url: None,
            interval: None,
            tolerance: None,
            strategy: None,
        }
    }

    fn health_checked(name: &str, group_type: &str, proxies: Vec<GroupMember>) -> Self {
        GroupSpec {
            name: name.to_string(),
            group_type: group_type.to_string(),
            proxies,
            url: Some(HEALTH_CHECK_URL.to_string()),
            interval: Some(300),
            tolerance: None,
            strategy: None,
        }
    }
}

/// A named, versioned config skeleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub base: ClashBase,
    #[serde(default)]
    pub proxy_groups: Vec<GroupSpec>,
    #[serde(default)]
    pub rules: Vec<String>,
}

fn default_version() -> u32 {
    1
}

/// Built-in template ids, in presentation order.
pub const BUILTIN_IDS: &[&str] = &["minimal", "standard", "advanced"];

/// Returns a built-in template by id.
pub fn builtin(id: &str) -> Option<Template> {
    match id {
        "minimal" => Some(minimal()),
        "standard" => Some(standard()),
        "advanced" => Some(advanced()),
        _ => None,
    }
}

fn dns_defaults() -> ClashDns {
    ClashDns {
        enable: true,
        ipv6: false,
        default_nameserver: vec!["223.5.5.5".to_string(), "119.29.29.29".to_string()],
        enhanced_mode: "fake-ip".to_string(),
        fake_ip_range: "198.18.0.1/16".to_string(),
        nameserver: vec![
            "https://doh.pub/dns-query".to_string(),
            "https://dns.alidns.com/dns-query".to_string(),
        ],
    }
}

fn full_base() -> ClashBase {
    ClashBase {
        port: Some(7890),
        socks_port: Some(7891),
        allow_lan: Some(false),
        mode: Some("Rule".to_string()),
        log_level: Some("info".to_string()),
        external_controller: Some("127.0.0.1:9090".to_string()),
        dns: Some(dns_defaults()),
        geodata_mode: None,
        geox_url: None,
    }
}

fn minimal() -> Template {
    Template {
        id: "minimal".to_string(),
        version: 1,
        base: ClashBase {
            port: Some(7890),
            socks_port: Some(7891),
            mode: Some("Global".to_string()),
            ..ClashBase::default()
        },
        proxy_groups: vec![GroupSpec::select(
            "Proxy",
            vec![GroupMember::Direct, GroupMember::Nodes],
        )],
        rules: vec!["MATCH,Proxy".to_string()],
    }
}

fn standard() -> Template {
    Template {
        id: "standard".to_string(),
        version: 1,
        base: full_base(),
        proxy_groups: vec![
            GroupSpec::select(
                "Proxy",
                vec![
                    GroupMember::Named("Auto".to_string()),
                    GroupMember::Direct,
                    GroupMember::Nodes,
                ],
            ),
            GroupSpec::health_checked("Auto", "url-test", vec![GroupMember::Nodes]),
        ],
        rules: vec![
            "DOMAIN-SUFFIX,local,DIRECT".to_string(),
            "IP-CIDR,127.0.0.0/8,DIRECT".to_string(),
            "IP-CIDR,172.16.0.0/12,DIRECT".to_string(),
            "IP-CIDR,192.168.0.0/16,DIRECT".to_string(),
            "IP-CIDR,10.0.0.0/8,DIRECT".to_string(),
            "GEOIP,CN,DIRECT".to_string(),
            "MATCH,Proxy".to_string(),
        ],
    }
}

fn advanced() -> Template {
    let mut auto = GroupSpec::health_checked("Auto", "url-test", vec![GroupMember::Nodes]);
    auto.tolerance = Some(50);
    let mut balance =
        GroupSpec::health_checked("LoadBalance", "load-balance", vec![GroupMember::Nodes]);
    balance.strategy = Some("consistent-hashing".to_string());

    Template {
        id: "advanced".to_string(),
        version: 1,
        base: full_base(),
        proxy_groups: vec![
            GroupSpec::select(
                "Proxy",
                vec![
                    GroupMember::Named("Auto".to_string()),
                    GroupMember::Named("Fallback".to_string()),
                    GroupMember::Named("LoadBalance".to_string()),
                    GroupMember::Direct,
                    GroupMember::Nodes,
                ],
            ),
            auto,
            GroupSpec::health_checked("Fallback", "fallback", vec![GroupMember::Nodes]),
            balance,
            GroupSpec::select(
                "Domestic",
                vec![GroupMember::Direct, GroupMember::Named("Proxy".to_string())],
            ),
            GroupSpec::select("AdBlock", vec![GroupMember::Reject, GroupMember::Direct]),
        ],
        rules: vec![
            "DOMAIN-SUFFIX,local,DIRECT".to_string(),
            "IP-CIDR,127.0.0.0/8,DIRECT".to_string(),
            "IP-CIDR,172.16.0.0/12,DIRECT".to_string(),
            "IP-CIDR,192.168.0.0/16,DIRECT".to_string(),
            "IP-CIDR,10.0.0.0/8,DIRECT".to_string(),
            "IP-CIDR,17.0.0.0/8,DIRECT".to_string(),
            "IP-CIDR,100.64.0.0/10,DIRECT".to_string(),
            "GEOIP,CN,Domestic".to_string(),
            "MATCH,Proxy".to_string(),
        ],
    }
}

/// Read-only template lookup: built-ins plus user-defined YAML files.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    custom: HashMap<String, Template>,
}

impl TemplateStore {
    /// A store with only the built-in templates.
    pub fn new() -> Self {
        TemplateStore::default()
    }

    /// Loads every `*.yaml`/`*.yml` file in `dir` as a custom template keyed
    /// by file stem. Unreadable or invalid files are logged and skipped; a
    /// missing directory just means no custom templates.
    pub fn with_custom_dir(dir: &Path) -> Self {
        let mut custom = HashMap::new();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return TemplateStore { custom },
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path).map_err(|e| e.to_string()).and_then(|text| {
                serde_yaml::from_str::<Template>(&text).map_err(|e| e.to_string())
            }) {
                Ok(mut template) => {
                    template.id = stem.to_string();
                    info!("loaded custom template {:?} (v{})", stem, template.version);
                    custom.insert(stem.to_string(), template);
                }
                Err(e) => warn!("skipping template {}: {}", path.display(), e),
            }
        }
        TemplateStore { custom }
    }

    /// Looks up a template by id: built-ins first, then custom ones.
    pub fn get(&self, id: &str) -> Result<Template, RenderError> {
        if let Some(template) = builtin(id) {
            return Ok(template);
        }
        self.custom
            .get(id)
            .cloned()
            .ok_or_else(|| RenderError::TemplateMissing(id.to_string()))
    }

    /// All built-in templates, in presentation order.
    pub fn list_builtin(&self) -> Vec<Template> {
        BUILTIN_IDS.iter().filter_map(|id| builtin(id)).collect()
    }
}
