//! Clash configuration output.
//!
//! Typed serde model of the emitted YAML. Without `compatible_mode` the
//! Clash-Meta dialect is produced (geodata fields, native hysteria2/vless
//! entries); with it, the classic dialect, which only speaks ss/vmess/trojan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::models::{ConversionOptions, Credentials, Node, Protocol, UnsupportedPolicy};
use crate::template::{GroupMember, Template};

/// Top-level sections every template provides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashBase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socks_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_lan: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_controller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<ClashDns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geodata_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geox_url: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashDns {
    pub enable: bool,
    pub ipv6: bool,
    pub default_nameserver: Vec<String>,
    pub enhanced_mode: String,
    pub fake_ip_range: String,
    pub nameserver: Vec<String>,
}

/// The complete rendered config: template base with the node list and
/// expanded groups spliced in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashConfig {
    #[serde(flatten)]
    pub base: ClashBase,
    pub proxies: Vec<ClashProxy>,
    pub proxy_groups: Vec<ClashProxyGroup>,
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashProxyGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub proxies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

/// One `proxies:` entry, tagged by protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClashProxy {
    #[serde(rename_all = "kebab-case")]
    Ss {
        name: String,
        server: String,
        port: u16,
        cipher: String,
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        udp: Option<bool>,
    },
    #[serde(rename_all = "kebab-case")]
    Vmess {
        name: String,
        server: String,
        port: u16,
        uuid: String,
        #[serde(rename = "alterId")]
        alter_id: u16,
        cipher: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        network: Option<String>,
        tls: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        skip_cert_verify: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        servername: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ws_opts: Option<ClashWsOpts>,
    },
    #[serde(rename_all = "kebab-case")]
    Vless {
        name: String,
        server: String,
        port: u16,
        uuid: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        network: Option<String>,
        tls: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        flow: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        servername: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reality_opts: Option<ClashRealityOpts>,
    },
    #[serde(rename_all = "kebab-case")]
    Trojan {
        name: String,
        server: String,
        port: u16,
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sni: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        skip_cert_verify: Option<bool>,
    },
    #[serde(rename_all = "kebab-case")]
    Hysteria2 {
        name: String,
        server: String,
        port: u16,
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sni: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        skip_cert_verify: Option<bool>,
    },
}

impl ClashProxy {
    pub fn name(&self) -> &str {
        match self {
            ClashProxy::Ss { name, .. }
            | ClashProxy::Vmess { name, .. }
            | ClashProxy::Vless { name, .. }
            | ClashProxy::Trojan { name, .. }
            | ClashProxy::Hysteria2 { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClashWsOpts {
    pub path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashRealityOpts {
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

/// Renders nodes against a Clash template.
///
/// Returns the config plus the names of nodes skipped as unsupported in the
/// selected dialect.
pub fn render_clash(
    nodes: &[Node],
    template: &Template,
    options: &ConversionOptions,
) -> Result<(ClashConfig, Vec<String>), RenderError> {
    let meta = !options.compatible_mode;

    let mut proxies = Vec::with_capacity(nodes.len());
    let mut skipped = Vec::new();
    for node in nodes {
        if !meta && !classic_supported(node.protocol()) {
            match options.unsupported_policy {
                UnsupportedPolicy::Skip => {
                    skipped.push(node.name.clone());
                    continue;
                }
                UnsupportedPolicy::Abort => {
                    return Err(RenderError::UnsupportedInFormat {
                        protocol: node.protocol(),
                        name: node.name.clone(),
                        format: "clash",
                    });
                }
            }
        }
        proxies.push(proxy_to_clash(node));
    }

    let proxy_names: Vec<String> = proxies.iter().map(|p| p.name().to_string()).collect();
    let proxy_groups = template
        .proxy_groups
        .iter()
        .map(|spec| ClashProxyGroup {
            name: spec.name.clone(),
            group_type: spec.group_type.clone(),
            proxies: expand_members(&spec.proxies, &proxy_names),
            url: spec.url.clone(),
            interval: spec.interval,
            tolerance: spec.tolerance,
            strategy: spec.strategy.clone(),
        })
        .collect();

    let mut base = template.base.clone();
    if meta && base.dns.is_some() {
        base.geodata_mode = Some(true);
        base.geox_url = Some(BTreeMap::from([
            (
                "geoip".to_string(),
                "https://testingcf.jsdelivr.net/gh/MetaCubeX/meta-rules-dat@release/geoip.dat"
                    .to_string(),
            ),
            (
                "geosite".to_string(),
                "https://testingcf.jsdelivr.net/gh/MetaCubeX/meta-rules-dat@release/geosite.dat"
                    .to_string(),
            ),
        ]));
    }

    Ok((
        ClashConfig {
            base,
            proxies,
            proxy_groups,
            rules: template.rules.clone(),
        },
        skipped,
    ))
}

/// Protocols the classic (non-Meta) Clash core understands.
fn classic_supported(protocol: Protocol) -> bool {
    matches!(protocol, Protocol::Ss | Protocol::Vmess | Protocol::Trojan)
}

fn expand_members(members: &[GroupMember], proxy_names: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for member in members {
        match member {
            GroupMember::Direct => out.push("DIRECT".to_string()),
            GroupMember::Reject => out.push("REJECT".to_string()),
            GroupMember::Named(name) => out.push(name.clone()),
            GroupMember::Nodes => out.extend(proxy_names.iter().cloned()),
        }
    }
    out
}

/// Maps one node to its Clash proxy entry.
pub fn proxy_to_clash(node: &Node) -> ClashProxy {
    match &node.credentials {
        Credentials::Ss { cipher, password } => ClashProxy::Ss {
            name: node.name.clone(),
            server: node.server.clone(),
            port: node.port,
            cipher: cipher.clone(),
            password: password.clone(),
            udp: node.extra.udp,
        },
        Credentials::Vmess {
            uuid,
            alter_id,
            cipher,
        } => {
            let ws_opts = if node.extra.network.as_deref() == Some("ws") {
                let mut headers = BTreeMap::new();
                if let Some(host) = &node.extra.ws_host {
                    headers.insert("Host".to_string(), host.clone());
                }
                Some(ClashWsOpts {
                    path: node.extra.ws_path.clone().unwrap_or_else(|| "/".to_string()),
                    headers,
                })
            } else {
                None
            };
            ClashProxy::Vmess {
                name: node.name.clone(),
                server: node.server.clone(),
                port: node.port,
                uuid: uuid.clone(),
                alter_id: *alter_id,
                cipher: cipher.clone(),
                network: node.extra.network.clone(),
                tls: node.extra.tls,
                skip_cert_verify: node.extra.skip_cert_verify,
                servername: node.extra.sni.clone(),
                ws_opts,
            }
        }
        Credentials::Vless { uuid, flow } => {
            let reality_opts =
                node.extra
                    .reality_public_key
                    .as_ref()
                    .map(|public_key| ClashRealityOpts {
                        public_key: public_key.clone(),
                        short_id: node.extra.reality_short_id.clone(),
                    });
            ClashProxy::Vless {
                name: node.name.clone(),
                server: node.server.clone(),
                port: node.port,
                uuid: uuid.clone(),
                network: node.extra.network.clone(),
                tls: node.extra.tls,
                flow: flow.clone(),
                servername: node.extra.sni.clone(),
                reality_opts,
            }
        }
        Credentials::Trojan { password } => ClashProxy::Trojan {
            name: node.name.clone(),
            server: node.server.clone(),
            port: node.port,
            password: password.clone(),
            sni: node.extra.sni.clone(),
            skip_cert_verify: node.extra.skip_cert_verify,
        },
        Credentials::Hysteria2 { password } => ClashProxy::Hysteria2 {
            name: node.name.clone(),
            server: node.server.clone(),
            port: node.port,
            password: password.clone(),
            sni: node.extra.sni.clone(),
            skip_cert_verify: node.extra.skip_cert_verify,
        },
    }
}
