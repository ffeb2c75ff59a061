//! V2Ray configuration output.
//!
//! Emits the classic v2ray-core JSON layout: socks/http inbounds, a
//! `freedom` outbound, then one outbound per vmess node. Only vmess nodes
//! are expressible in this format; everything else follows the
//! unsupported-node policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::RenderError;
use crate::models::{Credentials, Node, UnsupportedPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayConfig {
    pub log: V2rayLog,
    pub inbounds: Vec<V2rayInbound>,
    pub outbounds: Vec<V2rayOutbound>,
    pub routing: V2rayRouting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayLog {
    pub loglevel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayInbound {
    pub tag: String,
    pub port: u16,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayOutbound {
    pub tag: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<V2rayOutboundSettings>,
    #[serde(rename = "streamSettings", skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<V2rayStreamSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayOutboundSettings {
    pub vnext: Vec<V2rayVnext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayVnext {
    pub address: String,
    pub port: u16,
    pub users: Vec<V2rayUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayUser {
    pub id: String,
    #[serde(rename = "alterId")]
    pub alter_id: u16,
    pub security: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayStreamSettings {
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    #[serde(rename = "wsSettings", skip_serializing_if = "Option::is_none")]
    pub ws_settings: Option<V2rayWsSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayWsSettings {
    pub path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2rayRouting {
    pub rules: Vec<Value>,
}

/// Renders nodes into a V2Ray config, returning skipped node names.
pub fn render_v2ray(
    nodes: &[Node],
    policy: UnsupportedPolicy,
) -> Result<(V2rayConfig, Vec<String>), RenderError> {
    let mut outbounds = vec![V2rayOutbound {
        tag: "proxy".to_string(),
        protocol: "freedom".to_string(),
        settings: None,
        stream_settings: None,
    }];
    let mut skipped = Vec::new();

    for node in nodes {
        match node_to_outbound(node) {
            Some(outbound) => outbounds.push(outbound),
            None => match policy {
                UnsupportedPolicy::Skip => skipped.push(node.name.clone()),
                UnsupportedPolicy::Abort => {
                    return Err(RenderError::UnsupportedInFormat {
                        protocol: node.protocol(),
                        name: node.name.clone(),
                        format: "v2ray",
                    });
                }
            },
        }
    }

    let config = V2rayConfig {
        log: V2rayLog {
            loglevel: "warning".to_string(),
        },
        inbounds: vec![
            V2rayInbound {
                tag: "socks".to_string(),
                port: 1080,
                protocol: "socks".to_string(),
                settings: Some(json!({ "auth": "noauth", "udp": true })),
            },
            V2rayInbound {
                tag: "http".to_string(),
                port: 1087,
                protocol: "http".to_string(),
                settings: None,
            },
        ],
        outbounds,
        routing: V2rayRouting {
            rules: vec![json!({
                "type": "field",
                "ip": ["geoip:private"],
                "outboundTag": "direct"
            })],
        },
    };

    Ok((config, skipped))
}

fn node_to_outbound(node: &Node) -> Option<V2rayOutbound> {
    let Credentials::Vmess {
        uuid,
        alter_id,
        cipher,
    } = &node.credentials
    else {
        return None;
    };

    let network = node
        .extra
        .network
        .clone()
        .unwrap_or_else(|| "tcp".to_string());
    let ws_settings = if network == "ws" {
        let mut headers = BTreeMap::new();
        if let Some(host) = &node.extra.ws_host {
            headers.insert("Host".to_string(), host.clone());
        }
        Some(V2rayWsSettings {
            path: node.extra.ws_path.clone().unwrap_or_else(|| "/".to_string()),
            headers,
        })
    } else {
        None
    };

    Some(V2rayOutbound {
        tag: node.name.clone(),
        protocol: "vmess".to_string(),
        settings: Some(V2rayOutboundSettings {
            vnext: vec![V2rayVnext {
                address: node.server.clone(),
                port: node.port,
                users: vec![V2rayUser {
                    id: uuid.clone(),
                    alter_id: *alter_id,
                    security: cipher.clone(),
                }],
            }],
        }),
        stream_settings: Some(V2rayStreamSettings {
            network,
            security: node.extra.tls.then(|| "tls".to_string()),
            ws_settings,
        }),
    })
}
