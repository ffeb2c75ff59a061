//! Node model definitions
//!
//! Contains the core data structures for parsed proxy endpoints. Credentials
//! are a tagged union keyed by protocol, so a node can never carry the wrong
//! credential shape for its protocol.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Protocols accepted by the URI parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ss,
    Vmess,
    Vless,
    Trojan,
    Hysteria2,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Ss => "ss",
            Protocol::Vmess => "vmess",
            Protocol::Vless => "vless",
            Protocol::Trojan => "trojan",
            Protocol::Hysteria2 => "hysteria2",
        }
    }

    /// Maps a URI scheme to a protocol, if supported.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "ss" => Some(Protocol::Ss),
            "vmess" => Some(Protocol::Vmess),
            "vless" => Some(Protocol::Vless),
            "trojan" => Some(Protocol::Trojan),
            "hysteria2" => Some(Protocol::Hysteria2),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol-specific credentials. The variant determines the node's protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum Credentials {
    Ss {
        cipher: String,
        password: String,
    },
    Vmess {
        uuid: String,
        alter_id: u16,
        cipher: String,
    },
    Vless {
        uuid: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        flow: Option<String>,
    },
    Trojan {
        password: String,
    },
    Hysteria2 {
        password: String,
    },
}

impl Credentials {
    pub fn protocol(&self) -> Protocol {
        match self {
            Credentials::Ss { .. } => Protocol::Ss,
            Credentials::Vmess { .. } => Protocol::Vmess,
            Credentials::Vless { .. } => Protocol::Vless,
            Credentials::Trojan { .. } => Protocol::Trojan,
            Credentials::Hysteria2 { .. } => Protocol::Hysteria2,
        }
    }
}

/// Transport and TLS options shared across protocols, plus any query
/// parameters the parser did not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeExtra {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    pub tls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_short_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
    /// Expiry carried over from a timed link, unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Unrecognized query parameters, kept in insertion-stable order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

/// A single proxy endpoint parsed from a subscription entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub server: String,
    pub port: u16,
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub extra: NodeExtra,
}

impl Node {
    /// The node's protocol, derived from its credentials variant.
    pub fn protocol(&self) -> Protocol {
        self.credentials.protocol()
    }

    pub fn ss(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        cipher: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Node {
            name: name.into(),
            server: server.into(),
            port,
            credentials: Credentials::Ss {
                cipher: cipher.into(),
                password: password.into(),
            },
            extra: NodeExtra {
                udp: Some(true),
                ..NodeExtra::default()
            },
        }
    }

    pub fn vmess(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        uuid: impl Into<String>,
        alter_id: u16,
        cipher: impl Into<String>,
        extra: NodeExtra,
    ) -> Self {
        Node {
            name: name.into(),
            server: server.into(),
            port,
            credentials: Credentials::Vmess {
                uuid: uuid.into(),
                alter_id,
                cipher: cipher.into(),
            },
            extra,
        }
    }

    pub fn vless(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        uuid: impl Into<String>,
        flow: Option<String>,
        extra: NodeExtra,
    ) -> Self {
        Node {
            name: name.into(),
            server: server.into(),
            port,
            credentials: Credentials::Vless {
                uuid: uuid.into(),
                flow,
            },
            extra,
        }
    }

    pub fn trojan(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        password: impl Into<String>,
        extra: NodeExtra,
    ) -> Self {
        Node {
            name: name.into(),
            server: server.into(),
            port,
            credentials: Credentials::Trojan {
                password: password.into(),
            },
            extra,
        }
    }

    pub fn hysteria2(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        password: impl Into<String>,
        extra: NodeExtra,
    ) -> Self {
        Node {
            name: name.into(),
            server: server.into(),
            port,
            credentials: Credentials::Hysteria2 {
                password: password.into(),
            },
            extra,
        }
    }
}
