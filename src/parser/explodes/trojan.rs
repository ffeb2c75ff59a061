use std::collections::BTreeMap;

use url::Url;

use crate::error::ParseError;
use crate::models::{Node, NodeExtra};
use crate::utils::url::url_decode;

/// Parse a Trojan link into a node.
///
/// Format: `trojan://password@host:port?params#name`. Trojan is always TLS;
/// `sni` falls back to the `peer` parameter, then to the server host.
pub fn explode_trojan(trojan: &str) -> Result<Node, ParseError> {
    if !trojan.starts_with("trojan://") {
        return Err(ParseError::UnsupportedScheme("trojan".to_string()));
    }

    let url = Url::parse(trojan).map_err(|e| ParseError::malformed("url", e.to_string()))?;

    let password = url_decode(url.username());
    if password.is_empty() {
        return Err(ParseError::malformed("password", "missing userinfo"));
    }

    let server = url
        .host_str()
        .ok_or_else(|| ParseError::malformed("server", "missing host"))?
        .to_string();
    let port = url.port().unwrap_or(443);
    if port == 0 {
        return Err(ParseError::malformed("port", "out of range"));
    }

    let mut query: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        query.insert(key.into_owned(), value.into_owned());
    }

    let sni = query
        .remove("sni")
        .or_else(|| query.remove("peer"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| server.clone());
    let skip_cert_verify = query
        .remove("allowInsecure")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    // WebSocket transport, either style of marker.
    let mut network = None;
    let mut ws_path = None;
    if query.remove("ws").as_deref() == Some("1") {
        network = Some("ws".to_string());
        ws_path = query.remove("wspath");
    } else if query.remove("type").as_deref() == Some("ws") {
        network = Some("ws".to_string());
        ws_path = query.remove("path").map(|p| url_decode(&p));
    }

    let name = match url.fragment() {
        Some(fragment) if !fragment.is_empty() => url_decode(fragment),
        _ => format!("{} ({})", server, port),
    };

    let extra = NodeExtra {
        network,
        tls: true,
        sni: Some(sni),
        skip_cert_verify,
        ws_path,
        params: query,
        ..NodeExtra::default()
    };

    Ok(Node::trojan(name, server, port, password, extra))
}
