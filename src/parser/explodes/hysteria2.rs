use std::collections::BTreeMap;

use url::Url;

use crate::error::ParseError;
use crate::models::{Node, NodeExtra};
use crate::utils::url::url_decode;

/// Parse a Hysteria2 link into a node.
///
/// Format: `hysteria2://password@host:port/?params#name`. QUIC-based and
/// always TLS; `sni` defaults to the server host.
pub fn explode_hysteria2(hysteria2: &str) -> Result<Node, ParseError> {
    if !hysteria2.starts_with("hysteria2://") {
        return Err(ParseError::UnsupportedScheme("hysteria2".to_string()));
    }

    let url = Url::parse(hysteria2).map_err(|e| ParseError::malformed("url", e.to_string()))?;

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

    let mut sni = None;
    let mut skip_cert_verify = None;
    let mut params = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "sni" if !value.is_empty() => sni = Some(value.into_owned()),
            "insecure" => {
                skip_cert_verify = Some(value.as_ref() == "1" || value.eq_ignore_ascii_case("true"))
            }
            _ => {
                params.insert(key.into_owned(), value.into_owned());
            }
        }
    }

    let name = match url.fragment() {
        Some(fragment) if !fragment.is_empty() => url_decode(fragment),
        _ => format!("{} ({})", server, port),
    };

    let extra = NodeExtra {
        tls: true,
        sni: sni.or_else(|| Some(server.clone())),
        skip_cert_verify,
        params,
        ..NodeExtra::default()
    };

    Ok(Node::hysteria2(name, server, port, password, extra))
}
