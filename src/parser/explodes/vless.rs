use std::collections::BTreeMap;

use url::Url;

use crate::error::ParseError;
use crate::models::{Node, NodeExtra};
use crate::parser::normalize_uuid;
use crate::utils::url::url_decode;

/// Parse a VLESS link into a node.
///
/// Format: `vless://uuid@host:port?params#name`. The `security` parameter
/// selects TLS or REALITY; transport comes from `type`.
pub fn explode_vless(vless: &str) -> Result<Node, ParseError> {
    if !vless.starts_with("vless://") {
        return Err(ParseError::UnsupportedScheme("vless".to_string()));
    }

    let url = Url::parse(vless).map_err(|e| ParseError::malformed("url", e.to_string()))?;

    let uuid = normalize_uuid(url.username())
        .ok_or_else(|| ParseError::malformed("uuid", "userinfo is not a UUID"))?;
    let server = url
        .host_str()
        .ok_or_else(|| ParseError::malformed("server", "missing host"))?
        .to_string();
    let port = url
        .port()
        .filter(|p| *p != 0)
        .ok_or_else(|| ParseError::malformed("port", "missing or out of range"))?;

    let mut network = "tcp".to_string();
    let mut security = String::new();
    let mut flow = None;
    let mut sni = None;
    let mut reality_public_key = None;
    let mut reality_short_id = None;
    let mut params = BTreeMap::new();

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "type" if !value.is_empty() => network = value.into_owned(),
            "security" => security = value.into_owned(),
            "flow" if !value.is_empty() => flow = Some(value.into_owned()),
            "sni" if !value.is_empty() => sni = Some(value.into_owned()),
            "pbk" => reality_public_key = Some(value.into_owned()),
            "sid" => reality_short_id = Some(value.into_owned()),
            _ => {
                params.insert(key.into_owned(), value.into_owned());
            }
        }
    }

    let reality = security == "reality";
    let extra = NodeExtra {
        network: Some(network),
        tls: security == "tls",
        sni,
        reality_public_key: if reality { reality_public_key } else { None },
        reality_short_id: if reality { reality_short_id } else { None },
        params,
        ..NodeExtra::default()
    };

    let name = match url.fragment() {
        Some(fragment) if !fragment.is_empty() => url_decode(fragment),
        _ => format!("{} ({})", server, port),
    };

    Ok(Node::vless(name, server, port, uuid, flow, extra))
}
