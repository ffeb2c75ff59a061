use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::models::Node;
use crate::parser::ParseContext;
use crate::timed_link;
use crate::utils::base64::url_safe_base64_decode;
use crate::utils::url::url_decode;

/// Cipher assumed when a link carries only a bare password.
const DEFAULT_CIPHER: &str = "aes-256-gcm";

/// Parse a Shadowsocks link into a node.
///
/// Handles both the SIP002 form `ss://base64(method:password)@host:port` and
/// the legacy form `ss://base64(method:password@host:port)`, each optionally
/// followed by a query string and a fragment remark. The base64 userinfo may
/// arrive with its padding stripped, or as plain `method:password`.
pub fn explode_ss(ss: &str) -> Result<Node, ParseError> {
    let Some(rest) = ss.strip_prefix("ss://") else {
        return Err(ParseError::UnsupportedScheme("ss".to_string()));
    };
    let mut content = rest.replace("/?", "?");

    // Fragment carries the display name.
    let mut name = String::new();
    if let Some(hash_pos) = content.find('#') {
        name = url_decode(&content[hash_pos + 1..]);
        content.truncate(hash_pos);
    }

    // Keep unrecognized query parameters (plugin options and the like).
    let mut params = BTreeMap::new();
    if let Some(query_pos) = content.find('?') {
        for (key, value) in url::form_urlencoded::parse(content[query_pos + 1..].as_bytes()) {
            params.insert(key.into_owned(), value.into_owned());
        }
        content.truncate(query_pos);
    }

    let (cipher, password, server, port) = if let Some((userinfo, server_part)) =
        content.split_once('@')
    {
        // SIP002: userinfo is base64(method:password), or occasionally plain.
        let (server, port) = split_server_port(server_part)?;
        let (cipher, password) = match url_safe_base64_decode(userinfo) {
            Some(decoded) => split_userinfo(&decoded),
            None => split_userinfo(userinfo),
        };
        (cipher, password, server, port)
    } else {
        // Legacy: the whole body is base64(method:password@host:port).
        let decoded = url_safe_base64_decode(&content)
            .ok_or_else(|| ParseError::malformed("body", "invalid base64"))?;
        let (userinfo, server_part) = decoded
            .split_once('@')
            .ok_or_else(|| ParseError::malformed("body", "missing @ separator"))?;
        let (server, port) = split_server_port(server_part)?;
        let (cipher, password) = split_userinfo(userinfo);
        (cipher, password, server, port)
    };

    if server.is_empty() {
        return Err(ParseError::malformed("server", "empty host"));
    }

    let name = if name.is_empty() {
        format!("{} ({})", server, port)
    } else {
        name
    };

    let mut node = Node::ss(name, server, port, cipher, password);
    node.extra.params = params;
    Ok(node)
}

/// Parse a timed `ss://time:` entry: verify it, then parse the embedded
/// link and annotate the name with the expiry.
pub fn explode_timed_ss(uri: &str, ctx: &ParseContext) -> Result<Node, ParseError> {
    let Some(secret) = ctx.secret.as_deref() else {
        return Err(ParseError::malformed(
            "timed_link",
            "no verification secret configured",
        ));
    };
    let link = timed_link::unseal(uri, secret, ctx.now)
        .map_err(|e| ParseError::malformed("timed_link", e.to_string()))?;

    let mut node = explode_ss(&link.payload)?;
    node.name = format!(
        "{} (expires {})",
        node.name,
        timed_link::format_expiry(link.expires_at)
    );
    node.extra.expires_at = Some(link.expires_at);
    Ok(node)
}

/// Serialize a Shadowsocks node back into a SIP002 link.
pub fn encode_ss(node: &Node) -> Option<String> {
    use crate::models::Credentials;
    use crate::utils::base64::url_safe_base64_encode;
    use crate::utils::url::url_encode;

    let Credentials::Ss { cipher, password } = &node.credentials else {
        return None;
    };
    let userinfo = url_safe_base64_encode(&format!("{}:{}", cipher, password));
    Some(format!(
        "ss://{}@{}:{}#{}",
        userinfo,
        node.server,
        node.port,
        url_encode(&node.name)
    ))
}

fn split_userinfo(userinfo: &str) -> (String, String) {
    match userinfo.split_once(':') {
        // Password may itself contain colons.
        Some((cipher, password)) => (cipher.to_string(), password.to_string()),
        None => (DEFAULT_CIPHER.to_string(), userinfo.to_string()),
    }
}

fn split_server_port(server_part: &str) -> Result<(String, u16), ParseError> {
    // rsplit keeps IPv6 literals like [2001:db8::1]:443 intact.
    let (server, port_str) = server_part
        .rsplit_once(':')
        .ok_or_else(|| ParseError::malformed("port", "missing port"))?;
    let port = port_str
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| ParseError::malformed("port", format!("invalid port {:?}", port_str)))?;
    Ok((server.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Credentials, Protocol};

    #[test]
    fn test_explode_ss_sip002_format() {
        // ss://base64(aes-256-gcm:password)@example.com:443#Node1
        let node = explode_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:443#Node1").unwrap();

        assert_eq!(node.protocol(), Protocol::Ss);
        assert_eq!(node.server, "example.com");
        assert_eq!(node.port, 443);
        assert_eq!(node.name, "Node1");
        assert_eq!(
            node.credentials,
            Credentials::Ss {
                cipher: "aes-256-gcm".to_string(),
                password: "password".to_string(),
            }
        );
    }

    #[test]
    fn test_explode_ss_sip002_without_padding() {
        let node = explode_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@example.com:443").unwrap();
        assert_eq!(
            node.credentials,
            Credentials::Ss {
                cipher: "aes-256-gcm".to_string(),
                password: "password".to_string(),
            }
        );
        // No fragment: remark falls back to server (port)
        assert_eq!(node.name, "example.com (443)");
    }

    #[test]
    fn test_explode_ss_legacy_format() {
        // ss://base64(chacha20-ietf-poly1305:password@127.0.0.1:8080)
        let node =
            explode_ss("ss://Y2hhY2hhMjAtaWV0Zi1wb2x5MTMwNTpwYXNzd29yZEAxMjcuMC4wLjE6ODA4MA==")
                .unwrap();
        assert_eq!(node.server, "127.0.0.1");
        assert_eq!(node.port, 8080);
        assert_eq!(
            node.credentials,
            Credentials::Ss {
                cipher: "chacha20-ietf-poly1305".to_string(),
                password: "password".to_string(),
            }
        );
    }

    #[test]
    fn test_explode_ss_plain_credentials() {
        let node = explode_ss("ss://aes-256-gcm:password123@example.com:8388").unwrap();
        assert_eq!(
            node.credentials,
            Credentials::Ss {
                cipher: "aes-256-gcm".to_string(),
                password: "password123".to_string(),
            }
        );
    }

    #[test]
    fn test_explode_ss_password_with_colon() {
        // base64(chacha20-ietf-poly1305:pass:word)
        let node =
            explode_ss("ss://Y2hhY2hhMjAtaWV0Zi1wb2x5MTMwNTpwYXNzOndvcmQ=@example.com:8388")
                .unwrap();
        assert_eq!(
            node.credentials,
            Credentials::Ss {
                cipher: "chacha20-ietf-poly1305".to_string(),
                password: "pass:word".to_string(),
            }
        );
    }

    #[test]
    fn test_explode_ss_ipv6_host() {
        let node =
            explode_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@[2001:db8::1]:8388").unwrap();
        assert_eq!(node.server, "[2001:db8::1]");
        assert_eq!(node.port, 8388);
    }

    #[test]
    fn test_explode_ss_keeps_query_params() {
        let node = explode_ss(
            "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:8388/?plugin=obfs-local%3Bobfs%3Dhttp#P",
        )
        .unwrap();
        assert_eq!(
            node.extra.params.get("plugin").map(String::as_str),
            Some("obfs-local;obfs=http")
        );
    }

    #[test]
    fn test_explode_ss_invalid() {
        assert!(matches!(
            explode_ss("ss://invalid").unwrap_err(),
            ParseError::Malformed { .. }
        ));
        assert!(matches!(
            explode_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:0").unwrap_err(),
            ParseError::Malformed { field: "port", .. }
        ));
        assert!(matches!(
            explode_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:99999").unwrap_err(),
            ParseError::Malformed { field: "port", .. }
        ));
    }

    #[test]
    fn test_encode_parse_round_trip() {
        let node = Node::ss("Node1", "example.com", 443, "aes-256-gcm", "password");
        let uri = encode_ss(&node).unwrap();
        let parsed = explode_ss(&uri).unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn test_explode_timed_ss() {
        let secret = b"test-secret";
        let now = 1_700_000_000;
        let inner = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:443#Node1";
        let timed = timed_link::generate_timed_link(inner, 24, secret, now).unwrap();

        let ctx = ParseContext::new(secret.to_vec(), now);
        let node = explode_timed_ss(&timed, &ctx).unwrap();
        assert_eq!(node.server, "example.com");
        assert!(node.name.starts_with("Node1 (expires "));
        assert_eq!(node.extra.expires_at, Some(now + 24 * 3600));
    }

    #[test]
    fn test_explode_timed_ss_expired() {
        let secret = b"test-secret";
        let now = 1_700_000_000;
        let inner = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:443#Node1";
        let timed = timed_link::generate_timed_link(inner, 1, secret, now).unwrap();

        let ctx = ParseContext::new(secret.to_vec(), now + 2 * 3600);
        assert!(matches!(
            explode_timed_ss(&timed, &ctx).unwrap_err(),
            ParseError::Malformed {
                field: "timed_link",
                ..
            }
        ));
    }

    #[test]
    fn test_explode_timed_ss_without_secret() {
        let timed = timed_link::generate_timed_link(
            "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:443",
            1,
            b"k",
            0,
        )
        .unwrap();
        assert!(explode_timed_ss(&timed, &ParseContext::default()).is_err());
    }
}
