use serde_json::Value;

use crate::error::ParseError;
use crate::models::{Node, NodeExtra};
use crate::parser::normalize_uuid;
use crate::utils::base64::base64_decode_padded;

/// Parse a VMess link into a node.
///
/// The body after `vmess://` is base64-encoded JSON. Providers are sloppy
/// about field types, so `port` and `aid` are accepted as either strings or
/// numbers.
pub fn explode_vmess(vmess: &str) -> Result<Node, ParseError> {
    let Some(encoded) = vmess.strip_prefix("vmess://") else {
        return Err(ParseError::UnsupportedScheme("vmess".to_string()));
    };

    let decoded = base64_decode_padded(encoded)
        .ok_or_else(|| ParseError::malformed("body", "invalid base64"))?;
    let text = String::from_utf8(decoded)
        .map_err(|_| ParseError::malformed("body", "decoded body is not UTF-8"))?;
    let json: Value =
        serde_json::from_str(&text).map_err(|e| ParseError::malformed("body", e.to_string()))?;

    let server = json["add"].as_str().unwrap_or("").to_string();
    if server.is_empty() {
        return Err(ParseError::malformed("server", "missing add field"));
    }

    let port = string_or_number(&json["port"])
        .and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p != 0)
        .ok_or_else(|| ParseError::malformed("port", "missing or out of range"))?;

    let uuid = normalize_uuid(json["id"].as_str().unwrap_or(""))
        .ok_or_else(|| ParseError::malformed("uuid", "id is not a UUID"))?;

    let alter_id = string_or_number(&json["aid"])
        .and_then(|a| u16::try_from(a).ok())
        .unwrap_or(0);
    let cipher = non_empty(json["scy"].as_str()).unwrap_or("auto").to_string();
    let network = non_empty(json["net"].as_str()).unwrap_or("tcp").to_string();
    let tls = json["tls"].as_str() == Some("tls");
    let host = non_empty(json["host"].as_str()).map(str::to_string);
    let path = non_empty(json["path"].as_str()).map(str::to_string);
    let sni = non_empty(json["sni"].as_str()).map(str::to_string);

    let name = non_empty(json["ps"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} ({})", server, port));

    let extra = NodeExtra {
        tls,
        sni,
        ws_path: if network == "ws" {
            path.or_else(|| Some("/".to_string()))
        } else {
            None
        },
        ws_host: if network == "ws" { host } else { None },
        network: Some(network),
        ..NodeExtra::default()
    };

    Ok(Node::vmess(name, server, port, uuid, alter_id, cipher, extra))
}

fn string_or_number(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Credentials, Protocol};
    use crate::utils::base64::base64_encode;

    fn vmess_uri(json: &str) -> String {
        format!("vmess://{}", base64_encode(json))
    }

    #[test]
    fn test_explode_vmess_basic() {
        let uri = vmess_uri(
            r#"{"v":"2","ps":"Test Node","add":"example.com","port":"443",
               "id":"42aca070-49ec-40c3-849f-bddddb2761ff","aid":"0","scy":"auto",
               "net":"ws","tls":"tls","host":"cdn.example.com","path":"/ws"}"#,
        );
        let node = explode_vmess(&uri).unwrap();

        assert_eq!(node.protocol(), Protocol::Vmess);
        assert_eq!(node.name, "Test Node");
        assert_eq!(node.server, "example.com");
        assert_eq!(node.port, 443);
        assert_eq!(
            node.credentials,
            Credentials::Vmess {
                uuid: "42aca070-49ec-40c3-849f-bddddb2761ff".to_string(),
                alter_id: 0,
                cipher: "auto".to_string(),
            }
        );
        assert!(node.extra.tls);
        assert_eq!(node.extra.network.as_deref(), Some("ws"));
        assert_eq!(node.extra.ws_path.as_deref(), Some("/ws"));
        assert_eq!(node.extra.ws_host.as_deref(), Some("cdn.example.com"));
    }

    #[test]
    fn test_explode_vmess_numeric_port_and_aid() {
        let uri = vmess_uri(
            r#"{"ps":"N","add":"example.com","port":8443,
               "id":"42aca070-49ec-40c3-849f-bddddb2761ff","aid":2}"#,
        );
        let node = explode_vmess(&uri).unwrap();
        assert_eq!(node.port, 8443);
        assert!(matches!(
            node.credentials,
            Credentials::Vmess { alter_id: 2, .. }
        ));
        // Defaults apply when fields are absent.
        assert_eq!(node.extra.network.as_deref(), Some("tcp"));
        assert!(!node.extra.tls);
        assert_eq!(node.extra.ws_path, None);
    }

    #[test]
    fn test_explode_vmess_missing_name_falls_back() {
        let uri = vmess_uri(
            r#"{"add":"example.com","port":"443","id":"42aca070-49ec-40c3-849f-bddddb2761ff"}"#,
        );
        let node = explode_vmess(&uri).unwrap();
        assert_eq!(node.name, "example.com (443)");
    }

    #[test]
    fn test_explode_vmess_rejects_bad_uuid() {
        let uri = vmess_uri(r#"{"add":"example.com","port":"443","id":"nope"}"#);
        assert!(matches!(
            explode_vmess(&uri).unwrap_err(),
            ParseError::Malformed { field: "uuid", .. }
        ));
    }

    #[test]
    fn test_explode_vmess_rejects_invalid_body() {
        assert!(matches!(
            explode_vmess("vmess://%%%").unwrap_err(),
            ParseError::Malformed { field: "body", .. }
        ));
        let uri = vmess_uri("this is not json");
        assert!(matches!(
            explode_vmess(&uri).unwrap_err(),
            ParseError::Malformed { field: "body", .. }
        ));
    }
}
