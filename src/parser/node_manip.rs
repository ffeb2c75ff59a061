//! Post-decode node pipeline: informational-entry filtering, protocol
//! compatibility rewriting, and count limiting, applied in that fixed order.
//!
//! Compatibility mapping table (`compatible_mode`):
//!
//! | from      | to    | rewrite                                              |
//! |-----------|-------|------------------------------------------------------|
//! | hysteria2 | vmess | port 443, uuid = password, ws + tls, host = server   |
//! | others    | same  | unchanged                                            |
//!
//! A hysteria2 node whose password cannot be normalized into a UUID has no
//! viable mapping and is dropped, counted in `compat_dropped`.

use log::{debug, info};

use crate::models::{ConversionOptions, Credentials, Node, NodeExtra, Protocol};
use crate::parser::normalize_uuid;

/// Result of running the pipeline, with counts for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub nodes: Vec<Node>,
    pub info_filtered: usize,
    pub compat_dropped: usize,
}

/// Applies the option-driven pipeline. Deterministic: identical input and
/// options always produce the identical output sequence, and surviving nodes
/// keep their input order.
pub fn apply(
    nodes: Vec<Node>,
    options: &ConversionOptions,
    info_keywords: &[String],
) -> PipelineReport {
    let mut report = PipelineReport::default();
    let mut nodes = nodes;

    if options.filter_info_nodes {
        let before = nodes.len();
        nodes.retain(|node| {
            let is_info = is_info_node(node, info_keywords);
            if is_info {
                debug!("filtering informational entry: {}", node.name);
            }
            !is_info
        });
        report.info_filtered = before - nodes.len();
    }

    if options.compatible_mode {
        let mut rewritten = Vec::with_capacity(nodes.len());
        for node in nodes {
            match to_compatible(node) {
                Some(node) => rewritten.push(node),
                None => report.compat_dropped += 1,
            }
        }
        nodes = rewritten;
    }

    if let Some(limit) = options.effective_limit() {
        if nodes.len() > limit {
            info!("limiting nodes to {} (had {})", limit, nodes.len());
            nodes.truncate(limit);
        }
    }

    report.nodes = nodes;
    report
}

/// Matches provider-injected informational entries (remaining traffic,
/// expiry banners) by name. The keyword list is configuration data, matched
/// case-insensitively.
pub fn is_info_node(node: &Node, keywords: &[String]) -> bool {
    let name = node.name.to_lowercase();
    keywords
        .iter()
        .any(|keyword| name.contains(&keyword.to_lowercase()))
}

/// Rewrites one node per the compatibility mapping table, or `None` when no
/// viable mapping exists.
fn to_compatible(node: Node) -> Option<Node> {
    match node.protocol() {
        Protocol::Hysteria2 => {
            let Credentials::Hysteria2 { password } = &node.credentials else {
                return Some(node);
            };
            let uuid = match normalize_uuid(password) {
                Some(uuid) => uuid,
                None => {
                    info!(
                        "dropping {}: hysteria2 password cannot map to a vmess uuid",
                        node.name
                    );
                    return None;
                }
            };
            let extra = NodeExtra {
                network: Some("ws".to_string()),
                tls: true,
                skip_cert_verify: node.extra.skip_cert_verify.or(Some(true)),
                ws_path: Some("/".to_string()),
                ws_host: Some(node.server.clone()),
                ..NodeExtra::default()
            };
            debug!("rewriting hysteria2 -> vmess: {}", node.name);
            Some(Node::vmess(
                format!("{} (VMess compat)", node.name),
                node.server,
                443,
                uuid,
                0,
                "auto",
                extra,
            ))
        }
        _ => Some(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeExtra;

    fn keywords() -> Vec<String> {
        vec!["expire".to_string(), "traffic".to_string(), "流量".to_string()]
    }

    fn ss_node(name: &str) -> Node {
        Node::ss(name, "example.com", 443, "aes-256-gcm", "pw")
    }

    fn hy2_node(name: &str, password: &str) -> Node {
        Node::hysteria2(name, "hy2.example.com", 26500, password, NodeExtra::default())
    }

    #[test]
    fn test_info_filter() {
        let nodes = vec![
            ss_node("HK-01"),
            ss_node("Traffic remaining: 10GB"),
            ss_node("剩余流量 5GB"),
            ss_node("SG-02"),
        ];
        let options = ConversionOptions {
            compatible_mode: false,
            ..ConversionOptions::default()
        };
        let report = apply(nodes, &options, &keywords());

        assert_eq!(report.info_filtered, 2);
        let names: Vec<_> = report.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["HK-01", "SG-02"]);
    }

    #[test]
    fn test_filter_disabled_keeps_info_nodes() {
        let nodes = vec![ss_node("Traffic remaining: 10GB")];
        let options = ConversionOptions {
            filter_info_nodes: false,
            compatible_mode: false,
            ..ConversionOptions::default()
        };
        let report = apply(nodes, &options, &keywords());
        assert_eq!(report.nodes.len(), 1);
        assert_eq!(report.info_filtered, 0);
    }

    #[test]
    fn test_compat_rewrites_hysteria2() {
        let nodes = vec![hy2_node("HY", "42aca070-49ec-40c3-849f-bddddb2761ff")];
        let options = ConversionOptions {
            filter_info_nodes: false,
            ..ConversionOptions::default()
        };
        let report = apply(nodes, &options, &keywords());

        assert_eq!(report.nodes.len(), 1);
        let node = &report.nodes[0];
        assert_eq!(node.protocol(), Protocol::Vmess);
        assert_eq!(node.name, "HY (VMess compat)");
        assert_eq!(node.port, 443);
        assert_eq!(node.server, "hy2.example.com");
        assert!(matches!(
            &node.credentials,
            Credentials::Vmess { uuid, alter_id: 0, .. }
                if uuid == "42aca070-49ec-40c3-849f-bddddb2761ff"
        ));
        assert_eq!(node.extra.network.as_deref(), Some("ws"));
        assert_eq!(node.extra.ws_host.as_deref(), Some("hy2.example.com"));
    }

    #[test]
    fn test_compat_drops_unmappable() {
        let nodes = vec![hy2_node("HY", "just-a-password"), ss_node("SS")];
        let options = ConversionOptions {
            filter_info_nodes: false,
            ..ConversionOptions::default()
        };
        let report = apply(nodes, &options, &keywords());

        assert_eq!(report.compat_dropped, 1);
        assert_eq!(report.nodes.len(), 1);
        assert_eq!(report.nodes[0].name, "SS");
    }

    #[test]
    fn test_limit_truncates_after_filter() {
        let nodes = vec![
            ss_node("Traffic remaining"),
            ss_node("A"),
            ss_node("B"),
            ss_node("C"),
        ];
        let options = ConversionOptions {
            node_limit: Some(2),
            compatible_mode: false,
            ..ConversionOptions::default()
        };
        let report = apply(nodes, &options, &keywords());

        // Limit applies to the post-filter sequence, preserving order.
        let names: Vec<_> = report.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_zero_limit_never_truncates() {
        let nodes = vec![ss_node("A"), ss_node("B")];
        let options = ConversionOptions {
            node_limit: Some(0),
            filter_info_nodes: false,
            compatible_mode: false,
            ..ConversionOptions::default()
        };
        assert_eq!(apply(nodes, &options, &keywords()).nodes.len(), 2);
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let nodes = vec![
            ss_node("A"),
            hy2_node("H", "42aca070-49ec-40c3-849f-bddddb2761ff"),
            ss_node("expire 2026-01-01"),
            ss_node("B"),
        ];
        let options = ConversionOptions {
            node_limit: Some(3),
            ..ConversionOptions::default()
        };

        let first = apply(nodes.clone(), &options, &keywords());
        let second = apply(nodes, &options, &keywords());
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.info_filtered, second.info_filtered);
    }
}
