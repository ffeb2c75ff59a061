//! Plain Shadowsocks subscription output, used by the redemption endpoint.

use log::warn;

use crate::models::Node;
use crate::parser::explodes::ss::encode_ss;
use crate::timed_link::generate_timed_link;
use crate::utils::base64::base64_encode;

/// Builds a base64 subscription body of timed `ss://` links for every
/// Shadowsocks node in the list. Non-ss nodes are passed over, as only ss
/// links can carry an expiry envelope.
pub fn timed_ss_subscription(nodes: &[Node], ttl_hours: u32, secret: &[u8], now: i64) -> String {
    let links: Vec<String> = nodes
        .iter()
        .filter_map(encode_ss)
        .filter_map(|ss_url| match generate_timed_link(&ss_url, ttl_hours, secret, now) {
            Ok(link) => Some(link),
            Err(e) => {
                warn!("failed to sign {}: {}", ss_url, e);
                None
            }
        })
        .collect();
    base64_encode(&links.join("\n"))
}
