//! Subscription and proxy-URI parsing.

pub mod explodes;
pub mod node_manip;
pub mod subparser;

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::models::{Node, Protocol};
use crate::timed_link::TIMED_PREFIX;

/// Context threaded through parsing so timed entries can be verified.
///
/// `now` is injected by the caller, which keeps every parse deterministic
/// and testable.
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    /// Secret for verifying timed `ss://time:` entries. Without it such
    /// entries are recorded as per-line failures.
    pub secret: Option<Vec<u8>>,
    /// Unix seconds used for expiry checks.
    pub now: i64,
}

impl ParseContext {
    pub fn new(secret: impl Into<Vec<u8>>, now: i64) -> Self {
        ParseContext {
            secret: Some(secret.into()),
            now,
        }
    }
}

/// Decodes a single proxy URI into a node.
///
/// Timed `ss://time:` entries need a verification secret; use
/// [`parse_node_with`] for those.
pub fn parse_node(uri: &str) -> Result<Node, ParseError> {
    parse_node_with(uri, &ParseContext::default())
}

/// Decodes a single proxy URI into a node, verifying timed entries against
/// the context's secret. Never panics on malformed input.
pub fn parse_node_with(uri: &str, ctx: &ParseContext) -> Result<Node, ParseError> {
    if uri.starts_with(TIMED_PREFIX) {
        return explodes::ss::explode_timed_ss(uri, ctx);
    }

    let scheme = uri.split("://").next().unwrap_or(uri);
    match Protocol::from_scheme(scheme) {
        Some(Protocol::Ss) => explodes::ss::explode_ss(uri),
        Some(Protocol::Vmess) => explodes::vmess::explode_vmess(uri),
        Some(Protocol::Vless) => explodes::vless::explode_vless(uri),
        Some(Protocol::Trojan) => explodes::trojan::explode_trojan(uri),
        Some(Protocol::Hysteria2) => explodes::hysteria2::explode_hysteria2(uri),
        None => Err(ParseError::UnsupportedScheme(truncate_scheme(scheme))),
    }
}

static NON_HEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^0-9a-fA-F]").expect("static pattern compiles")
});

/// Normalizes a UUID-ish string to canonical hyphenated lowercase form.
///
/// Separators and stray characters are stripped first; anything that does
/// not leave exactly 32 hex digits is rejected rather than replaced, so the
/// same input always yields the same node.
pub fn normalize_uuid(raw: &str) -> Option<String> {
    let hex = NON_HEX.replace_all(raw, "").to_lowercase();
    if hex.len() != 32 {
        return None;
    }
    let formatted = format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    );
    uuid::Uuid::parse_str(&formatted).ok()?;
    Some(formatted)
}

fn truncate_scheme(s: &str) -> String {
    s.chars().take(24).collect()
}
