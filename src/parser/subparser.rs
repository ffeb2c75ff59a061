//! Whole-subscription decoding.

use log::debug;

use crate::models::{ParsedEntry, SubscriptionBatch};
use crate::parser::{parse_node_with, ParseContext};
use crate::utils::base64::base64_decode_padded;

/// Decodes a raw subscription payload into a batch of per-line outcomes.
///
/// The payload is first tried as one whole-body base64 blob (the common
/// provider convention); if that does not decode to UTF-8 text it is treated
/// as plain newline-delimited text. Every non-blank line is parsed; failures
/// are recorded in the batch rather than raised, and entry order always
/// equals input line order.
pub fn decode(raw: &[u8], ctx: &ParseContext) -> SubscriptionBatch {
    let text = String::from_utf8_lossy(raw);
    let content = match decode_base64_body(&text) {
        Some(decoded) => {
            debug!("subscription body decoded as base64");
            decoded
        }
        None => text.into_owned(),
    };

    let entries: Vec<ParsedEntry> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| ParsedEntry {
            raw: line.to_string(),
            outcome: parse_node_with(line, ctx),
        })
        .collect();

    debug!(
        "decoded subscription: {} entries",
        entries.len()
    );
    SubscriptionBatch::new(entries)
}

/// Attempts to treat the whole payload as a base64 blob. Interior
/// whitespace is ignored, as providers wrap long bodies.
fn decode_base64_body(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    let bytes = base64_decode_padded(&compact)?;
    String::from_utf8(bytes).ok()
}
