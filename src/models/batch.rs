//! Per-request subscription batch: every input line with its parse outcome.

use serde::Serialize;

use crate::error::ParseError;
use crate::models::Node;

/// One subscription entry and the result of parsing it.
#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub raw: String,
    pub outcome: Result<Node, ParseError>,
}

/// A recorded per-line failure, surfaced as a diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct ParseFailure {
    pub line: String,
    pub reason: String,
}

/// Ordered decode result of a whole subscription payload.
///
/// Entry order equals input line order; the batch is immutable after decode.
/// A batch with zero successful nodes is an empty-result condition the caller
/// decides about, not an error here.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionBatch {
    entries: Vec<ParsedEntry>,
}

impl SubscriptionBatch {
    pub fn new(entries: Vec<ParsedEntry>) -> Self {
        SubscriptionBatch { entries }
    }

    pub fn entries(&self) -> &[ParsedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Successfully parsed nodes, in input order.
    pub fn nodes(&self) -> Vec<Node> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok().cloned())
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_ok()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.entries.len() - self.success_count()
    }

    /// Per-line failures, in input order. Lines are truncated so a huge bogus
    /// entry cannot balloon the diagnostics payload.
    pub fn failures(&self) -> Vec<ParseFailure> {
        self.entries
            .iter()
            .filter_map(|e| {
                e.outcome.as_ref().err().map(|err| ParseFailure {
                    line: truncate(&e.raw, 64),
                    reason: err.to_string(),
                })
            })
            .collect()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    }
}
