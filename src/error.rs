//! Error taxonomy shared across the conversion pipeline.
//!
//! Per-node failures (`ParseError`, skipped renders) are collected as
//! diagnostics; batch-level failures abort the request with one of the
//! typed errors below. The HTTP layer maps `error_kind()` strings to
//! status codes and never exposes anything beyond kind + detail.

use thiserror::Error;

use crate::models::Protocol;

/// Failure to decode a single proxy URI into a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("malformed {field}: {detail}")]
    Malformed { field: &'static str, detail: String },
}

impl ParseError {
    pub fn malformed(field: &'static str, detail: impl Into<String>) -> Self {
        ParseError::Malformed {
            field,
            detail: detail.into(),
        }
    }
}

/// Batch-level failure while obtaining or decoding a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("subscription contained no usable nodes")]
    EmptyBatch,
    #[error("failed to fetch subscription: {0}")]
    FetchFailed(String),
}

/// Failure while rendering nodes into a target document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("{protocol} node {name:?} cannot be expressed in {format} output")]
    UnsupportedInFormat {
        protocol: Protocol,
        name: String,
        format: &'static str,
    },
    #[error("template not found: {0}")]
    TemplateMissing(String),
}

/// Failure while verifying a timed link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("link expired at {0}")]
    Expired(i64),
    #[error("link signature mismatch")]
    BadSignature,
    #[error("malformed timed link: {0}")]
    Malformed(String),
}

/// Top-level failure of a conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ConvertError {
    /// Stable machine-readable kind for the HTTP boundary.
    pub fn error_kind(&self) -> &'static str {
        match self {
            ConvertError::Decode(DecodeError::EmptyBatch) => "empty_batch",
            ConvertError::Decode(DecodeError::FetchFailed(_)) => "fetch_failed",
            ConvertError::Render(RenderError::UnsupportedInFormat { .. }) => {
                "unsupported_in_format"
            }
            ConvertError::Render(RenderError::TemplateMissing(_)) => "template_missing",
        }
    }
}

impl SignError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            SignError::Expired(_) => "expired",
            SignError::BadSignature => "bad_signature",
            SignError::Malformed(_) => "malformed_link",
        }
    }
}
