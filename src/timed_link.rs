//! Signed expiring links.
//!
//! A timed link wraps an ordinary `ss://` node URI together with an absolute
//! expiry timestamp and an HMAC-SHA256 signature over a fixed version tag,
//! the payload, and the big-endian expiry. The wire form is
//! `ss://time:<url-safe base64 of the JSON envelope>`, so clients that do not
//! understand timed links still treat them as opaque `ss://` entries.
//!
//! Verification always evaluates both the expiry and the signature;
//! `Expired` takes priority over `BadSignature` in the reported error.

use chrono::{LocalResult, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::SignError;
use crate::utils::base64::{url_safe_base64_decode, url_safe_base64_encode};

type HmacSha256 = Hmac<Sha256>;

/// Scheme prefix marking a timed entry inside a subscription.
pub const TIMED_PREFIX: &str = "ss://time:";

/// Domain-separation tag, bumped if the signing scheme ever changes.
const VERSION_TAG: &[u8] = b"timed-link-v1";

/// A signed capability: payload plus expiry plus MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedLink {
    pub payload: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub signature: Vec<u8>,
}

/// JSON envelope carried inside the wire form.
#[derive(Debug, Serialize, Deserialize)]
struct WireLink {
    original_url: String,
    expire_time: i64,
    signature: String,
}

fn keyed_mac(payload: &str, expires_at: i64, secret: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(VERSION_TAG);
    mac.update(payload.as_bytes());
    mac.update(&expires_at.to_be_bytes());
    mac
}

/// Signs `payload` so it stays redeemable for `ttl_hours` from `now`.
pub fn sign(payload: &str, ttl_hours: u32, secret: &[u8], now: i64) -> TimedLink {
    let expires_at = now + i64::from(ttl_hours) * 3600;
    let signature = keyed_mac(payload, expires_at, secret)
        .finalize()
        .into_bytes()
        .to_vec();
    TimedLink {
        payload: payload.to_string(),
        expires_at,
        signature,
    }
}

/// Verifies a timed link and returns its payload.
///
/// Both checks run unconditionally. A link past its expiry reports
/// `Expired` regardless of signature validity; `BadSignature` is reported
/// only for unexpired links whose MAC mismatches. The comparison itself is
/// constant-time (`Mac::verify_slice`).
pub fn verify(link: &TimedLink, secret: &[u8], now: i64) -> Result<String, SignError> {
    let signature_ok = keyed_mac(&link.payload, link.expires_at, secret)
        .verify_slice(&link.signature)
        .is_ok();
    let expired = now > link.expires_at;

    if expired {
        return Err(SignError::Expired(link.expires_at));
    }
    if !signature_ok {
        return Err(SignError::BadSignature);
    }
    Ok(link.payload.clone())
}

/// Serializes a link to its `ss://time:` wire form.
pub fn encode(link: &TimedLink) -> String {
    let wire = WireLink {
        original_url: link.payload.clone(),
        expire_time: link.expires_at,
        signature: to_hex(&link.signature),
    };
    let json = serde_json::to_string(&wire).expect("wire envelope serializes");
    format!("{}{}", TIMED_PREFIX, url_safe_base64_encode(&json))
}

/// Parses the wire form back into a `TimedLink` without verifying it.
/// Accepts the raw envelope with or without the `ss://time:` prefix, so the
/// same tokens work as subscription lines and as query parameters.
pub fn decode(input: &str) -> Result<TimedLink, SignError> {
    let envelope = input.strip_prefix(TIMED_PREFIX).unwrap_or(input);
    let json = url_safe_base64_decode(envelope)
        .ok_or_else(|| SignError::Malformed("envelope is not base64".to_string()))?;
    let wire: WireLink =
        serde_json::from_str(&json).map_err(|e| SignError::Malformed(e.to_string()))?;
    let signature = from_hex(&wire.signature)
        .ok_or_else(|| SignError::Malformed("signature is not hex".to_string()))?;
    Ok(TimedLink {
        payload: wire.original_url,
        expires_at: wire.expire_time,
        signature,
    })
}

/// Wraps an `ss://` node URI into a signed timed link.
pub fn generate_timed_link(
    ss_url: &str,
    ttl_hours: u32,
    secret: &[u8],
    now: i64,
) -> Result<String, SignError> {
    if !ss_url.starts_with("ss://") {
        return Err(SignError::Malformed(
            "only ss:// links can carry an expiry".to_string(),
        ));
    }
    Ok(encode(&sign(ss_url, ttl_hours, secret, now)))
}

/// Decodes and verifies a timed link in one step.
pub fn unseal(timed_url: &str, secret: &[u8], now: i64) -> Result<TimedLink, SignError> {
    let link = decode(timed_url)?;
    verify(&link, secret, now)?;
    Ok(link)
}

/// Human-readable expiry for node names and logs.
pub fn format_expiry(expires_at: i64) -> String {
    match Utc.timestamp_opt(expires_at, 0) {
        LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        _ => expires_at.to_string(),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn from_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&input[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_sign_verify_round_trip() {
        let link = sign("ss://abc@example.com:443#n", 24, SECRET, NOW);
        assert_eq!(link.expires_at, NOW + 24 * 3600);

        let payload = verify(&link, SECRET, NOW).unwrap();
        assert_eq!(payload, "ss://abc@example.com:443#n");

        // Valid right up to the expiry instant.
        assert!(verify(&link, SECRET, link.expires_at).is_ok());
    }

    #[test]
    fn test_verify_rejects_expired() {
        let link = sign("ss://abc@example.com:443#n", 1, SECRET, NOW);
        let err = verify(&link, SECRET, link.expires_at + 1).unwrap_err();
        assert_eq!(err, SignError::Expired(link.expires_at));
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let mut link = sign("ss://abc@example.com:443#n", 1, SECRET, NOW);
        link.payload.push('x');
        assert_eq!(verify(&link, SECRET, NOW).unwrap_err(), SignError::BadSignature);
    }

    #[test]
    fn test_verify_rejects_tampered_signature() {
        let mut link = sign("ss://abc@example.com:443#n", 1, SECRET, NOW);
        link.signature[0] ^= 0xff;
        assert_eq!(verify(&link, SECRET, NOW).unwrap_err(), SignError::BadSignature);
    }

    #[test]
    fn test_verify_rejects_shifted_expiry() {
        let mut link = sign("ss://abc@example.com:443#n", 1, SECRET, NOW);
        // Extending the lifetime without re-signing invalidates the MAC.
        link.expires_at += 3600;
        assert_eq!(verify(&link, SECRET, NOW).unwrap_err(), SignError::BadSignature);
    }

    #[test]
    fn test_expired_reported_before_bad_signature() {
        let mut link = sign("ss://abc@example.com:443#n", 1, SECRET, NOW);
        link.signature[0] ^= 0xff;
        let err = verify(&link, SECRET, link.expires_at + 10).unwrap_err();
        assert_eq!(err, SignError::Expired(link.expires_at));
    }

    #[test]
    fn test_wire_round_trip() {
        let wire = generate_timed_link("ss://abc@example.com:443#n", 24, SECRET, NOW).unwrap();
        assert!(wire.starts_with(TIMED_PREFIX));

        let link = unseal(&wire, SECRET, NOW).unwrap();
        assert_eq!(link.payload, "ss://abc@example.com:443#n");
        assert_eq!(link.expires_at, NOW + 24 * 3600);

        // The bare envelope (query-parameter form) decodes too.
        let envelope = wire.strip_prefix(TIMED_PREFIX).unwrap();
        assert!(unseal(envelope, SECRET, NOW).is_ok());
    }

    #[test]
    fn test_wire_rejects_wrong_secret() {
        let wire = generate_timed_link("ss://abc@example.com:443#n", 24, SECRET, NOW).unwrap();
        assert_eq!(
            unseal(&wire, b"other-secret", NOW).unwrap_err(),
            SignError::BadSignature
        );
    }

    #[test]
    fn test_generate_rejects_non_ss() {
        let err = generate_timed_link("vmess://abc", 24, SECRET, NOW).unwrap_err();
        assert!(matches!(err, SignError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("ss://time:!!!").unwrap_err(),
            SignError::Malformed(_)
        ));
        assert!(matches!(
            decode("ss://time:aGVsbG8").unwrap_err(),
            SignError::Malformed(_)
        ));
    }
}
