use base64::{engine::general_purpose, Engine as _};

/// Encodes a string to Base64 format.
pub fn base64_encode(input: &str) -> String {
    general_purpose::STANDARD.encode(input)
}

/// Decodes standard Base64, repairing missing padding first.
///
/// Subscription providers routinely strip the trailing `=` padding, so the
/// input is re-padded to a multiple of four before decoding.
///
/// # Returns
/// The decoded bytes, or `None` if the input is not valid Base64.
pub fn base64_decode_padded(input: &str) -> Option<Vec<u8>> {
    let padded = repad(input);
    general_purpose::STANDARD.decode(padded.as_bytes()).ok()
}

/// Reverses a URL-safe Base64 string to standard Base64 format.
pub fn url_safe_base64_reverse(input: &str) -> String {
    input.replace('-', "+").replace('_', "/")
}

/// Decodes a Base64 string that may use either the standard or URL-safe
/// alphabet, with or without padding. Returns `None` on invalid input or
/// non-UTF-8 plaintext.
pub fn url_safe_base64_decode(input: &str) -> Option<String> {
    let normalized = url_safe_base64_reverse(input.trim());
    let decoded = base64_decode_padded(&normalized)?;
    String::from_utf8(decoded).ok()
}

/// Encodes a string to URL-safe Base64 without padding.
pub fn url_safe_base64_encode(input: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(input)
}

fn repad(input: &str) -> String {
    let trimmed = input.trim_end_matches('=');
    let mut out = trimmed.to_string();
    match trimmed.len() % 4 {
        2 => out.push_str("=="),
        3 => out.push('='),
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_without_padding() {
        // "aes-256-gcm:password" with padding stripped
        let stripped = "YWVzLTI1Ni1nY206cGFzc3dvcmQ";
        let decoded = base64_decode_padded(stripped).unwrap();
        assert_eq!(decoded, b"aes-256-gcm:password");
    }

    #[test]
    fn test_url_safe_round_trip() {
        let original = "method:p+ss/word?";
        let encoded = url_safe_base64_encode(original);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert_eq!(url_safe_base64_decode(&encoded).unwrap(), original);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(url_safe_base64_decode("!!not base64!!").is_none());
    }
}
