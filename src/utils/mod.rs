pub mod base64;
pub mod http;
pub mod url;

pub use base64::{base64_decode_padded, base64_encode, url_safe_base64_decode, url_safe_base64_encode};
pub use url::{url_decode, url_encode};
