pub mod error;
pub mod generator;
pub mod interfaces;
pub mod models;
pub mod parser;
pub mod settings;
pub mod template;
pub mod timed_link;
pub mod utils;
pub mod web_handlers;

// Re-export the core types for easier access
pub use error::{ConvertError, DecodeError, ParseError, RenderError, SignError};
pub use models::{Credentials, Node, Protocol};
pub use settings::Settings;
