pub mod app_state;
pub mod batch;
pub mod node;
pub mod options;

pub use app_state::AppState;
pub use batch::{ParseFailure, ParsedEntry, SubscriptionBatch};
pub use node::{Credentials, Node, NodeExtra, Protocol};
pub use options::{ConversionOptions, OutputFormat, SourceKind, UnsupportedPolicy};
