pub mod convert;

pub use convert::{convert, ConvertOutcome, ConvertRequest, Diagnostics};
