//! Configuration adapters
//!
//! Exchange formats for the AST besides configuration text.

mod flat;
mod json;

pub use flat::{FlatAdapter, FlatError};
pub use json::JsonAdapter;
