//! JSON AST adapter

use crate::parser::ast::Node;

/// Lossless JSON form of the AST
pub struct JsonAdapter;

impl JsonAdapter {
    /// Parse a JSON AST
    pub fn parse(input: &str) -> Result<Vec<Node>, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Serialize an AST to pretty JSON
    pub fn serialize(nodes: &[Node]) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(nodes)
    }
}
