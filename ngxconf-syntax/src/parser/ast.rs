//! Abstract Syntax Tree for nginx-style configuration
//!
//! A configuration is an ordered list of [`Node`]s. The tree carries no
//! spans and no cross references, so callers can freely build, inspect and
//! rewrite it before handing it to the renderer.

use serde::{Deserialize, Serialize};

/// One entry of a configuration body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// `name args;`
    Statement(Statement),

    /// `name [modifier] [argument] { ... }`
    Block(Block),

    /// `map $source $target { key value; ... }`
    Map(MapBlock),

    /// `if (condition) { ... }`
    Conditional(Conditional),
}

impl Node {
    /// Directive name of the node: the first token of a statement or
    /// selector, `map` or `if`.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Statement(s) => s.tokens.first().map(String::as_str),
            Node::Block(b) => b.selector.first().map(String::as_str),
            Node::Map(_) => Some(MapBlock::KEYWORD),
            Node::Conditional(_) => Some(Conditional::KEYWORD),
        }
    }

    /// Anything rendered with braces
    pub fn is_block_like(&self) -> bool {
        !matches!(self, Node::Statement(_))
    }

    /// Nested nodes of a block or conditional
    pub fn body(&self) -> Option<&[Node]> {
        match self {
            Node::Block(b) => Some(&b.body),
            Node::Conditional(c) => Some(&c.body),
            Node::Statement(_) | Node::Map(_) => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Block(b) => Some(&mut b.body),
            Node::Conditional(c) => Some(&mut c.body),
            Node::Statement(_) | Node::Map(_) => None,
        }
    }
}

impl From<Statement> for Node {
    fn from(statement: Statement) -> Self {
        Node::Statement(statement)
    }
}

impl From<Block> for Node {
    fn from(block: Block) -> Self {
        Node::Block(block)
    }
}

impl From<MapBlock> for Node {
    fn from(map: MapBlock) -> Self {
        Node::Map(map)
    }
}

impl From<Conditional> for Node {
    fn from(conditional: Conditional) -> Self {
        Node::Conditional(conditional)
    }
}

// ============================================================
// Statement
// ============================================================

/// A directive terminated by `;`
///
/// Parsed statements hold the name and, when present, the whole argument
/// text as a single token. `set` is the exception and is split into words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub tokens: Vec<String>,
}

impl Statement {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Everything after the directive name
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }
}

// ============================================================
// Block
// ============================================================

/// A named, brace-delimited group of nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Name, optional modifier, optional argument
    pub selector: Vec<String>,
    pub body: Vec<Node>,
}

impl Block {
    pub fn new<I, S>(selector: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selector: selector.into_iter().map(Into::into).collect(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Vec<Node>) -> Self {
        self.body = body;
        self
    }

    pub fn push(mut self, node: impl Into<Node>) -> Self {
        self.body.push(node.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.selector.first().map(String::as_str)
    }
}

// ============================================================
// Map
// ============================================================

/// `map $source $target { ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapBlock {
    pub source: String,
    pub target: String,
    pub entries: Vec<MapEntry>,
}

/// One `key value;` line of a map. Quoted keys keep their quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: String,
    pub value: String,
}

impl MapBlock {
    pub const KEYWORD: &'static str = "map";

    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push(MapEntry {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Header tokens as they appear in source: `["map", source, target]`
    pub fn selector(&self) -> [&str; 3] {
        [Self::KEYWORD, &self.source, &self.target]
    }

    /// Look up the value for an exact key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}

// ============================================================
// Conditional
// ============================================================

/// `if (condition) { ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditional {
    /// Raw text between the parentheses
    pub condition: String,
    pub body: Vec<Node>,
}

impl Conditional {
    pub const KEYWORD: &'static str = "if";

    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Vec<Node>) -> Self {
        self.body = body;
        self
    }
}
