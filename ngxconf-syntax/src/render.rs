//! Renderer for configuration ASTs
//!
//! Converts a node list back into text. The layout is fixed so output can
//! be diffed against files written by earlier tooling:
//!
//! - one line per statement, tokens joined by a single space
//! - `header {` / `}` around every body
//! - a line holding a single space before every nested block-like child
//!   (never before statements, never at top level)

use crate::options::{RenderOptions, MAX_INDENT};
use crate::parser::ast::*;
use crate::parser::parser::is_variable;
use std::io::Write;
use thiserror::Error;

/// Line emitted before a nested block
const SEPARATOR: &str = " ";

/// Structurally invalid AST or options handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("statement has no tokens")]
    EmptyStatement,

    #[error("block has an empty selector")]
    EmptySelector,

    #[error("selector `{0}` has more than three tokens")]
    SelectorTooLong(String),

    #[error("empty token in `{0}`")]
    EmptyToken(String),

    #[error("token `{0}` contains `{{`, `}}` or `;` outside quotes")]
    ReservedCharacter(String),

    #[error("map entry `{0}` has an empty key or value")]
    EmptyMapEntry(String),

    #[error("`{0}` is not a variable")]
    InvalidVariable(String),

    #[error("conditional has an empty condition")]
    EmptyCondition,

    #[error("condition `{0}` has unbalanced parentheses")]
    UnbalancedCondition(String),

    #[error("indent {0} exceeds the maximum of {MAX_INDENT}")]
    IndentTooWide(usize),
}

/// Errors from the writer form of the renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid AST: {0}")]
    Shape(#[from] ShapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

type RenderResult<T> = Result<T, ShapeError>;

/// Renders nodes with a configurable indent width
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn with_indent(indent: usize) -> Self {
        Self::new(RenderOptions { indent })
    }

    /// Output lines, without newlines
    pub fn lines(&self, nodes: &[Node]) -> RenderResult<Vec<String>> {
        if self.options.indent > MAX_INDENT {
            return Err(ShapeError::IndentTooWide(self.options.indent));
        }
        let mut out = Vec::new();
        for node in nodes {
            self.render_node(node, 0, &mut out)?;
        }
        Ok(out)
    }

    /// Lines joined by `\n`, no trailing newline
    pub fn render(&self, nodes: &[Node]) -> RenderResult<String> {
        Ok(self.lines(nodes)?.join("\n"))
    }

    /// Every line followed by `\n`, including the last one
    pub fn write_to<W: Write>(&self, nodes: &[Node], mut writer: W) -> Result<(), RenderError> {
        for line in self.lines(nodes)? {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn render_node(&self, node: &Node, depth: usize, out: &mut Vec<String>) -> RenderResult<()> {
        match node {
            Node::Statement(statement) => {
                if statement.tokens.is_empty() {
                    return Err(ShapeError::EmptyStatement);
                }
                check_tokens(&statement.tokens)?;
                out.push(self.line(depth, &format!("{};", statement.tokens.join(" "))));
            }
            Node::Block(block) => {
                if block.selector.is_empty() {
                    return Err(ShapeError::EmptySelector);
                }
                if block.selector.len() > 3 {
                    return Err(ShapeError::SelectorTooLong(block.selector.join(" ")));
                }
                check_tokens(&block.selector)?;
                self.render_body(&block.selector.join(" "), &block.body, depth, out)?;
            }
            Node::Map(map) => self.render_map(map, depth, out)?,
            Node::Conditional(conditional) => {
                check_condition(&conditional.condition)?;
                let header = format!("{} ({})", Conditional::KEYWORD, conditional.condition);
                self.render_body(&header, &conditional.body, depth, out)?;
            }
        }
        Ok(())
    }

    fn render_body(
        &self,
        header: &str,
        body: &[Node],
        depth: usize,
        out: &mut Vec<String>,
    ) -> RenderResult<()> {
        out.push(self.line(depth, &format!("{} {{", header)));
        for child in body {
            if child.is_block_like() {
                out.push(SEPARATOR.to_string());
            }
            self.render_node(child, depth + 1, out)?;
        }
        out.push(self.line(depth, "}"));
        Ok(())
    }

    fn render_map(&self, map: &MapBlock, depth: usize, out: &mut Vec<String>) -> RenderResult<()> {
        for variable in [&map.source, &map.target] {
            if !is_variable(variable) {
                return Err(ShapeError::InvalidVariable(variable.clone()));
            }
        }

        out.push(self.line(depth, &format!("{} {{", map.selector().join(" "))));
        for entry in &map.entries {
            if entry.key.is_empty() || entry.value.trim().is_empty() {
                return Err(ShapeError::EmptyMapEntry(format!("{} {}", entry.key, entry.value)));
            }
            check_token(&entry.key)?;
            check_token(&entry.value)?;
            out.push(self.line(depth + 1, &format!("{} {};", entry.key, entry.value)));
        }
        out.push(self.line(depth, "}"));
        Ok(())
    }

    fn line(&self, depth: usize, text: &str) -> String {
        format!("{}{}", " ".repeat(depth * self.options.indent), text)
    }
}

fn check_tokens(tokens: &[String]) -> RenderResult<()> {
    if tokens.iter().any(String::is_empty) {
        return Err(ShapeError::EmptyToken(tokens.join(" ")));
    }
    tokens.iter().try_for_each(|t| check_token(t))
}

/// Must survive `if (...)`: no reserved characters and parentheses
/// balanced outside quotes
fn check_condition(condition: &str) -> RenderResult<()> {
    if condition.trim().is_empty() {
        return Err(ShapeError::EmptyCondition);
    }
    check_token(condition)?;

    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;
    for c in condition.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return Err(ShapeError::UnbalancedCondition(condition.to_string())),
            },
            _ => {}
        }
    }

    if depth != 0 || quoted {
        return Err(ShapeError::UnbalancedCondition(condition.to_string()));
    }
    Ok(())
}

/// `{`, `}` and `;` are only allowed inside double quotes
fn check_token(token: &str) -> RenderResult<()> {
    let mut quoted = false;
    let mut escaped = false;

    for c in token.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '{' | '}' | ';' if !quoted => {
                return Err(ShapeError::ReservedCharacter(token.to_string()));
            }
            _ => {}
        }
    }
    Ok(())
}
