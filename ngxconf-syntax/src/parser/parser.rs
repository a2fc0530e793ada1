//! Configuration parser
//!
//! Recursive descent parser that converts tokens into AST.
//!
//! Alternatives inside a body are tried in a fixed order: `if`, `set`,
//! `map`, then the generic statement/block rule. The top level only
//! accepts statements, blocks and maps.

use crate::parser::ast::*;
use crate::parser::lexer::{tokenize, LexError, Location, Spanned, Token};
use std::ops::Range;
use thiserror::Error;

/// Parser error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),

    #[error("Unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof { position: usize, expected: String },

    #[error("Invalid syntax at position {position}: {message}")]
    InvalidSyntax { position: usize, message: String },
}

impl SyntaxError {
    /// Byte offset where the error was detected
    pub fn position(&self) -> usize {
        match self {
            SyntaxError::Lex(e) => e.position(),
            SyntaxError::UnexpectedToken { position, .. }
            | SyntaxError::UnexpectedEof { position, .. }
            | SyntaxError::InvalidSyntax { position, .. } => *position,
        }
    }

    /// Byte range to highlight in a diagnostic
    pub fn span(&self) -> Range<usize> {
        let start = self.position();
        start..start + 1
    }

    /// 1-based line and column of the error in `source`
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let before = source.get(..self.position()).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        (line, before[line_start..].chars().count() + 1)
    }
}

type ParseResult<T> = Result<T, SyntaxError>;

/// Where an entry is being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    Body,
}

/// Parser state
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned<Token>>,
    pos: usize,
}

impl<'src> Parser<'src> {
    /// Create a new parser from source text
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let tokens = tokenize(source)?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
        })
    }

    /// Parse the whole configuration
    pub fn parse(&mut self) -> ParseResult<Vec<Node>> {
        let mut nodes = Vec::new();

        self.skip_whitespace();
        while !self.is_eof() {
            nodes.push(self.parse_entry(Scope::TopLevel)?);
            self.skip_whitespace();
        }

        if nodes.is_empty() {
            return Err(self.unexpected("directive or block"));
        }

        tracing::debug!(nodes = nodes.len(), "parsed configuration");
        Ok(nodes)
    }

    // ========================================
    // Entries
    // ========================================

    fn parse_entry(&mut self, scope: Scope) -> ParseResult<Node> {
        let start = self.current_span();
        let head = match self.peek() {
            Some(Token::Word(word)) => word.clone(),
            _ => return Err(self.unexpected("directive name")),
        };

        if is_if_keyword(&head) {
            if scope == Scope::TopLevel {
                return Err(SyntaxError::InvalidSyntax {
                    position: start.start,
                    message: "`if` is only allowed inside a block".to_string(),
                });
            }
            return self.parse_conditional().map(Node::Conditional);
        }

        self.advance();

        if head == "set" && scope == Scope::Body {
            return self.parse_set().map(Node::Statement);
        }

        if head == MapBlock::KEYWORD {
            if let Some(map) = self.try_parse_map()? {
                return Ok(Node::Map(map));
            }
        }

        if !is_key(&head) {
            return Err(SyntaxError::InvalidSyntax {
                position: start.start,
                message: format!("invalid directive name `{}`", head),
            });
        }

        self.parse_statement_or_block(head, start)
    }

    /// `key [value];` or `key [modifier] [location] { ... }`
    fn parse_statement_or_block(&mut self, head: String, start: Location) -> ParseResult<Node> {
        let run = self.take_text_run();

        if let Some(first) = run.first() {
            if first.value != Token::Whitespace {
                return Err(SyntaxError::UnexpectedToken {
                    position: first.span.start,
                    expected: format!("whitespace after `{}`", head),
                    found: format!("`{}`", first.value),
                });
            }
        }

        match self.peek() {
            Some(Token::Semicolon) => {
                self.advance();
                let mut tokens = vec![head];
                let value = self.text_of(&run);
                if !value.is_empty() {
                    tokens.push(value);
                }
                tracing::trace!(name = %tokens[0], "statement");
                Ok(Node::Statement(Statement { tokens }))
            }
            Some(Token::BlockOpen) => {
                let selector = self.build_selector(head, &run, start)?;
                tracing::trace!(selector = ?selector, "block");
                let body = self.parse_body()?;
                Ok(Node::Block(Block { selector, body }))
            }
            _ => Err(self.unexpected("`;` or `{`")),
        }
    }

    fn build_selector(
        &self,
        head: String,
        run: &[Spanned<Token>],
        start: Location,
    ) -> ParseResult<Vec<String>> {
        let pieces = split_words(run);
        let mut selector = vec![head];

        match pieces.as_slice() {
            [] => {}
            [only] if is_modifier(only) => selector.push(only.clone()),
            [only] if is_location(only) => selector.push(only.clone()),
            [modifier, location] if is_modifier(modifier) && is_location(location) => {
                selector.push(modifier.clone());
                selector.push(location.clone());
            }
            _ => {
                return Err(SyntaxError::InvalidSyntax {
                    position: start.start,
                    message: format!(
                        "malformed selector `{} {}`",
                        selector[0],
                        pieces.join(" ")
                    ),
                });
            }
        }

        Ok(selector)
    }

    /// `{ entries... }`
    fn parse_body(&mut self) -> ParseResult<Vec<Node>> {
        self.expect(Token::BlockOpen)?;
        let mut body = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(Token::BlockClose) => {
                    self.advance();
                    return Ok(body);
                }
                Some(_) => body.push(self.parse_entry(Scope::Body)?),
                None => return Err(self.unexpected("`}`")),
            }
        }
    }

    // ========================================
    // if (...) { ... }
    // ========================================

    fn parse_conditional(&mut self) -> ParseResult<Conditional> {
        let start = self.current_span();
        // The head word may already hold the start of the condition: `if($x)`
        let mut raw = self.slice(start)[Conditional::KEYWORD.len()..].to_string();
        let mut depth = paren_depth(0, &raw);
        self.advance();

        // `{` inside the parentheses (`${var}`) does not open the body
        loop {
            match self.peek().cloned() {
                Some(Token::BlockOpen) if depth <= 0 => break,
                Some(Token::BlockClose) if depth <= 0 => {
                    return Err(self.unexpected("`{` after if condition"));
                }
                Some(Token::Semicolon) | None => {
                    return Err(self.unexpected("`{` after if condition"));
                }
                Some(token) => {
                    if let Token::Word(word) = &token {
                        depth = paren_depth(depth, word);
                    }
                    raw.push_str(self.slice(self.current_span()));
                    self.advance();
                }
            }
        }

        let condition = extract_condition(&raw);
        if condition.is_empty() {
            return Err(SyntaxError::InvalidSyntax {
                position: start.start,
                message: "`if` without a condition".to_string(),
            });
        }

        tracing::trace!(condition = %condition, "conditional");
        let body = self.parse_body()?;
        Ok(Conditional { condition, body })
    }

    // ========================================
    // set $var value...;
    // ========================================

    fn parse_set(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        let mut tokens = vec!["set".to_string()];
        let mut current = String::new();

        loop {
            match self.peek().cloned() {
                Some(Token::Semicolon) => {
                    self.advance();
                    break;
                }
                Some(Token::Whitespace) => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    self.advance();
                }
                Some(Token::Word(s)) | Some(Token::Quoted(s)) => {
                    current.push_str(&s);
                    self.advance();
                }
                _ => return Err(self.unexpected("`;` after set arguments")),
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }

        if tokens.len() == 1 {
            return Err(SyntaxError::InvalidSyntax {
                position: start.start,
                message: "`set` requires at least one argument".to_string(),
            });
        }

        Ok(Statement { tokens })
    }

    // ========================================
    // map $source $target { key value; ... }
    // ========================================

    /// Returns `None` without consuming anything when the header is not
    /// `map $a $b {`, so the generic rule can take over.
    fn try_parse_map(&mut self) -> ParseResult<Option<MapBlock>> {
        let mut i = self.pos;
        let mut vars = Vec::with_capacity(2);

        for _ in 0..2 {
            if self.token_at(i) != Some(&Token::Whitespace) {
                return Ok(None);
            }
            i += 1;
            match self.token_at(i) {
                Some(Token::Word(w)) if is_variable(w) => vars.push(w.clone()),
                _ => return Ok(None),
            }
            i += 1;
        }
        if self.token_at(i) == Some(&Token::Whitespace) {
            i += 1;
        }
        if self.token_at(i) != Some(&Token::BlockOpen) {
            return Ok(None);
        }

        self.pos = i;
        let entries = self.parse_map_body()?;
        let target = vars.pop().unwrap_or_default();
        let source = vars.pop().unwrap_or_default();

        tracing::trace!(%source, %target, entries = entries.len(), "map");
        Ok(Some(MapBlock {
            source,
            target,
            entries,
        }))
    }

    fn parse_map_body(&mut self) -> ParseResult<Vec<MapEntry>> {
        self.expect(Token::BlockOpen)?;
        let mut entries = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek().cloned() {
                Some(Token::BlockClose) => {
                    self.advance();
                    return Ok(entries);
                }
                Some(Token::Word(key)) | Some(Token::Quoted(key)) => {
                    let key_span = self.current_span();
                    self.advance();
                    if !self.check(&Token::Whitespace) {
                        return Err(self.unexpected("whitespace after map key"));
                    }
                    let run = self.take_text_run();
                    let value = self.text_of(&run);
                    self.expect(Token::Semicolon)?;
                    if value.is_empty() {
                        return Err(SyntaxError::InvalidSyntax {
                            position: key_span.start,
                            message: format!("map entry `{}` has no value", key),
                        });
                    }
                    entries.push(MapEntry { key, value });
                }
                _ => return Err(self.unexpected("map entry or `}`")),
            }
        }
    }

    // ========================================
    // Token utilities
    // ========================================

    /// Consume whitespace, words and quoted strings up to a structural token
    fn take_text_run(&mut self) -> Vec<Spanned<Token>> {
        let start = self.pos;
        while self.peek().is_some_and(Token::is_text) {
            self.pos += 1;
        }
        self.tokens[start..self.pos].to_vec()
    }

    /// Source text of a run with comments dropped and outer whitespace trimmed
    fn text_of(&self, run: &[Spanned<Token>]) -> String {
        let text: String = run.iter().map(|t| self.slice(t.span)).collect();
        text.trim().to_string()
    }

    fn slice(&self, span: Location) -> &'src str {
        &self.source[span.range()]
    }

    fn skip_whitespace(&mut self) {
        while self.check(&Token::Whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.token_at(self.pos)
    }

    fn token_at(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index).map(|s| &s.value)
    }

    fn advance(&mut self) -> Option<Token> {
        if self.pos < self.tokens.len() {
            let token = self.tokens[self.pos].value.clone();
            self.pos += 1;
            Some(token)
        } else {
            None
        }
    }

    fn check(&self, token: &Token) -> bool {
        match self.peek() {
            Some(current) => std::mem::discriminant(current) == std::mem::discriminant(token),
            None => false,
        }
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", expected)))
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.tokens.get(self.pos) {
            Some(token) => SyntaxError::UnexpectedToken {
                position: token.span.start,
                expected: expected.to_string(),
                found: format!("`{}`", token.value),
            },
            None => SyntaxError::UnexpectedEof {
                position: self.source.len(),
                expected: expected.to_string(),
            },
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_span(&self) -> Location {
        self.tokens
            .get(self.pos)
            .map(|s| s.span)
            .unwrap_or(Location {
                start: self.source.len(),
                end: self.source.len(),
            })
    }
}

// ========================================
// Token classes
// ========================================

fn is_if_keyword(word: &str) -> bool {
    word == Conditional::KEYWORD || word.starts_with("if(")
}

/// Directive or selector name: CIDR, IPv4, or `[A-Za-z0-9_/]+`
fn is_key(word: &str) -> bool {
    is_cidr(word)
        || is_ipv4(word)
        || word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '/')
}

fn is_ipv4(word: &str) -> bool {
    let parts: Vec<&str> = word.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| is_digits(p))
}

fn is_cidr(word: &str) -> bool {
    match word.split_once('/') {
        Some((ip, prefix)) => is_ipv4(ip) && is_digits(prefix),
        None => false,
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn is_variable(word: &str) -> bool {
    match word.strip_prefix('$') {
        Some(name) => !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
        None => false,
    }
}

fn is_modifier(word: &str) -> bool {
    matches!(word, "=" | "~*" | "~" | "^~")
}

fn is_location(word: &str) -> bool {
    !word.contains(',')
}

/// Whitespace-separated pieces of a run; adjacent words and quoted strings join
fn split_words(run: &[Spanned<Token>]) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for token in run {
        match &token.value {
            Token::Word(s) | Token::Quoted(s) => current.push_str(s),
            _ => {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

fn paren_depth(depth: isize, text: &str) -> isize {
    text.chars().fold(depth, |d, c| match c {
        '(' => d + 1,
        ')' => d - 1,
        _ => d,
    })
}

/// Text inside a leading parenthesized group, or the whole trimmed text
/// when it does not start with `(`. Anything after the matching `)` is dropped.
fn extract_condition(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix('(') else {
        return trimmed.to_string();
    };

    let mut depth = 1usize;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in inner.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth == 0 {
                    return inner[..i].trim().to_string();
                }
            }
            _ => {}
        }
    }

    // Unbalanced: keep everything after the opening parenthesis
    inner.trim().to_string()
}

/// Parse configuration source text into an AST
pub fn parse(source: &str) -> ParseResult<Vec<Node>> {
    let mut parser = Parser::new(source)?;
    parser.parse()
}
