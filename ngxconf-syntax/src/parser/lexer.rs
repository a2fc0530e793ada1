//! Lexer for nginx-style configuration text
//!
//! Tokenizes the directive/block dialect.
//!
//! Key features:
//! - Whitespace is kept as a token: value runs retain their inner spacing
//! - `{` `}` `;` are structural
//! - "..." quoted strings keep their quotes and may contain `{`, `}`, `;`
//! - `#` at a token boundary starts a comment (skipped)

use logos::{Logos, Span};
use std::fmt;
use std::ops::Range;

/// Source location for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Span> for Location {
    fn from(span: Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
        }
    }
}

/// A token with its location in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Location,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: impl Into<Location>) -> Self {
        Self {
            value,
            span: span.into(),
        }
    }
}

/// Token types for the configuration dialect
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    /// Spaces, tabs and newlines. The parser needs them to rebuild values.
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    // A word may contain `#`, so this only fires at a token boundary.
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,

    // ============================================================
    // Structural
    // ============================================================
    #[token("{")]
    BlockOpen,

    #[token("}")]
    BlockClose,

    #[token(";")]
    Semicolon,

    // ============================================================
    // Values
    // ============================================================

    /// Quoted string literal, stored with its quotes: "..."
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    Quoted(String),

    /// Bare word (names, paths, IPs, regexes, variables, ...)
    #[regex(r##"[^ \t\r\n\f{};"#][^ \t\r\n\f{};"]*"##, |lex| lex.slice().to_string())]
    Word(String),
}

impl Token {
    /// Tokens that may appear inside a value run.
    pub fn is_text(&self) -> bool {
        matches!(self, Token::Whitespace | Token::Quoted(_) | Token::Word(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Whitespace => write!(f, "whitespace"),
            Token::BlockOpen => write!(f, "{{"),
            Token::BlockClose => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),
            Token::Quoted(s) | Token::Word(s) => write!(f, "{}", s),
            Token::Comment => write!(f, "comment"),
        }
    }
}

/// Lexer result type
pub type LexResult = Result<Vec<Spanned<Token>>, LexError>;

/// Lexer error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character at position {position}")]
    UnexpectedChar { position: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnexpectedChar { position } => *position,
        }
    }
}

/// Tokenize configuration source text
pub fn tokenize(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    for (result, span) in lexer.spanned() {
        match result {
            Ok(Token::Comment) => continue,
            Ok(token) => tokens.push(Spanned::new(token, span)),
            // The word class accepts nearly everything, so this is an
            // unterminated quote in practice.
            Err(_) => return Err(LexError::UnexpectedChar { position: span.start }),
        }
    }

    tracing::trace!(count = tokens.len(), "tokenized source");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|s| s.value).collect()
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_basic_directive() {
        let tokens = values("listen 80;");
        assert_eq!(tokens, vec![word("listen"), Token::Whitespace, word("80"), Token::Semicolon]);
    }

    #[test]
    fn test_block() {
        let tokens = values("server {\n  root /srv;\n}");
        assert_eq!(tokens[0], word("server"));
        assert_eq!(tokens[1], Token::Whitespace);
        assert_eq!(tokens[2], Token::BlockOpen);
        assert_eq!(tokens[3], Token::Whitespace);
        assert_eq!(tokens[4], word("root"));
        assert_eq!(tokens[6], word("/srv"));
        assert_eq!(tokens[7], Token::Semicolon);
        assert_eq!(tokens[9], Token::BlockClose);
    }

    #[test]
    fn test_quotes_and_comments() {
        let source = r#"
            # This is a comment
            add_header X-Test "a;b{c}"; # Inline comment
        "#;
        let t: Vec<Token> = values(source)
            .into_iter()
            .filter(|t| *t != Token::Whitespace)
            .collect();
        assert_eq!(t[0], word("add_header"));
        assert_eq!(t[1], word("X-Test"));
        assert_eq!(t[2], Token::Quoted("\"a;b{c}\"".to_string()));
        assert_eq!(t[3], Token::Semicolon);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn test_hash_inside_word_is_not_a_comment() {
        let tokens = values("color a#b;");
        assert_eq!(tokens[2], word("a#b"));
    }

    #[test]
    fn test_word_stops_at_quote_but_keeps_inner_hash() {
        let tokens = values("a\"b\"c#d");
        assert_eq!(
            tokens,
            vec![word("a"), Token::Quoted("\"b\"".to_string()), word("c#d")]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("a  b").unwrap();
        assert_eq!(tokens[1].span, Location { start: 1, end: 3 });
        assert_eq!(tokens[2].span.range(), 3..4);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = tokenize("root \"/var/www;").unwrap_err();
        assert_eq!(err, LexError::UnexpectedChar { position: 5 });
    }
}
