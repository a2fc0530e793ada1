//! Parser module for nginx-style configuration
//!
//! This module provides the lexer, AST, and parser for the dialect.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{tokenize, Token, LexError, Spanned, Location};
pub use parser::{parse, SyntaxError, Parser};
