//! ngxconf Configuration Syntax
//!
//! This crate parses nginx-style configuration text into a plain AST and
//! renders an AST back into text. It is directive-agnostic: statements are
//! token sequences, never interpreted.
//!
//! # Example
//!
//! ```rust,ignore
//! use ngxconf_syntax::{loads, dumps, Node, Statement};
//!
//! let mut nodes = loads("server { listen 80; }").unwrap();
//! nodes[0].body_mut().unwrap().push(Statement::new(["server_name", "example.com"]).into());
//!
//! assert_eq!(
//!     dumps(&nodes, 4).unwrap(),
//!     "server {\n    listen 80;\n    server_name example.com;\n}"
//! );
//! ```

pub mod adapter;
pub mod options;
pub mod parser;
pub mod render;

pub use adapter::{FlatAdapter, FlatError, JsonAdapter};
pub use options::{OptionsError, OptionsLoader, RenderOptions};
pub use parser::{
    parse, Block, Conditional, LexError, MapBlock, MapEntry, Node, Parser, Statement,
    SyntaxError,
};
pub use render::{RenderError, Renderer, ShapeError};

use std::io::{Read, Write};
use std::path::Path;

/// Parse configuration text
pub fn loads(source: &str) -> Result<Vec<Node>, SyntaxError> {
    parse(source)
}

/// Read and parse configuration from a reader
pub fn load<R: Read>(mut reader: R) -> Result<Vec<Node>, LoadError> {
    let mut source = String::new();
    reader.read_to_string(&mut source)?;
    Ok(loads(&source)?)
}

/// Read and parse a configuration file
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Node>, LoadError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading configuration");
    let source = std::fs::read_to_string(path)?;
    Ok(loads(&source)?)
}

/// Render nodes to a string, lines joined by `\n` without a trailing newline
pub fn dumps(nodes: &[Node], indent: usize) -> Result<String, ShapeError> {
    Renderer::with_indent(indent).render(nodes)
}

/// Render nodes to a writer, one `\n` after every line
pub fn dump<W: Write>(nodes: &[Node], writer: W, indent: usize) -> Result<(), RenderError> {
    Renderer::with_indent(indent).write_to(nodes, writer)
}

/// Render nodes into a file, replacing its contents
pub fn dump_file(nodes: &[Node], path: impl AsRef<Path>, indent: usize) -> Result<(), RenderError> {
    let path = path.as_ref();
    let renderer = Renderer::with_indent(indent);
    // Render first so an invalid AST never truncates the file
    let lines = renderer.lines(nodes)?;
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    file.flush()?;
    tracing::debug!(path = %path.display(), "wrote configuration");
    Ok(())
}

/// Loading error
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SITE: &str = r#"
        user www-data;
        server {
            listen   80;
            server_name foo.com;
            root /home/ubuntu/sites/foo/;

            location /status {
                check_status;
                types {
                    image/jpeg jpg;
                }
            }

            location ~ case_sensitive\.php$ {
                hoge hoge;
            }
            location ~* case_insensitive\.php$ {}
            location = exact_match\.php$ {}
            location ^~ ignore_regex\.php$ {}

        }"#;

    #[test]
    fn test_load_from_reader() {
        let nodes = load(Cursor::new(SITE)).unwrap();
        assert_eq!(nodes.len(), 2);

        let server = nodes[1].body().unwrap();
        let selectors: Vec<Vec<String>> = server
            .iter()
            .filter_map(|n| match n {
                Node::Block(b) => Some(b.selector.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            selectors,
            vec![
                vec!["location", "/status"],
                vec!["location", "~", "case_sensitive\\.php$"],
                vec!["location", "~*", "case_insensitive\\.php$"],
                vec!["location", "=", "exact_match\\.php$"],
                vec!["location", "^~", "ignore_regex\\.php$"],
            ]
        );
    }

    #[test]
    fn test_load_reports_syntax_errors() {
        assert!(matches!(load(Cursor::new("foo bar")), Err(LoadError::Syntax(_))));
        assert!(matches!(load_file("/nonexistent/ngxconf.conf"), Err(LoadError::Io(_))));
    }

    #[test]
    fn test_dumps_after_mutation() {
        let mut nodes = loads("server { listen 80; }").unwrap();
        nodes[0]
            .body_mut()
            .unwrap()
            .push(Statement::new(["server_name", "example.com"]).into());
        assert_eq!(
            dumps(&nodes, 4).unwrap(),
            "server {\n    listen 80;\n    server_name example.com;\n}"
        );
    }

    #[test]
    fn test_dump_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.conf");
        let nodes = loads(SITE).unwrap();

        dump_file(&nodes, &path, 4).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("}\n"));
        assert_eq!(load_file(&path).unwrap(), nodes);
    }

    #[test]
    fn test_dump_file_keeps_file_on_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.conf");
        std::fs::write(&path, "user nginx;\n").unwrap();

        let bad = vec![Node::Statement(Statement { tokens: vec![] })];
        assert!(matches!(dump_file(&bad, &path, 4), Err(RenderError::Shape(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "user nginx;\n");
    }
}
