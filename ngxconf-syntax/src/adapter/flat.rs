//! Flat list adapter
//!
//! The list-of-lists shape older tooling consumes:
//!
//! ```text
//! statement    ["listen", "80"]
//! block        [["location", "/"], [ ...body... ]]
//! map          [["map", "$a", "$b"], [["key", "value"], ...]]
//! conditional  "if", "<condition>", <body nodes>...   (spliced into the parent)
//! ```
//!
//! A spliced conditional does not record where its body ends, so it can be
//! exported but not imported.

use crate::parser::ast::*;
use serde_json::Value;
use thiserror::Error;

/// Flat shape conversion error
#[derive(Debug, Error)]
pub enum FlatError {
    #[error("spliced `if` at {path} cannot be imported: the end of its body is not recorded")]
    AmbiguousConditional { path: String },

    #[error("invalid shape at {path}: {message}")]
    InvalidShape { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type FlatResult<T> = Result<T, FlatError>;

/// Converts between the AST and the flat list shape
pub struct FlatAdapter;

impl FlatAdapter {
    /// Export nodes as a flat JSON value
    pub fn to_value(nodes: &[Node]) -> Value {
        Value::Array(flatten_body(nodes))
    }

    /// Import nodes from a flat JSON value
    pub fn from_value(value: &Value) -> FlatResult<Vec<Node>> {
        match value {
            Value::Array(items) => import_body(items, "$"),
            other => Err(invalid("$", format!("expected a list, found {}", other))),
        }
    }

    pub fn serialize(nodes: &[Node]) -> FlatResult<String> {
        Ok(serde_json::to_string_pretty(&Self::to_value(nodes))?)
    }

    pub fn parse(input: &str) -> FlatResult<Vec<Node>> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(&value)
    }
}

// ========================================
// Export
// ========================================

fn flatten_body(nodes: &[Node]) -> Vec<Value> {
    let mut items = Vec::with_capacity(nodes.len());
    for node in nodes {
        flatten_node(node, &mut items);
    }
    items
}

fn flatten_node(node: &Node, items: &mut Vec<Value>) {
    match node {
        Node::Statement(statement) => items.push(Value::from(statement.tokens.clone())),
        Node::Block(block) => items.push(Value::Array(vec![
            Value::from(block.selector.clone()),
            Value::Array(flatten_body(&block.body)),
        ])),
        Node::Map(map) => {
            let entries = map
                .entries
                .iter()
                .map(|e| Value::from(vec![e.key.clone(), e.value.clone()]))
                .collect();
            items.push(Value::Array(vec![
                Value::from(map.selector().to_vec()),
                Value::Array(entries),
            ]));
        }
        Node::Conditional(conditional) => {
            items.push(Value::from(Conditional::KEYWORD));
            items.push(Value::from(conditional.condition.clone()));
            for child in &conditional.body {
                flatten_node(child, items);
            }
        }
    }
}

// ========================================
// Import
// ========================================

fn import_body(items: &[Value], path: &str) -> FlatResult<Vec<Node>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("{}[{}]", path, i);
            match item {
                Value::String(s) if s == Conditional::KEYWORD => {
                    Err(FlatError::AmbiguousConditional { path })
                }
                Value::Array(parts) => import_node(parts, &path),
                other => Err(invalid(&path, format!("expected a list, found {}", other))),
            }
        })
        .collect()
}

fn import_node(parts: &[Value], path: &str) -> FlatResult<Node> {
    match parts {
        [Value::Array(selector), Value::Array(body)] => {
            let selector = strings(selector, &format!("{}[0]", path))?;
            let body_path = format!("{}[1]", path);

            match selector.as_slice() {
                [keyword, source, target] if keyword == MapBlock::KEYWORD && source.starts_with('$') && target.starts_with('$') => {
                    let entries = import_map_entries(body, &body_path)?;
                    Ok(Node::Map(MapBlock {
                        source: source.clone(),
                        target: target.clone(),
                        entries,
                    }))
                }
                [] => Err(invalid(path, "empty selector".to_string())),
                _ => Ok(Node::Block(Block {
                    selector,
                    body: import_body(body, &body_path)?,
                })),
            }
        }
        [] => Err(invalid(path, "empty statement".to_string())),
        _ => Ok(Node::Statement(Statement {
            tokens: strings(parts, path)?,
        })),
    }
}

fn import_map_entries(items: &[Value], path: &str) -> FlatResult<Vec<MapEntry>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("{}[{}]", path, i);
            let pair = match item {
                Value::Array(pair) => strings(pair, &path)?,
                other => return Err(invalid(&path, format!("expected a map entry, found {}", other))),
            };
            match <[String; 2]>::try_from(pair) {
                Ok([key, value]) => Ok(MapEntry { key, value }),
                Err(pair) => Err(invalid(&path, format!("map entry needs 2 tokens, found {}", pair.len()))),
            }
        })
        .collect()
}

fn strings(values: &[Value], path: &str) -> FlatResult<Vec<String>> {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.clone()),
            other => Err(invalid(path, format!("expected a string token, found {}", other))),
        })
        .collect()
}

fn invalid(path: &str, message: String) -> FlatError {
    FlatError::InvalidShape {
        path: path.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_export_matches_list_shape() {
        let nodes = crate::loads(
            r#"
            user www-data;
            server {
                listen   80;
                location /status {
                    check_status;
                    types {
                        image/jpeg jpg;
                    }
                }
                location ~* case_insensitive\.php$ {}
            }"#,
        )
        .unwrap();

        assert_eq!(
            FlatAdapter::to_value(&nodes),
            json!([
                ["user", "www-data"],
                [["server"], [
                    ["listen", "80"],
                    [["location", "/status"], [
                        ["check_status"],
                        [["types"], [["image/jpeg", "jpg"]]],
                    ]],
                    [["location", "~*", "case_insensitive\\.php$"], []],
                ]]
            ])
        );
    }

    #[test]
    fn test_conditional_is_spliced() {
        let nodes = crate::loads(
            r#"
            location = /a-location {
              if ( -f "${prefix}/a-location") {
                  return 200;
              }
              return 503 'service unavailable';
            }
        "#,
        )
        .unwrap();

        assert_eq!(
            FlatAdapter::to_value(&nodes),
            json!([
                [["location", "=", "/a-location"], [
                    "if",
                    "-f \"${prefix}/a-location\"",
                    ["return", "200"],
                    ["return", "503 'service unavailable'"],
                ]]
            ])
        );
    }

    #[test]
    fn test_map_export_and_import() {
        let value = json!([[["map", "$http_host", "$name"], [["default", "0"], ["\"a.com\"", "1"]]]]);
        let nodes = FlatAdapter::from_value(&value).unwrap();
        assert_eq!(
            nodes,
            vec![Node::Map(
                MapBlock::new("$http_host", "$name")
                    .with_entry("default", "0")
                    .with_entry("\"a.com\"", "1")
            )]
        );
        assert_eq!(FlatAdapter::to_value(&nodes), value);
    }

    #[test]
    fn test_import_blocks_and_statements() {
        let nodes = FlatAdapter::parse(r#"[["user", "nginx"], [["events"], [["worker_connections", "512"]]]]"#).unwrap();
        assert_eq!(
            nodes,
            vec![
                Statement::new(["user", "nginx"]).into(),
                Block::new(["events"])
                    .push(Statement::new(["worker_connections", "512"]))
                    .into(),
            ]
        );
    }

    #[test]
    fn test_import_rejects_spliced_conditional() {
        let value = json!([[["server"], ["if", "$bad", ["return", "403"]]]]);
        match FlatAdapter::from_value(&value) {
            Err(FlatError::AmbiguousConditional { path }) => assert_eq!(path, "$[0][1][0]"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_import_shape_errors() {
        assert!(matches!(
            FlatAdapter::from_value(&json!({"user": "nginx"})),
            Err(FlatError::InvalidShape { .. })
        ));
        assert!(matches!(
            FlatAdapter::from_value(&json!([[]])),
            Err(FlatError::InvalidShape { .. })
        ));
        assert!(matches!(
            FlatAdapter::from_value(&json!([["listen", 80]])),
            Err(FlatError::InvalidShape { .. })
        ));
        assert!(matches!(
            FlatAdapter::from_value(&json!([[["map", "$a", "$b"], [["only_key"]]]])),
            Err(FlatError::InvalidShape { .. })
        ));
        assert!(matches!(FlatAdapter::parse("not json"), Err(FlatError::Json(_))));
    }
}
