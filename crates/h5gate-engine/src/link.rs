//! Value-or-link arguments
//!
//! Dataset values and group link arguments accept either concrete data or a
//! reference to another node. String arguments are parsed once, at
//! conversion time, against the link grammar:
//!
//! * `link:<path>` links to an existing node in this session
//! * `extlink:<file>,<path>` links to `<path>` inside another file
//!
//! Any other string is literal text. Use [`DataArg::literal`] to store a
//! string that happens to start with one of the prefixes.

use h5gate_ir::{NodeId, Value};

const INTERNAL_PREFIX: &str = "link:";
const EXTERNAL_PREFIX: &str = "extlink:";

/// Concrete data or a link to another node
#[derive(Debug, Clone, PartialEq)]
pub enum DataArg {
    /// Concrete value
    Value(Value),
    /// Link to a node created earlier in the session
    Node(NodeId),
    /// Link to a node registered at this path
    InternalLink(String),
    /// Link into another file
    ExternalLink { file: String, path: String },
}

impl DataArg {
    /// Store a string verbatim, never interpreting it as a link.
    pub fn literal(text: impl Into<String>) -> Self {
        DataArg::Value(Value::Text(text.into()))
    }

    /// Link to the node registered at `path`.
    pub fn link(path: impl Into<String>) -> Self {
        DataArg::InternalLink(path.into())
    }

    /// Link to `path` inside `file`.
    pub fn external(file: impl Into<String>, path: impl Into<String>) -> Self {
        DataArg::ExternalLink {
            file: file.into(),
            path: path.into(),
        }
    }

    /// Parse the link grammar; `None` when `text` is not a link string.
    pub fn parse_link(text: &str) -> Option<Self> {
        if let Some(path) = text.strip_prefix(INTERNAL_PREFIX) {
            return Some(DataArg::InternalLink(path.to_string()));
        }
        let rest = text.strip_prefix(EXTERNAL_PREFIX)?;
        let (file, path) = rest.split_once(',')?;
        Some(DataArg::ExternalLink {
            file: file.to_string(),
            path: path.to_string(),
        })
    }

    pub fn is_link(&self) -> bool {
        !matches!(self, DataArg::Value(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            DataArg::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Placeholder text written for links in the string link style
pub fn link_placeholder(target: &str) -> String {
    format!("{INTERNAL_PREFIX}{target}")
}

impl From<&str> for DataArg {
    fn from(text: &str) -> Self {
        DataArg::parse_link(text).unwrap_or_else(|| DataArg::literal(text))
    }
}

impl From<String> for DataArg {
    fn from(text: String) -> Self {
        match DataArg::parse_link(&text) {
            Some(link) => link,
            None => DataArg::Value(Value::Text(text)),
        }
    }
}

impl From<Value> for DataArg {
    fn from(value: Value) -> Self {
        match value {
            Value::Text(text) => DataArg::from(text),
            other => DataArg::Value(other),
        }
    }
}

impl From<NodeId> for DataArg {
    fn from(node: NodeId) -> Self {
        DataArg::Node(node)
    }
}

impl From<bool> for DataArg {
    fn from(v: bool) -> Self {
        DataArg::Value(Value::from(v))
    }
}

impl From<i64> for DataArg {
    fn from(v: i64) -> Self {
        DataArg::Value(Value::from(v))
    }
}

impl From<i32> for DataArg {
    fn from(v: i32) -> Self {
        DataArg::Value(Value::from(v))
    }
}

impl From<f64> for DataArg {
    fn from(v: f64) -> Self {
        DataArg::Value(Value::from(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for DataArg {
    fn from(items: Vec<T>) -> Self {
        DataArg::Value(Value::Array(items.into_iter().map(Into::into).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_grammar() {
        assert_eq!(
            DataArg::from("link:/acquisition/ts"),
            DataArg::InternalLink("/acquisition/ts".to_string())
        );
        assert_eq!(
            DataArg::from("extlink:other.h5,/data/raw"),
            DataArg::external("other.h5", "/data/raw")
        );
    }

    #[test]
    fn test_plain_strings_are_literal() {
        assert_eq!(DataArg::from("hello"), DataArg::literal("hello"));
        // no comma: not an external link
        assert_eq!(
            DataArg::from("extlink:other.h5"),
            DataArg::literal("extlink:other.h5")
        );
        assert!(!DataArg::literal("link:/x").is_link());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(DataArg::from(5), DataArg::Value(Value::Int(5)));
        assert_eq!(
            DataArg::from(vec![1.0, 2.0]),
            DataArg::Value(Value::Array(vec![Value::Float(1.0), Value::Float(2.0)]))
        );
        assert_eq!(
            DataArg::from(Value::Text("link:/a".to_string())),
            DataArg::link("/a")
        );
        assert!(DataArg::from(NodeId::new(3)).is_link());
        assert_eq!(link_placeholder("/a/b"), "link:/a/b");
    }
}
