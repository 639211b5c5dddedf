//! # Content model
//!
//! The immutable value a field hands to its host. A value is replaced
//! wholesale on every change; nothing here is mutated in place once emitted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Shape of the value a field produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    /// Serialized HTML string
    String,

    /// Tree of [`Node`]s
    #[default]
    Element,
}

impl fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueFormat::String => write!(f, "string"),
            ValueFormat::Element => write!(f, "element"),
        }
    }
}

/// Content model node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Text {
        content: String,
    },

    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Node>,
    },
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text {
            content: content.into(),
        }
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Node::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Node::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        if let Node::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<Node>) -> Self {
        if let Node::Element {
            ref mut children, ..
        } = self
        {
            children.extend(new_children);
        }
        self
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self) -> String {
        match self {
            Node::Text { content } => content.clone(),
            Node::Element { children, .. } => children.iter().map(Node::text_content).collect(),
        }
    }

    /// True if any text in the subtree contains `ch`
    pub fn contains_char(&self, ch: char) -> bool {
        match self {
            Node::Text { content } => content.contains(ch),
            Node::Element { children, .. } => children.iter().any(|c| c.contains_char(ch)),
        }
    }
}

/// Field content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Format `string`
    Html(String),

    /// Format `element`
    Tree(Vec<Node>),
}

impl Value {
    /// Empty value of the given format
    pub fn empty(format: ValueFormat) -> Self {
        match format {
            ValueFormat::String => Value::Html(String::new()),
            ValueFormat::Element => Value::Tree(Vec::new()),
        }
    }

    pub fn format(&self) -> ValueFormat {
        match self {
            Value::Html(_) => ValueFormat::String,
            Value::Tree(_) => ValueFormat::Element,
        }
    }

    /// Top-level node count (string values count as one unless empty)
    pub fn node_count(&self) -> usize {
        match self {
            Value::Html(html) => usize::from(!html.is_empty()),
            Value::Tree(nodes) => nodes.len(),
        }
    }

    pub fn as_tree(&self) -> Option<&[Node]> {
        match self {
            Value::Tree(nodes) => Some(nodes),
            Value::Html(_) => None,
        }
    }

    pub fn as_html(&self) -> Option<&str> {
        match self {
            Value::Html(html) => Some(html),
            Value::Tree(_) => None,
        }
    }

    /// True if `ch` occurs anywhere in the value's text
    pub fn contains_char(&self, ch: char) -> bool {
        match self {
            Value::Html(html) => html.contains(ch),
            Value::Tree(nodes) => nodes.iter().any(|n| n.contains_char(ch)),
        }
    }
}

impl From<Vec<Node>> for Value {
    fn from(nodes: Vec<Node>) -> Self {
        Value::Tree(nodes)
    }
}

impl From<&str> for Value {
    fn from(html: &str) -> Self {
        Value::Html(html.to_string())
    }
}

/// Multiline mode of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Multiline {
    /// Single line: Enter splits the field
    #[default]
    Off,

    /// Lines are wrapped in the given tag (`"p"`, `"li"`, ...)
    Tag(String),
}

impl Multiline {
    pub fn tag(&self) -> Option<&str> {
        match self {
            Multiline::Off => None,
            Multiline::Tag(tag) => Some(tag),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Multiline::Tag(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Value::Tree(vec![Node::element("strong").with_child(Node::text("x"))]);
        let b = Value::Tree(vec![Node::element("strong").with_child(Node::text("x"))]);

        assert_eq!(a, b);
        assert_ne!(a, Value::Tree(vec![Node::text("x")]));
    }

    #[test]
    fn test_node_serde_shape() {
        let node = Node::element("a")
            .with_attr("href", "https://example.org")
            .with_child(Node::text("link"));

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "Element");
        assert_eq!(json["tag"], "a");
        assert_eq!(json["attributes"]["href"], "https://example.org");
        assert_eq!(json["children"][0]["content"], "link");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(Value::empty(ValueFormat::String), Value::Html(String::new()));
        assert_eq!(Value::empty(ValueFormat::Element).node_count(), 0);
    }

    #[test]
    fn test_multiline_deserializes_from_tag() {
        let tag: Multiline = serde_json::from_str("\"p\"").unwrap();
        assert_eq!(tag.tag(), Some("p"));
        assert_eq!(Multiline::default().tag(), None);
    }
}
