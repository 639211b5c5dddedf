//! # Format conversion
//!
//! Converts between DOM node lists and field [`Value`]s.
//!
//! Tree output is canonical: engine bookkeeping attributes are stripped,
//! synthetic nodes are dropped or unwrapped, sentinel characters are removed,
//! and adjacent text is merged. That makes
//! `to_value(parse(from_value(v))) == v` hold for every value this module
//! produces.

use crate::config::SurfaceConfig;
use crate::value::{Node, Value, ValueFormat};
use richtext_dom::entities::{escape_attribute, escape_text};
use richtext_dom::{is_void_element, Dom, NodeId, NodeKind};

/// DOM ↔ value converter
#[derive(Debug, Clone)]
pub struct FormatConverter {
    sentinel: char,
    bookkeeping_prefix: String,
    synthetic_attribute: String,
}

impl FormatConverter {
    pub fn new(config: &SurfaceConfig) -> Self {
        Self {
            sentinel: config.sentinel,
            bookkeeping_prefix: config.bookkeeping_prefix.clone(),
            synthetic_attribute: config.synthetic_attribute.clone(),
        }
    }

    /// Convert a DOM node list to a value of the requested format
    ///
    /// Conversion only reads the arena, so sibling nodes outside `nodes`
    /// can't leak into the result.
    pub fn to_value(&self, dom: &Dom, nodes: &[NodeId], format: ValueFormat) -> Value {
        let tree = self.to_tree(dom, nodes);
        match format {
            ValueFormat::Element => Value::Tree(tree),
            ValueFormat::String => Value::Html(render_nodes(&tree)),
        }
    }

    /// Convert a DOM node list to model nodes
    pub fn to_tree(&self, dom: &Dom, nodes: &[NodeId]) -> Vec<Node> {
        let mut output = Vec::new();
        for &node in nodes {
            self.convert(dom, node, &mut output);
        }
        output
    }

    fn convert(&self, dom: &Dom, id: NodeId, output: &mut Vec<Node>) {
        match dom.kind(id) {
            Some(NodeKind::Text(text)) => self.push_text(output, text),
            Some(NodeKind::Fragment) => {
                for &child in dom.children(id) {
                    self.convert(dom, child, output);
                }
            }
            Some(NodeKind::Element { tag, attributes }) => {
                match attributes.get(&self.synthetic_attribute).map(String::as_str) {
                    // Fully synthetic: dropped with its subtree
                    Some("all") => return,
                    // Passthrough synthetic: replaced by its children
                    Some(_) => {
                        for &child in dom.children(id) {
                            self.convert(dom, child, output);
                        }
                        return;
                    }
                    None => {}
                }

                let attributes = attributes
                    .iter()
                    .filter(|(name, _)| !name.starts_with(&self.bookkeeping_prefix))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();

                let mut children = Vec::new();
                for &child in dom.children(id) {
                    self.convert(dom, child, &mut children);
                }

                output.push(Node::Element {
                    tag: tag.clone(),
                    attributes,
                    children,
                });
            }
            None => {}
        }
    }

    fn push_text(&self, output: &mut Vec<Node>, text: &str) {
        let cleaned: String = text.chars().filter(|&c| c != self.sentinel).collect();
        if cleaned.is_empty() {
            return;
        }

        if let Some(Node::Text { content }) = output.last_mut() {
            content.push_str(&cleaned);
        } else {
            output.push(Node::text(cleaned));
        }
    }

    /// Serialize a value for the engine
    pub fn from_value(&self, value: Option<&Value>, format: ValueFormat) -> String {
        match (value, format) {
            (None, _) => String::new(),
            (Some(Value::Html(html)), _) => html.clone(),
            (Some(Value::Tree(nodes)), _) => render_nodes(nodes),
        }
    }

    /// Parse markup straight into a value
    pub fn parse_value(&self, html: &str, format: ValueFormat) -> Value {
        let (dom, fragment) = richtext_dom::parse_html(html);
        self.to_value(&dom, &[fragment], format)
    }
}

/// Render model nodes as compact HTML
pub fn render_nodes(nodes: &[Node]) -> String {
    let mut output = String::new();
    for node in nodes {
        render_node(node, &mut output);
    }
    output
}

fn render_node(node: &Node, output: &mut String) {
    match node {
        Node::Text { content } => escape_text(content, output),
        Node::Element {
            tag,
            attributes,
            children,
        } => {
            output.push('<');
            output.push_str(tag);
            for (name, value) in attributes {
                output.push(' ');
                output.push_str(name);
                output.push_str("=\"");
                escape_attribute(value, output);
                output.push('"');
            }
            output.push('>');

            if is_void_element(tag) {
                return;
            }

            for child in children {
                render_node(child, output);
            }
            output.push_str("</");
            output.push_str(tag);
            output.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use richtext_dom::parse_html;

    fn converter() -> FormatConverter {
        FormatConverter::new(&SurfaceConfig::default())
    }

    #[test]
    fn test_element_format_builds_tree() {
        let (dom, root) = parse_html(r#"Hi <a href="/x">there</a>"#);
        let value = converter().to_value(&dom, &[root], ValueFormat::Element);

        assert_eq!(
            value,
            Value::Tree(vec![
                Node::text("Hi "),
                Node::element("a")
                    .with_attr("href", "/x")
                    .with_child(Node::text("there")),
            ])
        );
    }

    #[test]
    fn test_string_format_serializes() {
        let (dom, root) = parse_html("<em>a</em> &amp; b");
        let value = converter().to_value(&dom, dom.children(root), ValueFormat::String);

        assert_eq!(value, Value::Html("<em>a</em> &amp; b".to_string()));
    }

    #[test]
    fn test_bookkeeping_attributes_stripped() {
        let (dom, root) = parse_html(r#"<a href="/x" data-mce-href="/x" data-mce-selected="1">x</a>"#);
        let value = converter().to_value(&dom, &[root], ValueFormat::Element);

        assert_eq!(
            value,
            Value::Tree(vec![Node::element("a")
                .with_attr("href", "/x")
                .with_child(Node::text("x"))])
        );
    }

    #[test]
    fn test_synthetic_nodes() {
        let (dom, root) = parse_html(
            r#"a<br data-mce-bogus="all"><span data-mce-bogus="1">b<em>c</em></span>"#,
        );
        let value = converter().to_value(&dom, &[root], ValueFormat::Element);

        // Dropped <br>, unwrapped <span>, "a" and "b" merged
        assert_eq!(
            value,
            Value::Tree(vec![
                Node::text("ab"),
                Node::element("em").with_child(Node::text("c")),
            ])
        );
    }

    #[test]
    fn test_sentinel_never_reaches_value() {
        let (dom, root) = parse_html("<a href=\"/x\">link</a>\u{feff}");
        let value = converter().to_value(&dom, &[root], ValueFormat::Element);

        assert!(!value.contains_char('\u{feff}'));
        assert_eq!(value.node_count(), 1);
    }

    #[test]
    fn test_from_value() {
        let c = converter();

        assert_eq!(c.from_value(None, ValueFormat::String), "");
        assert_eq!(
            c.from_value(Some(&Value::Html("<b>x</b>".into())), ValueFormat::String),
            "<b>x</b>"
        );

        let tree = Value::Tree(vec![
            Node::text("1 < 2"),
            Node::element("br"),
            Node::element("img").with_attr("src", "a\"b.png"),
        ]);
        assert_eq!(
            c.from_value(Some(&tree), ValueFormat::Element),
            r#"1 &lt; 2<br><img src="a&quot;b.png">"#
        );
    }

    #[test]
    fn test_round_trip() {
        let c = converter();
        let value = Value::Tree(vec![
            Node::text("Plain \u{a0}text & "),
            Node::element("strong").with_children(vec![
                Node::text("bold "),
                Node::element("em").with_child(Node::text("both")),
            ]),
            Node::element("br"),
            Node::element("a")
                .with_attr("href", "https://example.org/?a=1&b=2")
                .with_attr("target", "_blank")
                .with_child(Node::text("link")),
        ]);

        let html = c.from_value(Some(&value), ValueFormat::Element);
        assert_eq!(c.parse_value(&html, ValueFormat::Element), value);
    }
}
