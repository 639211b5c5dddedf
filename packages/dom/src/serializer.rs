use crate::dom::{is_void_element, Dom, NodeId, NodeKind};
use crate::entities::{escape_attribute, escape_text};

/// Serializer turns arena nodes back into markup
///
/// Output is compact (no added whitespace) so that serializing and
/// re-parsing a tree is lossless. Attributes come out in name order.
pub struct Serializer<'a> {
    dom: &'a Dom,
    output: String,
}

impl<'a> Serializer<'a> {
    pub fn new(dom: &'a Dom) -> Self {
        Self {
            dom,
            output: String::new(),
        }
    }

    pub fn node(mut self, id: NodeId) -> Self {
        self.write_node(id);
        self
    }

    pub fn nodes(mut self, ids: &[NodeId]) -> Self {
        for &id in ids {
            self.write_node(id);
        }
        self
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn write_node(&mut self, id: NodeId) {
        let dom = self.dom;
        match dom.kind(id) {
            Some(NodeKind::Text(text)) => escape_text(text, &mut self.output),
            Some(NodeKind::Fragment) => self.write_children(id),
            Some(NodeKind::Element { tag, attributes }) => {
                self.output.push('<');
                self.output.push_str(tag);
                for (name, value) in attributes {
                    self.output.push(' ');
                    self.output.push_str(name);
                    self.output.push_str("=\"");
                    escape_attribute(value, &mut self.output);
                    self.output.push('"');
                }
                self.output.push('>');

                if is_void_element(tag) {
                    return;
                }

                self.write_children(id);
                self.output.push_str("</");
                self.output.push_str(tag);
                self.output.push('>');
            }
            None => {}
        }
    }

    fn write_children(&mut self, id: NodeId) {
        let dom = self.dom;
        for &child in dom.children(id) {
            self.write_node(child);
        }
    }
}

impl Dom {
    /// Markup of a node's children
    pub fn inner_html(&self, id: NodeId) -> String {
        Serializer::new(self).nodes(self.children(id)).finish()
    }

    /// Markup of the node itself
    pub fn outer_html(&self, id: NodeId) -> String {
        Serializer::new(self).node(id).finish()
    }

    /// Markup of a node list
    pub fn serialize_nodes(&self, ids: &[NodeId]) -> String {
        Serializer::new(self).nodes(ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::parse_html;

    #[test]
    fn test_serialize_round_trip() {
        let source = r#"Hello <a href="https://example.org" target="_blank">link</a><br>&amp; more"#;
        let (dom, root) = parse_html(source);

        assert_eq!(dom.inner_html(root), source);
    }

    #[test]
    fn test_attributes_sorted_and_escaped() {
        let (dom, root) = parse_html(r#"<span title='say "hi"' class="x">t</span>"#);

        assert_eq!(
            dom.inner_html(root),
            r#"<span class="x" title="say &quot;hi&quot;">t</span>"#
        );
    }

    #[test]
    fn test_outer_html() {
        let (dom, root) = parse_html("<p>a<em>b</em></p>");
        let p = dom.first_child(root).unwrap();

        assert_eq!(dom.outer_html(p), "<p>a<em>b</em></p>");
    }
}
