use crate::dom::{is_void_element, Dom, NodeId};
use crate::entities;
use crate::error::DomResult;
use crate::tokenizer::{tokenize, tokenize_attributes, AttrToken, Token};
use std::collections::BTreeMap;
use tracing::trace;

/// Start tags that implicitly close an open `<p>`
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p",
    "pre", "section", "table", "ul",
];

/// Lenient HTML fragment parser
///
/// Builds nodes into an existing [`Dom`] under a given parent. Never fails on
/// malformed markup: stray end tags are ignored, unclosed elements are closed
/// at the end of input and anything that isn't a tag is text.
pub struct Parser<'a> {
    dom: &'a mut Dom,
    stack: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    pub fn new(dom: &'a mut Dom, parent: NodeId) -> Self {
        Self {
            dom,
            stack: vec![parent],
        }
    }

    /// Parse `source` and append the result to the parent
    pub fn parse(mut self, source: &str) -> DomResult<()> {
        for (token, span) in tokenize(source) {
            trace!(token = %token, ?span, "html token");
            match token {
                Token::StartTag(raw) => self.start_tag(raw)?,
                Token::EndTag(raw) => self.end_tag(raw),
                Token::Text(text) => self.text(&entities::decode(text))?,
                Token::LAngle => self.text("<")?,
                Token::Comment | Token::Declaration => {}
            }
        }
        Ok(())
    }

    fn current(&self) -> NodeId {
        // The base parent is never popped
        self.stack[self.stack.len() - 1]
    }

    fn open_index(&self, tag: &str) -> Option<usize> {
        (1..self.stack.len())
            .rev()
            .find(|&i| self.dom.tag_name(self.stack[i]) == Some(tag))
    }

    fn close_through(&mut self, index: usize) {
        self.stack.truncate(index.max(1));
    }

    fn start_tag(&mut self, raw: &str) -> DomResult<()> {
        let (name, attributes, self_closing) = parse_start_tag(raw);

        if CLOSES_PARAGRAPH.contains(&name.as_str()) {
            if let Some(index) = self.open_index("p") {
                self.close_through(index);
            }
        }

        if name == "li" {
            let list = self.open_index("ul").max(self.open_index("ol"));
            if let Some(index) = self.open_index("li") {
                if list.map_or(true, |list| index > list) {
                    self.close_through(index);
                }
            }
        }

        let element = self.dom.create_element_with(&name, attributes);
        self.dom.append_child(self.current(), element)?;

        if !self_closing && !is_void_element(&name) {
            self.stack.push(element);
        }
        Ok(())
    }

    fn end_tag(&mut self, raw: &str) {
        let name = raw
            .trim_start_matches("</")
            .trim_end_matches('>')
            .trim()
            .to_ascii_lowercase();

        if let Some(index) = self.open_index(&name) {
            self.close_through(index);
        }
    }

    fn text(&mut self, content: &str) -> DomResult<()> {
        if content.is_empty() {
            return Ok(());
        }

        let parent = self.current();
        if let Some(last) = self.dom.last_child(parent) {
            if let Some(existing) = self.dom.text(last) {
                let merged = format!("{}{}", existing, content);
                return self.dom.set_text(last, merged);
            }
        }

        let node = self.dom.create_text(content);
        self.dom.append_child(parent, node)
    }
}

/// Split a raw start tag (`<a href="x">`) into name, attributes and the
/// self-closing flag
fn parse_start_tag(raw: &str) -> (String, BTreeMap<String, String>, bool) {
    let inner = raw.trim_start_matches('<').trim_end_matches('>');
    let self_closing = inner.ends_with('/');
    let inner = inner.trim_end_matches('/');

    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();

    let mut attributes = BTreeMap::new();
    let tokens = tokenize_attributes(&inner[name_end..]);
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        let AttrToken::Name(attr) = token else {
            continue;
        };

        let value = if iter.peek() == Some(&AttrToken::Equals) {
            iter.next();
            match iter.next() {
                Some(AttrToken::DoubleQuoted(v))
                | Some(AttrToken::SingleQuoted(v))
                | Some(AttrToken::Name(v)) => entities::decode(v),
                _ => String::new(),
            }
        } else {
            String::new()
        };

        // First occurrence wins, as in browsers
        attributes
            .entry(attr.to_ascii_lowercase())
            .or_insert(value);
    }

    (name, attributes, self_closing)
}

/// Parse an HTML fragment into a fresh arena
///
/// Returns the arena and the fragment node holding the parsed nodes.
pub fn parse_html(source: &str) -> (Dom, NodeId) {
    let mut dom = Dom::new();
    let fragment = dom.parse_fragment(source);
    (dom, fragment)
}

impl Dom {
    /// Parse markup into a new detached fragment
    pub fn parse_fragment(&mut self, source: &str) -> NodeId {
        let fragment = self.create_fragment();
        // A fresh fragment can't fail the structural checks
        let _ = Parser::new(self, fragment).parse(source);
        fragment
    }

    /// Replace the children of `id` with parsed markup
    pub fn set_inner_html(&mut self, id: NodeId, source: &str) -> DomResult<()> {
        let fragment = self.parse_fragment(source);
        let children = self.children(fragment).to_vec();
        self.replace_children(id, children)?;
        self.discard(fragment)
    }
}
