//! # Content normalization
//!
//! Pasted markup goes through a [`ContentNormalizer`] before it reaches the
//! field. The normalizer decides whether the paste stays inline (markup the
//! engine inserts itself) or becomes a list of blocks handed to the host.
//!
//! [`BasicNormalizer`] is a small reference implementation: it strips
//! scripts and event handlers, recognizes the common block elements, and
//! turns blank-line separated plain text into paragraphs.

use richtext_dom::entities::escape_text;
use richtext_dom::{parse_html, Dom, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How a paste should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PasteMode {
    /// Always inline markup
    Inline,
    /// Always blocks
    Blocks,
    /// Inline when the paste is a single run of text, blocks otherwise
    Auto,
}

/// Input for one normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeRequest<'a> {
    pub html: &'a str,
    pub plain_text: &'a str,
    pub mode: PasteMode,
    /// Tag of the receiving field
    pub tag_name: &'a str,
    pub can_use_unfiltered_markup: bool,
}

/// A block handed to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block type, e.g. `core/paragraph`
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Rich-text content of the block, if it has any
    pub fn content(&self) -> Option<&str> {
        self.attribute("content")
    }
}

/// Normalization outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Let the engine insert this markup
    Inline(String),
    Blocks(Vec<Block>),
}

pub trait ContentNormalizer {
    fn normalize(&self, request: &NormalizeRequest<'_>) -> Normalized;
}

const STRIPPED_ELEMENTS: &[&str] = &["script", "style", "meta", "link", "title", "head"];
const BLOCK_WRAPPERS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "ul", "ol", "li",
    "figure",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct BasicNormalizer;

impl BasicNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn sanitize(&self, dom: &mut Dom, root: NodeId, unfiltered: bool) {
        if unfiltered {
            return;
        }
        for node in dom.descendants(root) {
            if !dom.contains_node(node) {
                continue;
            }
            if dom
                .tag_name(node)
                .is_some_and(|tag| STRIPPED_ELEMENTS.contains(&tag))
            {
                if let Err(error) = dom.discard(node) {
                    warn!(error = %error, "failed to drop stripped element");
                }
                continue;
            }

            let handlers: Vec<String> = dom
                .attributes(node)
                .map(|attrs| {
                    attrs
                        .keys()
                        .filter(|name| name.starts_with("on"))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            for name in handlers {
                if let Err(error) = dom.remove_attribute(node, &name) {
                    warn!(error = %error, attribute = %name, "failed to drop event handler");
                }
            }
        }
    }

    /// Top-level nodes with `div` wrappers flattened
    fn flatten(&self, dom: &Dom, root: NodeId, output: &mut Vec<NodeId>) {
        for &child in dom.children(root) {
            if dom.tag_name(child) == Some("div") {
                self.flatten(dom, child, output);
            } else {
                output.push(child);
            }
        }
    }

    fn to_block(&self, dom: &Dom, node: NodeId) -> Option<Block> {
        let tag = dom.tag_name(node)?;
        let block = match tag {
            "p" => Block::new("core/paragraph").with_attribute("content", dom.inner_html(node)),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Block::new("core/heading")
                .with_attribute("content", dom.inner_html(node))
                .with_attribute("level", &tag[1..]),
            "ul" | "ol" => Block::new("core/list")
                .with_attribute("values", dom.inner_html(node))
                .with_attribute("ordered", (tag == "ol").to_string()),
            "blockquote" => Block::new("core/quote").with_attribute("value", dom.inner_html(node)),
            "pre" => Block::new("core/code").with_attribute("content", dom.text_content(node)),
            "img" => {
                let mut block =
                    Block::new("core/image").with_attribute("url", dom.attribute(node, "src").unwrap_or(""));
                if let Some(alt) = dom.attribute(node, "alt") {
                    block = block.with_attribute("alt", alt);
                }
                block
            }
            "figure" => {
                let image = dom
                    .descendants(node)
                    .into_iter()
                    .find(|&n| dom.tag_name(n) == Some("img"))?;
                return self.to_block(dom, image);
            }
            _ => return None,
        };
        Some(block)
    }

    /// Group top-level nodes into blocks; inline runs become paragraphs
    fn blocks(&self, dom: &Dom, nodes: &[NodeId]) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut run: Vec<NodeId> = Vec::new();

        let flush = |run: &mut Vec<NodeId>, blocks: &mut Vec<Block>| {
            let content = dom.serialize_nodes(run);
            if !content.trim().is_empty() {
                blocks.push(Block::new("core/paragraph").with_attribute("content", content.trim()));
            }
            run.clear();
        };

        for &node in nodes {
            match self.to_block(dom, node) {
                Some(block) => {
                    flush(&mut run, &mut blocks);
                    blocks.push(block);
                }
                None if dom.tag_name(node) == Some("br") && !run.is_empty() => {
                    flush(&mut run, &mut blocks)
                }
                None => run.push(node),
            }
        }
        flush(&mut run, &mut blocks);
        blocks
    }

    /// Inline markup: block wrappers dropped, blocks joined with `<br>`
    fn inline(&self, dom: &Dom, nodes: &[NodeId]) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut current = String::new();

        for &node in nodes {
            match dom.kind(node) {
                Some(NodeKind::Element { tag, .. }) if BLOCK_WRAPPERS.contains(&tag.as_str()) => {
                    if !current.trim().is_empty() {
                        parts.push(std::mem::take(&mut current));
                    }
                    let children: Vec<NodeId> = if tag == "ul" || tag == "ol" {
                        dom.children(node).to_vec()
                    } else {
                        vec![node]
                    };
                    for child in children {
                        let inner = self.inline(dom, dom.children(child));
                        if !inner.trim().is_empty() {
                            parts.push(inner);
                        }
                    }
                }
                _ => current.push_str(&dom.outer_html(node)),
            }
        }
        if !current.trim().is_empty() {
            parts.push(current);
        }

        parts.join("<br>")
    }
}

/// Plain text as markup: blank lines separate paragraphs, single newlines
/// become line breaks
pub fn plain_text_to_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| {
            let lines: Vec<String> = paragraph
                .lines()
                .map(|line| {
                    let mut escaped = String::new();
                    escape_text(line, &mut escaped);
                    escaped
                })
                .collect();
            format!("<p>{}</p>", lines.join("<br>"))
        })
        .collect()
}

impl ContentNormalizer for BasicNormalizer {
    fn normalize(&self, request: &NormalizeRequest<'_>) -> Normalized {
        let source = if request.html.trim().is_empty() {
            plain_text_to_html(request.plain_text)
        } else {
            request.html.to_string()
        };

        let (mut dom, root) = parse_html(&source);
        self.sanitize(&mut dom, root, request.can_use_unfiltered_markup);

        let mut nodes = Vec::new();
        self.flatten(&dom, root, &mut nodes);

        if request.mode == PasteMode::Inline {
            return Normalized::Inline(self.inline(&dom, &nodes));
        }

        let has_blocks = nodes.iter().any(|&node| self.to_block(&dom, node).is_some());
        let blocks = self.blocks(&dom, &nodes);
        debug!(mode = ?request.mode, blocks = blocks.len(), tag = request.tag_name, "normalized paste");

        if request.mode == PasteMode::Auto {
            let single_paragraph = blocks.len() == 1 && blocks[0].name == "core/paragraph";
            if !has_blocks || single_paragraph {
                return Normalized::Inline(self.inline(&dom, &nodes));
            }
        }

        Normalized::Blocks(blocks)
    }
}
