//! # Zero-width boundaries
//!
//! Engines park the caret on a zero-width sentinel at the edges of inline
//! annotations like links, so typing can continue inside or outside them.
//! The sentinel is engine bookkeeping: it's kept out of split fragments,
//! ignored when deciding whether the caret sits at a field edge, and
//! cleaned up when the field loses focus.

use richtext_dom::{byte_offset, is_void_element, Dom, DomResult, NodeId, Position};

#[derive(Debug, Clone, Copy)]
pub struct ZeroWidthBoundaryHandler {
    sentinel: char,
}

impl ZeroWidthBoundaryHandler {
    pub fn new(sentinel: char) -> Self {
        Self { sentinel }
    }

    pub fn sentinel(&self) -> char {
        self.sentinel
    }

    /// Node (text, or an element like `<a>`) whose text is exactly the sentinel
    pub fn is_inline_boundary(&self, dom: &Dom, node: NodeId) -> bool {
        let text = dom.text_content(node);
        let mut chars = text.chars();
        chars.next() == Some(self.sentinel) && chars.next().is_none()
    }

    /// Empty text node or bare inline boundary
    pub fn is_empty(&self, dom: &Dom, node: NodeId) -> bool {
        dom.text(node) == Some("") || self.is_inline_boundary(dom, node)
    }

    pub fn filter_empty(&self, dom: &Dom, nodes: &[NodeId]) -> Vec<NodeId> {
        nodes
            .iter()
            .copied()
            .filter(|&node| !self.is_empty(dom, node))
            .collect()
    }

    /// Remove standalone sentinel text nodes under `root`; returns how many
    pub fn strip_from_subtree(&self, dom: &mut Dom, root: NodeId) -> DomResult<usize> {
        let strays: Vec<NodeId> = dom
            .descendants(root)
            .into_iter()
            .filter(|&node| dom.is_text(node) && self.is_inline_boundary(dom, node))
            .collect();

        for &node in &strays {
            dom.discard(node)?;
        }
        Ok(strays.len())
    }

    /// True if moving the caret one step (left when `reverse`) crosses the
    /// sentinel. The engine's own boundary handling should then take the key.
    pub fn crosses_sentinel(&self, dom: &Dom, focus: Position, reverse: bool) -> bool {
        let Some(text) = dom.text(focus.node) else {
            return false;
        };
        let chars: Vec<char> = text.chars().collect();

        let mut offset = if reverse {
            focus.offset.checked_sub(1)
        } else {
            Some(focus.offset)
        };

        // While typing in a fresh inline boundary the sentinel stays first
        // instead of following the caret. A node that is only the sentinel
        // is the caret sitting just outside the boundary and is exempt.
        if !reverse
            && focus.offset == chars.len()
            && chars.len() > 1
            && chars[0] == self.sentinel
        {
            offset = Some(0);
        }

        offset.and_then(|o| chars.get(o)) == Some(&self.sentinel)
    }

    /// True if nothing but sentinels lies between the caret and the start
    /// (`reverse`) or end of `root`. Content elements like `<img>` or
    /// `<br>` on that side keep the caret off the edge.
    pub fn is_horizontal_edge(&self, dom: &Dom, root: NodeId, caret: Position, reverse: bool) -> bool {
        if let Some(text) = dom.text(caret.node) {
            let split = byte_offset(text, caret.offset);
            let side = if reverse { &text[..split] } else { &text[split..] };
            if !side.chars().all(|c| c == self.sentinel) {
                return false;
            }
        } else {
            let children = dom.children(caret.node);
            let offset = caret.offset.min(children.len());
            let side = if reverse { &children[..offset] } else { &children[offset..] };
            if !side.iter().all(|&child| self.is_transparent(dom, child)) {
                return false;
            }
        }

        let mut current = caret.node;
        while current != root {
            let Some(parent) = dom.parent(current) else {
                return false;
            };
            let siblings = dom.children(parent);
            let index = dom.node_index(current).unwrap_or(0);
            let side = if reverse { &siblings[..index] } else { &siblings[index + 1..] };
            if !side.iter().all(|&sibling| self.is_transparent(dom, sibling)) {
                return false;
            }
            current = parent;
        }
        true
    }

    /// Sentinel-only text, or a non-void element holding nothing else
    fn is_transparent(&self, dom: &Dom, node: NodeId) -> bool {
        if let Some(text) = dom.text(node) {
            return text.chars().all(|c| c == self.sentinel);
        }
        match dom.tag_name(node) {
            Some(tag) if !is_void_element(tag) => dom
                .children(node)
                .iter()
                .all(|&child| self.is_transparent(dom, child)),
            _ => false,
        }
    }
}
