//! # Arena DOM
//!
//! A small mutable node tree standing in for a `contenteditable` subtree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Detached nodes
//! stay valid until [`Dom::discard`] frees them, which mirrors how DOM nodes
//! outlive their removal from the document as long as someone holds them.
//!
//! ## Positions
//!
//! A [`Position`] is a container node plus an offset: a character offset for
//! text nodes, a child index for elements and fragments. This is the same
//! boundary-point model DOM ranges use, so caret handling code reads the same
//! way it would against a browser selection.

use crate::error::{DomError, DomResult};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Handle to a node in a [`Dom`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Detached container for a list of nodes (parse results, clones)
    Fragment,

    /// HTML element; `tag` is always lowercase
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },

    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Boundary point inside the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Ordered pair of positions (`start` never after `end`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Elements that never have children
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements that make a node non-empty even without text
const CONTENT_ELEMENTS: &[&str] = &["img", "hr", "input", "video", "audio", "iframe", "embed"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Node arena
#[derive(Debug, Clone, Default)]
pub struct Dom {
    nodes: Vec<Option<NodeData>>,
    free: Vec<usize>,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };

        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(data);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(data));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn data(&self, id: NodeId) -> DomResult<&NodeData> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(DomError::NodeNotFound(id))
    }

    fn data_mut(&mut self, id: NodeId) -> DomResult<&mut NodeData> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(DomError::NodeNotFound(id))
    }

    /// Number of live nodes (attached or detached)
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.data(id).is_ok()
    }

    // ---- creation -------------------------------------------------------

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_with(tag, BTreeMap::new())
    }

    pub fn create_element_with(
        &mut self,
        tag: &str,
        attributes: BTreeMap<String, String>,
    ) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes,
        })
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(content.into()))
    }

    // ---- inspection -----------------------------------------------------

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).ok().map(|d| &d.kind)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element { .. }))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, content: impl Into<String>) -> DomResult<()> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Text(text) => {
                *text = content.into();
                Ok(())
            }
            _ => Err(DomError::NotText(id)),
        }
    }

    pub fn attributes(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => Some(attributes),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .and_then(|attrs| attrs.get(name))
            .map(String::as_str)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> DomResult<()> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                attributes.insert(name.to_ascii_lowercase(), value.into());
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes.remove(name)),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).ok().and_then(|d| d.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Index of `id` among its parent's children
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Ancestors from the parent upwards (self excluded)
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            result.push(node);
            current = self.parent(node);
        }
        result
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    /// Descendants in document order (self excluded)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        result
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: NodeId, output: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => output.push_str(text),
            Some(_) => {
                for &child in self.children(id) {
                    self.collect_text(child, output);
                }
            }
            None => {}
        }
    }

    /// Length of the node in boundary-point units
    pub fn node_length(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.chars().count(),
            _ => self.children(id).len(),
        }
    }

    /// True when the subtree has no visible text and no content elements
    /// (line breaks alone don't count as content)
    pub fn is_empty(&self, id: NodeId) -> bool {
        if self
            .tag_name(id)
            .is_some_and(|tag| CONTENT_ELEMENTS.contains(&tag))
        {
            return false;
        }

        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.trim().is_empty(),
            Some(_) => self.children(id).iter().all(|&child| self.is_empty(child)),
            None => true,
        }
    }

    // ---- mutation -------------------------------------------------------

    /// Remove `id` from its parent; the node stays alive
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let parent = self.data(id)?.parent;
        if let Some(parent) = parent {
            self.data_mut(parent)?.children.retain(|&c| c != id);
        }
        self.data_mut(id)?.parent = None;
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` in `parent`, detaching it first
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> DomResult<()> {
        if matches!(self.data(parent)?.kind, NodeKind::Text(_)) {
            return Err(DomError::NotAnElement(parent));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(DomError::CycleDetected);
        }

        // Moving within the same parent shifts indices after the old slot
        let mut index = index;
        if self.parent(child) == Some(parent) {
            if let Some(old) = self.node_index(child) {
                if old < index {
                    index -= 1;
                }
            }
        }

        self.detach(child)?;
        let children = &mut self.data_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach and free a subtree
    pub fn discard(&mut self, id: NodeId) -> DomResult<()> {
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(data) = self.nodes.get_mut(node.0).and_then(Option::take) {
                stack.extend(data.children);
                self.free.push(node.0);
            }
        }
        Ok(())
    }

    /// Replace all children of `parent`, freeing the old ones
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) -> DomResult<()> {
        let old: Vec<NodeId> = self.children(parent).to_vec();
        for child in old {
            if !children.contains(&child) {
                self.discard(child)?;
            }
        }
        for child in children {
            self.append_child(parent, child)?;
        }
        Ok(())
    }

    /// Move a node's children into its parent at its position and free it
    pub fn unwrap(&mut self, id: NodeId) -> DomResult<()> {
        let parent = self.parent(id).ok_or(DomError::NodeNotFound(id))?;
        let index = self.node_index(id).unwrap_or(0);
        let children: Vec<NodeId> = self.children(id).to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + offset, child)?;
        }
        self.discard(id)
    }

    /// Split a text node at a character offset; returns the new node holding
    /// the tail, inserted right after the original
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> DomResult<NodeId> {
        let text = self.text(id).ok_or(DomError::NotText(id))?.to_string();
        let len = text.chars().count();
        if offset > len {
            return Err(DomError::invalid_offset(id, offset, len));
        }

        let split = byte_offset(&text, offset);
        let (head, tail) = text.split_at(split);
        let tail = tail.to_string();
        self.set_text(id, head)?;

        let tail_node = self.create_text(tail);
        if let Some(parent) = self.parent(id) {
            let index = self.node_index(id).unwrap_or(0);
            self.insert_child(parent, index + 1, tail_node)?;
        }
        Ok(tail_node)
    }

    /// Shallow copy (no children, detached)
    pub fn clone_shallow(&mut self, id: NodeId) -> DomResult<NodeId> {
        let kind = self.data(id)?.kind.clone();
        Ok(self.alloc(kind))
    }

    /// Deep copy of a subtree (detached)
    pub fn deep_clone(&mut self, id: NodeId) -> DomResult<NodeId> {
        let copy = self.clone_shallow(id)?;
        let children: Vec<NodeId> = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }

    // ---- positions and ranges -------------------------------------------

    /// Index path from `root` down to the position, ending with its offset
    pub fn path_from(&self, root: NodeId, position: Position) -> Option<Vec<usize>> {
        let mut path = vec![position.offset];
        let mut current = position.node;
        while current != root {
            path.push(self.node_index(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    /// Document-order comparison of two positions under `root`
    pub fn compare_positions(&self, root: NodeId, a: Position, b: Position) -> Option<Ordering> {
        let pa = self.path_from(root, a)?;
        let pb = self.path_from(root, b)?;
        Some(pa.cmp(&pb))
    }

    /// Normalize an anchor/focus pair into an ordered range
    pub fn ordered_range(&self, root: NodeId, anchor: Position, focus: Position) -> Range {
        match self.compare_positions(root, anchor, focus) {
            Some(Ordering::Greater) => Range::new(focus, anchor),
            _ => Range::new(anchor, focus),
        }
    }

    /// Closest element (or the node itself) containing the position
    pub fn containing_element(&self, position: Position) -> NodeId {
        if self.is_text(position.node) {
            self.parent(position.node).unwrap_or(position.node)
        } else {
            position.node
        }
    }

    /// Deepest common container of two nodes that can hold children
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut chain_a = vec![a];
        chain_a.extend(self.ancestors(a));

        let mut chain_b = vec![b];
        chain_b.extend(self.ancestors(b));

        chain_b
            .into_iter()
            .find(|node| chain_a.contains(node) && !self.is_text(*node))
    }

    /// Cloned content of `root` before `position`
    pub fn clone_before(&mut self, root: NodeId, position: Position) -> DomResult<Vec<NodeId>> {
        let path = self
            .path_from(root, position)
            .ok_or(DomError::NodeNotFound(position.node))?;
        self.clone_between(root, None, Some(&path))
    }

    /// Cloned content of `root` after `position`
    pub fn clone_after(&mut self, root: NodeId, position: Position) -> DomResult<Vec<NodeId>> {
        let path = self
            .path_from(root, position)
            .ok_or(DomError::NodeNotFound(position.node))?;
        self.clone_between(root, Some(&path), None)
    }

    /// Cloned content of a range under `root`
    pub fn clone_range(&mut self, root: NodeId, range: Range) -> DomResult<Vec<NodeId>> {
        let start = self
            .path_from(root, range.start)
            .ok_or(DomError::NodeNotFound(range.start.node))?;
        let end = self
            .path_from(root, range.end)
            .ok_or(DomError::NodeNotFound(range.end.node))?;
        self.clone_between(root, Some(&start), Some(&end))
    }

    /// Clone the part of `node`'s content between two relative paths, the
    /// way `Range.cloneContents` does: partially covered elements are copied
    /// shallowly with only their covered descendants. Empty text slices are
    /// not produced.
    fn clone_between(
        &mut self,
        node: NodeId,
        start: Option<&[usize]>,
        end: Option<&[usize]>,
    ) -> DomResult<Vec<NodeId>> {
        if let Some(text) = self.text(node) {
            let len = text.chars().count();
            let from = start.and_then(|p| p.first().copied()).unwrap_or(0).min(len);
            let to = end.and_then(|p| p.first().copied()).unwrap_or(len).min(len);
            if from >= to {
                return Ok(Vec::new());
            }
            let slice = char_slice(text, from, to).to_string();
            return Ok(vec![self.create_text(slice)]);
        }

        let children: Vec<NodeId> = self.children(node).to_vec();
        let len = children.len();

        let (first, first_inner) = match start {
            None => (0, None),
            Some([k]) => (*k, None),
            Some([k, rest @ ..]) => (*k, Some(rest)),
            Some([]) => (0, None),
        };
        let (last, last_inner) = match end {
            None => (len, None),
            Some([m]) => (*m, None),
            Some([m, rest @ ..]) => (*m, Some(rest)),
            Some([]) => (len, None),
        };

        // With a partial end the child at `last` is included
        let stop = if last_inner.is_some() { last + 1 } else { last }.min(len);

        let mut result = Vec::new();
        for (i, &child) in children.iter().enumerate().take(stop).skip(first) {
            let child_start = if i == first { first_inner } else { None };
            let child_end = if i == last { last_inner } else { None };

            if child_start.is_none() && child_end.is_none() {
                result.push(self.deep_clone(child)?);
            } else if self.is_text(child) {
                result.extend(self.clone_between(child, child_start, child_end)?);
            } else {
                let shell = self.clone_shallow(child)?;
                for inner in self.clone_between(child, child_start, child_end)? {
                    self.append_child(shell, inner)?;
                }
                result.push(shell);
            }
        }

        Ok(result)
    }

    /// Text of `root` before and after `position`
    pub fn text_around(&self, root: NodeId, position: Position) -> (String, String) {
        let mut before = String::new();
        let mut after = String::new();

        for node in self.descendants(root) {
            let Some(text) = self.text(node) else {
                continue;
            };

            if node == position.node {
                let split = byte_offset(text, position.offset);
                before.push_str(&text[..split]);
                after.push_str(&text[split..]);
                continue;
            }

            match self.compare_positions(root, Position::new(node, 0), position) {
                Some(Ordering::Less) => before.push_str(text),
                _ => after.push_str(text),
            }
        }

        (before, after)
    }

    /// Insert nodes at a position, splitting a text container if needed.
    /// Returns the position right after the inserted nodes.
    pub fn insert_at(&mut self, position: Position, nodes: &[NodeId]) -> DomResult<Position> {
        let (parent, index) = if self.is_text(position.node) {
            let parent = self
                .parent(position.node)
                .ok_or(DomError::NodeNotFound(position.node))?;
            let index = self.node_index(position.node).unwrap_or(0);
            let len = self.node_length(position.node);
            if position.offset == 0 {
                (parent, index)
            } else if position.offset >= len {
                (parent, index + 1)
            } else {
                self.split_text(position.node, position.offset)?;
                (parent, index + 1)
            }
        } else {
            (position.node, position.offset.min(self.children(position.node).len()))
        };

        for (i, &node) in nodes.iter().enumerate() {
            self.insert_child(parent, index + i, node)?;
        }

        Ok(Position::new(parent, index + nodes.len()))
    }

    /// Split containers between `position` and `ancestor` so the position
    /// becomes a child boundary of `ancestor`; returns that child index
    pub fn split_to(&mut self, ancestor: NodeId, position: Position) -> DomResult<usize> {
        let mut pos = position;

        while pos.node != ancestor {
            let parent = self.parent(pos.node).ok_or(DomError::NodeNotFound(pos.node))?;
            let index = self.node_index(pos.node).unwrap_or(0);
            let len = self.node_length(pos.node);

            pos = if pos.offset == 0 {
                Position::new(parent, index)
            } else if pos.offset >= len {
                Position::new(parent, index + 1)
            } else if self.is_text(pos.node) {
                self.split_text(pos.node, pos.offset)?;
                Position::new(parent, index + 1)
            } else {
                let twin = self.clone_shallow(pos.node)?;
                let moved: Vec<NodeId> = self.children(pos.node)[pos.offset..].to_vec();
                for child in moved {
                    self.append_child(twin, child)?;
                }
                self.insert_child(parent, index + 1, twin)?;
                Position::new(parent, index + 1)
            };
        }

        Ok(pos.offset)
    }

    /// Wrap the content of `range` in `wrapper`, splitting partially covered
    /// containers. Returns the range covering the wrapper's content.
    pub fn wrap_range(&mut self, range: Range, wrapper: NodeId) -> DomResult<Range> {
        let common = self
            .common_ancestor(range.start.node, range.end.node)
            .ok_or(DomError::NodeNotFound(range.start.node))?;

        // End first, so the start split can only shift indices after it
        let mut end = self.split_to(common, range.end)?;
        let count_before = self.children(common).len();
        let start = self.split_to(common, range.start)?;
        end += self.children(common).len() - count_before;

        let covered: Vec<NodeId> = self.children(common)[start..end.max(start)].to_vec();
        for node in &covered {
            self.append_child(wrapper, *node)?;
        }
        self.insert_child(common, start, wrapper)?;

        Ok(Range::new(
            Position::new(wrapper, 0),
            Position::new(wrapper, covered.len()),
        ))
    }
}

/// Byte offset of the `chars`-th character (clamped to the end)
pub fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

fn char_slice(text: &str, from: usize, to: usize) -> &str {
    &text[byte_offset(text, from)..byte_offset(text, to)]
}
