//! # Split and merge
//!
//! Decides what Backspace, Delete and Enter mean at the field level and
//! computes the two halves of a split. The computation never mutates the
//! field's own content: halves are built from clones, converted to values,
//! and the clones discarded. The controller restores the field's content
//! before handing the halves to the host, so a field never shows what the
//! engine did to it before the split.

use crate::boundary::ZeroWidthBoundaryHandler;
use crate::converter::FormatConverter;
use crate::engine::Selection;
use crate::notification::Key;
use crate::value::{Multiline, Value, ValueFormat};
use richtext_dom::{Dom, DomResult, NodeId, Position, Range};
use tracing::debug;

/// The two halves of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitParts {
    pub before: Value,
    pub after: Value,
}

impl SplitParts {
    pub fn empty(format: ValueFormat) -> Self {
        Self {
            before: Value::empty(format),
            after: Value::empty(format),
        }
    }
}

/// What an Enter key press does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnterAction {
    /// Engine default
    Ignore,
    /// Prevent default, checkpoint, insert a line break
    LineBreak,
    /// Prevent default, checkpoint, restore and split
    Split(SplitParts),
}

#[derive(Debug, Clone)]
pub struct SplitMergeController {
    converter: FormatConverter,
    boundary: ZeroWidthBoundaryHandler,
}

impl SplitMergeController {
    pub fn new(converter: FormatConverter, boundary: ZeroWidthBoundaryHandler) -> Self {
        Self { converter, boundary }
    }

    /// Merge direction (`true` = forward) for Backspace/Delete with a
    /// collapsed caret at the matching edge of `root`
    pub fn merge_direction(
        &self,
        dom: &Dom,
        root: NodeId,
        selection: Option<Selection>,
        key: Key,
    ) -> Option<bool> {
        let forward = match key {
            Key::Delete => true,
            Key::Backspace => false,
            _ => return None,
        };

        let selection = selection?;
        if !selection.is_collapsed() {
            return None;
        }

        self.boundary
            .is_horizontal_edge(dom, root, selection.focus, !forward)
            .then_some(forward)
    }

    /// Halves of `root` around `range`, with sentinel and empty text nodes
    /// left out
    pub fn split_at(
        &self,
        dom: &mut Dom,
        root: NodeId,
        range: Range,
        format: ValueFormat,
    ) -> DomResult<SplitParts> {
        if dom.children(root).is_empty() {
            return Ok(SplitParts::empty(format));
        }

        let before = dom.clone_before(root, range.start)?;
        let after = dom.clone_after(root, range.end)?;
        let parts = SplitParts {
            before: self.convert_filtered(dom, &before, format),
            after: self.convert_filtered(dom, &after, format),
        };

        for node in before.into_iter().chain(after) {
            dom.discard(node)?;
        }
        Ok(parts)
    }

    fn convert_filtered(&self, dom: &Dom, nodes: &[NodeId], format: ValueFormat) -> Value {
        let kept = self.boundary.filter_empty(dom, nodes);
        self.converter.to_value(dom, &kept, format)
    }

    /// Direct child of `root` holding `position`
    pub fn root_child(dom: &Dom, root: NodeId, position: Position) -> Option<NodeId> {
        let mut node = position.node;
        if node == root {
            return dom.children(root).get(position.offset).copied();
        }
        while dom.parent(node) != Some(root) {
            node = dom.parent(node)?;
        }
        Some(node)
    }

    /// Halves around one line of a multiline field, the line itself dropped
    pub fn split_around_line(&self, dom: &Dom, root: NodeId, line: NodeId, format: ValueFormat) -> Option<SplitParts> {
        let index = dom.node_index(line)?;
        let children = dom.children(root);

        Some(SplitParts {
            before: self.converter.to_value(dom, &children[..index], format),
            after: self.converter.to_value(dom, &children[index + 1..], format),
        })
    }

    pub fn plan_enter(
        &self,
        dom: &mut Dom,
        root: NodeId,
        selection: Option<Selection>,
        multiline: &Multiline,
        shift: bool,
        can_split: bool,
        format: ValueFormat,
    ) -> DomResult<EnterAction> {
        if multiline.is_enabled() {
            if !can_split {
                return Ok(EnterAction::Ignore);
            }
            let Some(selection) = selection else {
                return Ok(EnterAction::Ignore);
            };

            // Only an empty line sitting directly in the field splits it
            let line = dom.containing_element(selection.focus);
            if dom.parent(line) != Some(root) || !dom.is_empty(line) {
                return Ok(EnterAction::Ignore);
            }

            return Ok(match self.split_around_line(dom, root, line, format) {
                Some(parts) => EnterAction::Split(parts),
                None => EnterAction::Ignore,
            });
        }

        if shift || !can_split {
            return Ok(EnterAction::LineBreak);
        }

        let range = match selection {
            Some(selection) => selection.range(dom, root),
            None => Range::collapsed(Position::new(root, dom.children(root).len())),
        };
        Ok(EnterAction::Split(self.split_at(dom, root, range, format)?))
    }

    /// Halves after the engine created a new line in a `p`-multiline field
    ///
    /// Splits only when at least two lines precede the caret's line and the
    /// one immediately before it is empty: a double Enter at that point.
    /// The empty line is dropped, as are empty lines leading `after`.
    pub fn new_block_parts(&self, dom: &Dom, root: NodeId, caret: Position, format: ValueFormat) -> Option<SplitParts> {
        let selected = Self::root_child(dom, root, caret)?;
        let children = dom.children(root);
        let split_index = dom.node_index(selected)?;

        let before_nodes = &children[..split_index];
        let &last = before_nodes.last()?;
        if before_nodes.len() < 2 || !dom.text_content(last).is_empty() {
            return None;
        }
        let before = &before_nodes[..before_nodes.len() - 1];

        let after: Vec<NodeId> = children[split_index..]
            .iter()
            .copied()
            .skip_while(|&node| dom.text_content(node).is_empty())
            .collect();

        debug!(before = before.len(), after = after.len(), "double enter splits field");
        Some(SplitParts {
            before: self.converter.to_value(dom, before, format),
            after: self.converter.to_value(dom, &after, format),
        })
    }
}
