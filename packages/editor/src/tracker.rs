//! # Selection and format tracking
//!
//! Recomputed on every node-change notification while the field has focus:
//!
//! 1. collect the element ancestors from the caret up to the field root
//! 2. ask the engine which enabled formats match; links also report their
//!    `href` and `target`
//! 3. anchor rectangle: the enclosing link's box, else the selection's box
//! 4. translate it into container coordinates plus the toolbar offset
//!
//! The revision counter lives in the session state so consumers can tell a
//! new selection apart from an identical format set.

use crate::config::{SurfaceConfig, ToolbarOffset};
use crate::engine::{EditableEngine, Rect};
use crate::formats::{FormatDescriptor, FormatState};
use richtext_dom::{Dom, NodeId, Position};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Toolbar anchor point relative to the field container
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FocusPosition {
    pub top: f64,
    pub left: f64,
}

/// Result of one tracking pass
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSelection {
    pub formats: FormatState,
    pub focus_position: FocusPosition,
    /// Viewport rectangle the toolbar is anchored to
    pub anchor_rect: Rect,
}

#[derive(Debug, Clone)]
pub struct SelectionAndFormatTracker {
    toolbar_offset: ToolbarOffset,
    scroll_grace_offset: f64,
    scroll_epsilon: f64,
}

impl SelectionAndFormatTracker {
    pub fn new(config: &SurfaceConfig) -> Self {
        Self {
            toolbar_offset: config.toolbar_offset,
            scroll_grace_offset: config.scroll_grace_offset,
            scroll_epsilon: config.scroll_epsilon,
        }
    }

    /// Elements from the caret's container up to (excluding) `root`
    pub fn ancestors(dom: &Dom, root: NodeId, caret: Position) -> Vec<NodeId> {
        let start = dom.containing_element(caret);
        std::iter::once(start)
            .chain(dom.ancestors(start))
            .take_while(|&node| node != root)
            .filter(|&node| dom.is_element(node))
            .collect()
    }

    /// Formats and toolbar position at the current selection; `None` when
    /// the field isn't focused or has no selection
    pub fn track(&self, engine: &dyn EditableEngine, enabled: &[String]) -> Option<TrackedSelection> {
        if !engine.has_focus() {
            return None;
        }

        let dom = engine.dom();
        let body = engine.body();
        let range = engine.selection()?.range(dom, body);
        let parents = Self::ancestors(dom, body, range.start);

        let formats: FormatState = engine
            .match_formats(enabled)
            .into_iter()
            .map(|name| {
                let descriptor = format_properties(&name, dom, &parents);
                (name, descriptor)
            })
            .collect();

        let anchor = parents
            .iter()
            .copied()
            .find(|&node| dom.tag_name(node) == Some("a"));
        let anchor_rect = match anchor {
            Some(link) => engine.bounding_rect(link),
            None => engine.range_rect(range),
        };

        let focus_position = self.focus_position(anchor_rect, engine.container_rect());
        trace!(formats = formats.len(), top = focus_position.top, left = focus_position.left, "selection tracked");

        Some(TrackedSelection {
            formats,
            focus_position,
            anchor_rect,
        })
    }

    /// Toolbar position below the middle of `rect`, relative to `container`
    pub fn focus_position(&self, rect: Rect, container: Rect) -> FocusPosition {
        FocusPosition {
            top: rect.top - container.top + rect.height + self.toolbar_offset.top,
            left: rect.left - container.left + rect.width / 2.0 + self.toolbar_offset.left,
        }
    }

    /// Scroll needed to bring `caret_top` to the grace line, if worth it
    pub fn scroll_delta(&self, caret_top: f64) -> Option<f64> {
        let delta = caret_top - self.scroll_grace_offset;
        (delta.abs() > self.scroll_epsilon).then_some(delta)
    }

    /// Keep the caret in a comfortable band on narrow viewports
    pub fn scroll_to_rect(&self, engine: &mut dyn EditableEngine, rect: Rect) -> bool {
        match self.scroll_delta(rect.top) {
            Some(delta) => engine.scroll_by(delta),
            None => false,
        }
    }
}

/// Structured metadata for formats that carry it
fn format_properties(name: &str, dom: &Dom, parents: &[NodeId]) -> FormatDescriptor {
    match name {
        "link" => match parents.iter().find(|&&node| dom.tag_name(node) == Some("a")) {
            Some(&anchor) => {
                FormatDescriptor::link(dom.attribute(anchor, "href"), dom.attribute(anchor, "target"))
            }
            None => FormatDescriptor::active(),
        },
        _ => FormatDescriptor::active(),
    }
}
