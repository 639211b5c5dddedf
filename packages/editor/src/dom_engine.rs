//! # In-memory engine
//!
//! [`DomEngine`] implements [`EditableEngine`] over a `richtext-dom` arena.
//! It stands in for a browser `contenteditable` region in tests and in
//! hosts that don't have one.
//!
//! ## Layout
//!
//! Geometry is monospace: every character is `char_width` wide, block
//! elements and `<br>` start new lines of `line_height`. That's enough to
//! place toolbars and drive scrolling deterministically.
//!
//! ## Notifications
//!
//! Typing and commands queue the notifications a browser engine would
//! raise (`Input`, `ContentSettled`); hosts forward them to the surface
//! after draining them with [`EditableEngine::drain_notifications`].

use crate::config::{EngineSettings, DEFAULT_SENTINEL};
use crate::engine::{
    Bookmark, EditableEngine, EngineCommand, FormatDefinition, Rect, Selection, Shortcut,
    ShortcutAction,
};
use crate::errors::EngineError;
use crate::formats::default_definitions;
use crate::notification::{ChangeOrigin, KeyEvent, Notification};
use crate::undo_stack::UndoStack;
use richtext_dom::{byte_offset, is_void_element, Dom, DomResult, NodeId, Position, Range};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, trace};

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre",
];

pub fn is_block_element(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag)
}

/// Monospace layout metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Viewport position of the container
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            top: 0.0,
            left: 0.0,
            width: 640.0,
            char_width: 8.0,
            line_height: 20.0,
        }
    }
}

#[derive(Debug, Default)]
struct LayoutCursor {
    line: usize,
    column: usize,
    found: Option<(usize, usize)>,
}

impl LayoutCursor {
    fn newline(&mut self) {
        self.line += 1;
        self.column = 0;
    }

    fn mark(&mut self) {
        self.found = Some((self.line, self.column));
    }
}

/// Editable region backed by an arena DOM
#[derive(Debug)]
pub struct DomEngine {
    dom: Dom,
    body: NodeId,
    selection: Option<Selection>,
    settings: EngineSettings,
    formats: BTreeMap<String, FormatDefinition>,
    shortcuts: BTreeMap<Shortcut, ShortcutAction>,
    history: UndoStack,
    focused: bool,
    layout: Layout,
    scroll_top: f64,
    scrollable: bool,
    sentinel: char,
    notifications: Vec<Notification>,
}

impl DomEngine {
    pub fn new() -> Self {
        let mut dom = Dom::new();
        let body = dom.create_element("div");

        let mut shortcuts = BTreeMap::new();
        shortcuts.insert(
            Shortcut::primary('z'),
            ShortcutAction::Command(EngineCommand::Undo),
        );
        shortcuts.insert(
            Shortcut::primary_shift('z'),
            ShortcutAction::Command(EngineCommand::Redo),
        );
        shortcuts.insert(
            Shortcut::primary('y'),
            ShortcutAction::Command(EngineCommand::Redo),
        );

        Self {
            dom,
            body,
            selection: None,
            settings: EngineSettings::default(),
            formats: default_definitions(),
            shortcuts,
            history: UndoStack::new(),
            focused: false,
            layout: Layout::default(),
            scroll_top: 0.0,
            scrollable: true,
            sentinel: DEFAULT_SENTINEL,
            notifications: Vec::new(),
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_sentinel(mut self, sentinel: char) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Whether the region sits in a scroll container
    pub fn set_scrollable(&mut self, scrollable: bool) {
        self.scrollable = scrollable;
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn formatter(&self, name: &str) -> Option<&FormatDefinition> {
        self.formats.get(name)
    }

    pub fn shortcut(&self, shortcut: &Shortcut) -> Option<&ShortcutAction> {
        self.shortcuts.get(shortcut)
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Give the region focus, placing the caret at the end if there is none
    pub fn focus(&mut self) {
        self.focused = true;
        if self.selection.is_none() {
            let end = self.position_at_offset(usize::MAX);
            self.selection = Some(Selection::caret(end));
        }
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    // ---- text offsets ---------------------------------------------------

    /// Characters of text before `position`
    pub fn text_offset(&self, position: Position) -> usize {
        self.dom
            .text_around(self.body, position)
            .0
            .chars()
            .count()
    }

    /// Position `offset` characters into the text (clamped to the end)
    pub fn position_at_offset(&self, offset: usize) -> Position {
        let mut remaining = offset;
        let mut last = None;

        for node in self.dom.descendants(self.body) {
            let Some(text) = self.dom.text(node) else {
                continue;
            };
            let len = text.chars().count();
            if remaining <= len {
                return Position::new(node, remaining);
            }
            remaining -= len;
            last = Some(Position::new(node, len));
        }

        last.unwrap_or_else(|| Position::new(self.body, self.dom.children(self.body).len()))
    }

    /// Collapse the selection `offset` characters into the text
    pub fn set_caret(&mut self, offset: usize) {
        let caret = self.position_at_offset(offset);
        self.selection = Some(Selection::caret(caret));
    }

    /// Select the text between two character offsets
    pub fn select(&mut self, from: usize, to: usize) {
        let anchor = self.position_at_offset(from);
        let focus = self.position_at_offset(to);
        self.selection = Some(Selection::new(anchor, focus));
    }

    // ---- editing --------------------------------------------------------

    /// Type text at the selection like a user would
    pub fn type_text(&mut self, text: &str) -> Result<(), EngineError> {
        self.insert_text(text)?;
        self.notifications.push(Notification::Input);
        self.record_level(ChangeOrigin::Input);
        Ok(())
    }

    /// Start a new root block at the caret, like Enter in a multiline region.
    /// Falls back to a line break without a forced root block.
    pub fn insert_paragraph(&mut self) -> Result<(), EngineError> {
        let Some(tag) = self.settings.forced_root_block.clone() else {
            return self.exec_command(EngineCommand::InsertLineBreak);
        };

        let mut caret = self.delete_selection()?;
        let block = self.root_block(caret);
        let (before, after) = match block {
            Some(block) => self.dom.text_around(block, caret),
            None => (String::new(), String::new()),
        };

        if !before.is_empty() && !after.is_empty() {
            let index = self.dom.split_to(self.body, caret)?;
            let twin = self.dom.children(self.body)[index];
            caret = self
                .dom
                .descendants(twin)
                .into_iter()
                .find(|&n| self.dom.is_text(n))
                .map(|n| Position::new(n, 0))
                .unwrap_or(Position::new(twin, 0));
        } else {
            let index = match block {
                Some(block) => {
                    let index = self.dom.node_index(block).unwrap_or(0);
                    if after.is_empty() {
                        index + 1
                    } else {
                        index
                    }
                }
                None => caret.offset.min(self.dom.children(self.body).len()),
            };
            let empty = self.dom.create_element(&tag);
            self.dom.insert_child(self.body, index, empty)?;
            if after.is_empty() {
                caret = Position::new(empty, 0);
            }
        }

        self.selection = Some(Selection::caret(caret));
        self.notifications.push(Notification::NewBlock);
        self.notifications.push(Notification::Input);
        self.record_level(ChangeOrigin::Input);
        Ok(())
    }

    /// Direct child of the body holding `position`
    fn root_block(&self, position: Position) -> Option<NodeId> {
        if position.node == self.body {
            return None;
        }
        std::iter::once(position.node)
            .chain(self.dom.ancestors(position.node))
            .find(|&n| self.dom.parent(n) == Some(self.body))
    }

    fn insert_text(&mut self, text: &str) -> Result<(), EngineError> {
        let caret = self.delete_selection()?;
        let added = text.chars().count();

        if let Some(current) = self.dom.text(caret.node).map(str::to_string) {
            let mut updated = current;
            updated.insert_str(byte_offset(&updated, caret.offset), text);
            self.dom.set_text(caret.node, updated)?;
            self.selection = Some(Selection::caret(Position::new(
                caret.node,
                caret.offset + added,
            )));
        } else {
            let node = self.dom.create_text(text);
            self.dom.insert_at(caret, &[node])?;
            self.selection = Some(Selection::caret(Position::new(node, added)));
        }

        Ok(())
    }

    /// Caret for an insertion, creating the root block if the region is empty
    fn caret_or_end(&mut self) -> Result<Position, EngineError> {
        if let Some(selection) = self.selection {
            return Ok(selection.anchor);
        }

        if self.dom.children(self.body).is_empty() {
            if let Some(tag) = self.settings.forced_root_block.clone() {
                let block = self.dom.create_element(&tag);
                self.dom.append_child(self.body, block)?;
                return Ok(Position::new(block, 0));
            }
        }

        Ok(self.position_at_offset(usize::MAX))
    }

    /// Remove the selected content; returns the collapsed caret
    fn delete_selection(&mut self) -> Result<Position, EngineError> {
        let Some(selection) = self.selection else {
            let caret = self.caret_or_end()?;
            self.selection = Some(Selection::caret(caret));
            return Ok(caret);
        };
        if selection.is_collapsed() {
            return Ok(selection.anchor);
        }

        let range = selection.range(&self.dom, self.body);
        let offset = self.text_offset(range.start);

        let before = self.dom.clone_before(self.body, range.start)?;
        let after = self.dom.clone_after(self.body, range.end)?;
        let seam = before.len();

        let mut children = before;
        children.extend(after);
        self.dom.replace_children(self.body, children)?;
        self.join_at(self.body, seam)?;

        let caret = self.position_at_offset(offset);
        self.selection = Some(Selection::caret(caret));
        Ok(caret)
    }

    /// Merge the children of `parent` on both sides of `index` when they
    /// are the same kind of node
    fn join_at(&mut self, parent: NodeId, index: usize) -> DomResult<()> {
        if index == 0 {
            return Ok(());
        }
        let children = self.dom.children(parent);
        let (Some(&left), Some(&right)) = (children.get(index - 1), children.get(index)) else {
            return Ok(());
        };

        if let (Some(a), Some(b)) = (self.dom.text(left), self.dom.text(right)) {
            let joined = format!("{}{}", a, b);
            self.dom.set_text(left, joined)?;
            return self.dom.discard(right);
        }

        let mergeable = match (self.dom.tag_name(left), self.dom.tag_name(right)) {
            (Some(a), Some(b)) => {
                a == b && !is_void_element(a) && self.dom.attributes(left) == self.dom.attributes(right)
            }
            _ => false,
        };
        if !mergeable {
            return Ok(());
        }

        let seam = self.dom.children(left).len();
        let moved: Vec<NodeId> = self.dom.children(right).to_vec();
        for child in moved {
            self.dom.append_child(left, child)?;
        }
        self.dom.discard(right)?;
        self.join_at(left, seam)
    }

    fn record_level(&mut self, origin: ChangeOrigin) {
        let snapshot = self.get_content();
        if let Some(added) = self.history.add_level(snapshot) {
            trace!(initial = added.initial, origin = ?origin, "undo level added");
            self.notifications.push(Notification::ContentSettled {
                initial_level: added.initial,
                origin,
            });
        }
    }

    fn load_snapshot(&mut self, html: &str) -> Result<(), EngineError> {
        self.dom.set_inner_html(self.body, html)?;
        let end = self.position_at_offset(usize::MAX);
        self.selection = Some(Selection::caret(end));
        self.notifications.push(Notification::Input);
        Ok(())
    }

    /// Wrap runs of inline top-level nodes in the forced root block
    fn apply_root_block(&mut self) -> Result<(), EngineError> {
        let Some(tag) = self.settings.forced_root_block.clone() else {
            return Ok(());
        };

        let children: Vec<NodeId> = self.dom.children(self.body).to_vec();
        let mut result = Vec::new();
        let mut run = Vec::new();

        for child in children {
            if self.dom.tag_name(child).is_some_and(is_block_element) {
                self.flush_run(&tag, &mut run, &mut result)?;
                result.push(child);
            } else {
                run.push(child);
            }
        }
        self.flush_run(&tag, &mut run, &mut result)?;

        self.dom.replace_children(self.body, result)?;
        Ok(())
    }

    fn flush_run(
        &mut self,
        tag: &str,
        run: &mut Vec<NodeId>,
        result: &mut Vec<NodeId>,
    ) -> DomResult<()> {
        if run.is_empty() {
            return Ok(());
        }
        let block = self.dom.create_element(tag);
        for node in run.drain(..) {
            self.dom.append_child(block, node)?;
        }
        result.push(block);
        Ok(())
    }

    /// Closest element with `tag` from `node` up to (excluding) the body
    fn enclosing(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.dom.ancestors(node))
            .take_while(|&n| n != self.body)
            .find(|&n| self.dom.tag_name(n) == Some(tag))
    }

    /// True if the node's extent overlaps the range (or holds the caret)
    fn intersects(&self, node: NodeId, range: Range) -> bool {
        let (Some(parent), Some(index)) = (self.dom.parent(node), self.dom.node_index(node)) else {
            return false;
        };
        let start = Position::new(parent, index);
        let end = Position::new(parent, index + 1);

        self.dom.compare_positions(self.body, start, range.end) == Some(Ordering::Less)
            && self.dom.compare_positions(self.body, end, range.start) == Some(Ordering::Greater)
    }

    fn insert_content(&mut self, html: &str) -> Result<(), EngineError> {
        let caret = self.delete_selection()?;
        let fragment = self.dom.parse_fragment(html);
        let nodes: Vec<NodeId> = self.dom.children(fragment).to_vec();
        let after = self.dom.insert_at(caret, &nodes)?;
        self.dom.discard(fragment)?;
        self.selection = Some(Selection::caret(after));
        Ok(())
    }

    fn insert_line_break(&mut self) -> Result<(), EngineError> {
        let caret = self.delete_selection()?;
        let br = self.dom.create_element("br");
        let after = self.dom.insert_at(caret, &[br])?;
        self.selection = Some(Selection::caret(after));
        Ok(())
    }

    fn insert_link(&mut self, href: String, target: Option<String>) -> Result<(), EngineError> {
        let existing = self.selection.and_then(|s| self.enclosing(s.anchor.node, "a"));
        if let Some(anchor) = existing {
            self.dom.set_attribute(anchor, "href", href)?;
            match target {
                Some(target) => self.dom.set_attribute(anchor, "target", target)?,
                None => {
                    self.dom.remove_attribute(anchor, "target")?;
                }
            }
            return Ok(());
        }

        let mut attributes = BTreeMap::new();
        attributes.insert("href".to_string(), href.clone());
        if let Some(target) = target {
            attributes.insert("target".to_string(), target);
        }
        let link = self.dom.create_element_with("a", attributes);

        self.wrap_selection(link, Some(&href))
    }

    fn apply_format(
        &mut self,
        name: &str,
        attributes: BTreeMap<String, String>,
    ) -> Result<(), EngineError> {
        let definition = self
            .formats
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownFormat(name.to_string()))?;

        let mut attributes = attributes;
        if let Some(style) = definition.style_attribute() {
            attributes.insert("style".to_string(), style);
        }
        let element = self
            .dom
            .create_element_with(definition.primary_tag(), attributes);

        self.wrap_selection(element, None)
    }

    /// Wrap the selection in `wrapper`. A collapsed selection inserts the
    /// wrapper holding `placeholder`, or the caret sentinel with the caret
    /// parked inside it.
    fn wrap_selection(&mut self, wrapper: NodeId, placeholder: Option<&str>) -> Result<(), EngineError> {
        let selection = match self.selection {
            Some(selection) => selection,
            None => Selection::caret(self.caret_or_end()?),
        };

        if !selection.is_collapsed() {
            let range = selection.range(&self.dom, self.body);
            let wrapped = self.dom.wrap_range(range, wrapper)?;
            self.selection = Some(Selection::new(wrapped.start, wrapped.end));
            return Ok(());
        }

        match placeholder {
            Some(text) => {
                let content = self.dom.create_text(text);
                self.dom.append_child(wrapper, content)?;
                let after = self.dom.insert_at(selection.anchor, &[wrapper])?;
                self.selection = Some(Selection::caret(after));
            }
            None => {
                let anchor = self.dom.create_text(self.sentinel.to_string());
                self.dom.append_child(wrapper, anchor)?;
                self.dom.insert_at(selection.anchor, &[wrapper])?;
                self.selection = Some(Selection::caret(Position::new(anchor, 1)));
            }
        }
        Ok(())
    }

    /// Unwrap every instance of a format touching the selection
    fn remove_format(&mut self, name: &str) -> Result<(), EngineError> {
        let definition = self
            .formats
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownFormat(name.to_string()))?;
        let selection = self.selection.ok_or(EngineError::NoSelection)?;
        let range = selection.range(&self.dom, self.body);
        let bookmark = self.create_bookmark();

        let targets: Vec<NodeId> = self
            .dom
            .descendants(self.body)
            .into_iter()
            .filter(|&node| definition.matches(&self.dom, node) && self.intersects(node, range))
            .collect();

        for node in targets {
            self.dom.unwrap(node)?;
        }

        if let Some(bookmark) = bookmark {
            self.restore_bookmark(bookmark);
        }
        Ok(())
    }

    // ---- layout ---------------------------------------------------------

    fn locate(&self, target: Position) -> (usize, usize) {
        let mut cursor = LayoutCursor::default();
        self.walk_layout(self.body, target, &mut cursor);
        cursor.found.unwrap_or((cursor.line, cursor.column))
    }

    fn walk_layout(&self, node: NodeId, target: Position, cursor: &mut LayoutCursor) {
        if cursor.found.is_some() {
            return;
        }

        if let Some(text) = self.dom.text(node) {
            if node == target.node {
                cursor.found = Some((cursor.line, cursor.column + target.offset));
            } else {
                cursor.column += text.chars().count();
            }
            return;
        }

        let tag = self.dom.tag_name(node);
        let is_block = node != self.body && tag.is_some_and(is_block_element);
        if is_block && cursor.column > 0 {
            cursor.newline();
        }
        if tag == Some("br") {
            cursor.newline();
        }

        for (index, &child) in self.dom.children(node).iter().enumerate() {
            if node == target.node && index == target.offset {
                cursor.mark();
                return;
            }
            self.walk_layout(child, target, cursor);
            if cursor.found.is_some() {
                return;
            }
        }

        if node == target.node {
            cursor.mark();
            return;
        }
        if is_block {
            cursor.newline();
        }
    }

    fn rect_between(&self, start: (usize, usize), end: (usize, usize)) -> Rect {
        let Layout {
            top,
            left,
            width,
            char_width,
            line_height,
        } = self.layout;
        let line_top = top - self.scroll_top + start.0 as f64 * line_height;

        if start.0 == end.0 {
            Rect::new(
                line_top,
                left + start.1 as f64 * char_width,
                end.1.saturating_sub(start.1) as f64 * char_width,
                line_height,
            )
        } else {
            let lines = end.0.saturating_sub(start.0) + 1;
            Rect::new(line_top, left, width, lines as f64 * line_height)
        }
    }
}

impl Default for DomEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EditableEngine for DomEngine {
    fn configure(&mut self, settings: EngineSettings) {
        debug!(
            forced_root_block = ?settings.forced_root_block,
            undo_levels = settings.custom_undo_redo_levels,
            "engine configured"
        );
        self.history.set_max_levels(settings.custom_undo_redo_levels);
        self.settings = settings;
    }

    fn body(&self) -> NodeId {
        self.body
    }

    fn dom(&self) -> &Dom {
        &self.dom
    }

    fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    fn set_content(&mut self, html: &str) -> Result<(), EngineError> {
        self.dom.set_inner_html(self.body, html)?;
        self.apply_root_block()?;

        if self.selection.is_some() {
            let start = self.position_at_offset(0);
            self.selection = Some(Selection::caret(start));
        }
        Ok(())
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    fn selected_html(&mut self) -> Result<String, EngineError> {
        let Some(selection) = self.selection else {
            return Ok(String::new());
        };
        let range = selection.range(&self.dom, self.body);
        let nodes = self.dom.clone_range(self.body, range)?;
        let html = self.dom.serialize_nodes(&nodes);
        for node in nodes {
            self.dom.discard(node)?;
        }
        Ok(html)
    }

    fn create_bookmark(&self) -> Option<Bookmark> {
        let selection = self.selection?;
        Some(Bookmark {
            anchor: self.text_offset(selection.anchor),
            focus: self.text_offset(selection.focus),
        })
    }

    fn restore_bookmark(&mut self, bookmark: Bookmark) {
        self.select(bookmark.anchor, bookmark.focus);
    }

    fn set_undo_tracking(&mut self, enabled: bool) {
        self.history.set_ignoring(!enabled);
    }

    fn match_formats(&self, names: &[String]) -> Vec<String> {
        let Some(selection) = self.selection else {
            return Vec::new();
        };
        let range = selection.range(&self.dom, self.body);
        let start = self.dom.containing_element(range.start);
        let chain: Vec<NodeId> = std::iter::once(start)
            .chain(self.dom.ancestors(start))
            .take_while(|&n| n != self.body)
            .collect();

        names
            .iter()
            .filter(|name| {
                self.formats.get(name.as_str()).is_some_and(|definition| {
                    chain.iter().any(|&node| definition.matches(&self.dom, node))
                })
            })
            .cloned()
            .collect()
    }

    fn register_formatter(&mut self, name: &str, definition: FormatDefinition) {
        self.formats.insert(name.to_string(), definition);
    }

    fn add_shortcut(&mut self, shortcut: Shortcut, action: ShortcutAction) {
        self.shortcuts.insert(shortcut, action);
    }

    fn remove_shortcut(&mut self, shortcut: &Shortcut) -> Option<ShortcutAction> {
        self.shortcuts.remove(shortcut)
    }

    fn match_shortcut(&self, event: &KeyEvent) -> Option<ShortcutAction> {
        self.shortcuts
            .iter()
            .find(|(shortcut, _)| shortcut.matches(event))
            .map(|(_, action)| action.clone())
    }

    fn exec_command(&mut self, command: EngineCommand) -> Result<(), EngineError> {
        debug!(command = %command, "exec command");

        match command {
            EngineCommand::InsertLineBreak => self.insert_line_break()?,
            EngineCommand::InsertContent(html) => self.insert_content(&html)?,
            EngineCommand::InsertLink { href, target } => self.insert_link(href, target)?,
            EngineCommand::Unlink => self.remove_format("link")?,
            EngineCommand::ApplyFormat { name, attributes } => {
                self.apply_format(&name, attributes)?
            }
            EngineCommand::RemoveFormat(name) => self.remove_format(&name)?,
            EngineCommand::Undo => {
                if let Some(snapshot) = self.history.undo() {
                    self.load_snapshot(&snapshot)?;
                }
                return Ok(());
            }
            EngineCommand::Redo => {
                if let Some(snapshot) = self.history.redo() {
                    self.load_snapshot(&snapshot)?;
                }
                return Ok(());
            }
        }

        self.record_level(ChangeOrigin::Command);
        Ok(())
    }

    fn has_focus(&self) -> bool {
        self.focused
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let start = self.locate(Position::new(node, 0));
        let end = self.locate(Position::new(node, self.dom.node_length(node)));
        self.rect_between(start, end)
    }

    fn range_rect(&self, range: Range) -> Rect {
        self.rect_between(self.locate(range.start), self.locate(range.end))
    }

    fn container_rect(&self) -> Rect {
        let (last_line, _) = self.locate(Position::new(self.body, usize::MAX));
        Rect::new(
            self.layout.top - self.scroll_top,
            self.layout.left,
            self.layout.width,
            (last_line + 1) as f64 * self.layout.line_height,
        )
    }

    fn scroll_by(&mut self, delta: f64) -> bool {
        if !self.scrollable {
            return false;
        }
        self.scroll_top = (self.scroll_top + delta).max(0.0);
        true
    }

    fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Multiline;

    fn engine_with(html: &str) -> DomEngine {
        let mut engine = DomEngine::new();
        engine.set_content(html).unwrap();
        engine.focus();
        engine
    }

    #[test]
    fn test_type_text_queues_input_and_level() {
        let mut engine = DomEngine::new();
        engine.focus();

        engine.type_text("a").unwrap();
        engine.type_text("b").unwrap();

        assert_eq!(engine.get_content(), "ab");
        assert_eq!(
            engine.drain_notifications(),
            vec![
                Notification::Input,
                Notification::ContentSettled {
                    initial_level: true,
                    origin: ChangeOrigin::Input
                },
                Notification::Input,
                Notification::ContentSettled {
                    initial_level: false,
                    origin: ChangeOrigin::Input
                },
            ]
        );
        assert!(engine.drain_notifications().is_empty());
    }

    #[test]
    fn test_forced_root_block_wraps_inline_runs() {
        let mut engine = DomEngine::new();
        let mut settings = EngineSettings::default();
        settings.forced_root_block = Some("p".into());
        engine.configure(settings);

        engine.set_content("one<p>two</p>three").unwrap();
        assert_eq!(engine.get_content(), "<p>one</p><p>two</p><p>three</p>");
    }

    #[test]
    fn test_delete_selection_joins_blocks() {
        let mut engine = engine_with("<p>abc</p><p>def</p>");
        engine.select(1, 5);

        engine.type_text("X").unwrap();
        assert_eq!(engine.get_content(), "<p>aXf</p>");
    }

    #[test]
    fn test_bookmark_survives_content_replace() {
        let mut engine = engine_with("hello <em>world</em>");
        engine.select(2, 8);
        let bookmark = engine.create_bookmark().unwrap();

        engine.set_content("hello <em>world</em>").unwrap();
        engine.restore_bookmark(bookmark);

        assert_eq!(engine.create_bookmark(), Some(bookmark));
        assert_eq!(engine.selected_html().unwrap(), "llo <em>wo</em>");
    }

    #[test]
    fn test_apply_and_remove_format() {
        let mut engine = engine_with("make bold");
        engine.select(5, 9);

        engine
            .exec_command(EngineCommand::ApplyFormat {
                name: "bold".into(),
                attributes: BTreeMap::new(),
            })
            .unwrap();
        assert_eq!(engine.get_content(), "make <strong>bold</strong>");
        assert_eq!(
            engine.match_formats(&["bold".into(), "italic".into()]),
            vec!["bold".to_string()]
        );

        engine
            .exec_command(EngineCommand::RemoveFormat("bold".into()))
            .unwrap();
        assert_eq!(engine.get_content(), "make bold");
    }

    #[test]
    fn test_collapsed_format_parks_caret_in_sentinel() {
        let mut engine = engine_with("ab");
        engine.set_caret(2);

        engine
            .exec_command(EngineCommand::ApplyFormat {
                name: "italic".into(),
                attributes: BTreeMap::new(),
            })
            .unwrap();
        engine.type_text("c").unwrap();

        assert_eq!(engine.get_content(), "ab<em>\u{feff}c</em>");
    }

    #[test]
    fn test_insert_and_unlink() {
        let mut engine = engine_with("click here");
        engine.select(0, 10);

        engine
            .exec_command(EngineCommand::InsertLink {
                href: "https://example.org".into(),
                target: None,
            })
            .unwrap();
        assert_eq!(
            engine.get_content(),
            r#"<a href="https://example.org">click here</a>"#
        );

        engine.exec_command(EngineCommand::Unlink).unwrap();
        assert_eq!(engine.get_content(), "click here");
    }

    #[test]
    fn test_line_break_and_layout() {
        let mut engine = engine_with("abcd");
        engine.set_caret(2);
        engine.exec_command(EngineCommand::InsertLineBreak).unwrap();

        assert_eq!(engine.get_content(), "ab<br>cd");

        let caret = engine.selection().unwrap().anchor;
        let rect = engine.range_rect(Range::collapsed(caret));
        assert_eq!(rect.top, 20.0);
        assert_eq!(rect.left, 0.0);
        assert_eq!(engine.container_rect().height, 40.0);
    }

    #[test]
    fn test_bounding_rect_of_inline_element() {
        let engine = engine_with("ab<a href=\"/x\">cd</a>");
        let link = engine.dom().children(engine.body())[1];

        assert_eq!(engine.bounding_rect(link), Rect::new(0.0, 16.0, 16.0, 20.0));
    }

    #[test]
    fn test_undo_with_single_level() {
        let mut engine = DomEngine::new();
        let mut settings = EngineSettings::default();
        settings.custom_undo_redo_levels = 1;
        engine.configure(settings);
        engine.focus();

        engine.type_text("a").unwrap();
        engine.type_text("b").unwrap();
        engine.type_text("c").unwrap();

        engine.exec_command(EngineCommand::Undo).unwrap();
        assert_eq!(engine.get_content(), "ab");
        engine.exec_command(EngineCommand::Undo).unwrap();
        assert_eq!(engine.get_content(), "ab");
        engine.exec_command(EngineCommand::Redo).unwrap();
        assert_eq!(engine.get_content(), "abc");
    }

    #[test]
    fn test_default_shortcuts() {
        let engine = DomEngine::new();
        let redo = KeyEvent::char('y').with_primary();

        assert_eq!(
            engine.match_shortcut(&redo),
            Some(ShortcutAction::Command(EngineCommand::Redo))
        );
        assert_eq!(engine.match_shortcut(&KeyEvent::char('y')), None);
    }

    #[test]
    fn test_insert_paragraph() {
        let mut engine = DomEngine::new();
        engine.configure(EngineSettings::build(Default::default(), &Multiline::Tag("p".into())));
        engine.set_content("<p>onetwo</p>").unwrap();
        engine.set_caret(3);
        engine.drain_notifications();

        engine.insert_paragraph().unwrap();
        assert_eq!(engine.get_content(), "<p>one</p><p>two</p>");
        assert_eq!(engine.text_offset(engine.selection().unwrap().focus), 3);
        assert_eq!(engine.drain_notifications()[..2], [Notification::NewBlock, Notification::Input]);

        engine.set_caret(6);
        engine.insert_paragraph().unwrap();
        assert_eq!(engine.get_content(), "<p>one</p><p>two</p><p></p>");
        let caret = engine.selection().unwrap().focus;
        assert_eq!(caret.node, engine.dom().children(engine.body())[2]);
    }

    #[test]
    fn test_scroll_by() {
        let mut engine = DomEngine::new();

        assert!(engine.scroll_by(30.0));
        assert_eq!(engine.scroll_top(), 30.0);
        assert!(engine.scroll_by(-100.0));
        assert_eq!(engine.scroll_top(), 0.0);

        engine.set_scrollable(false);
        assert!(!engine.scroll_by(10.0));
    }
}
