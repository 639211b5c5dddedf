//! # Editable engine seam
//!
//! Everything the surface needs from the embedded editing engine goes
//! through [`EditableEngine`]. The controller, split/merge logic and paste
//! routing only see this trait, so any engine (a browser `contenteditable`
//! bridge or the in-memory [`DomEngine`](crate::DomEngine)) can sit behind
//! a field.
//!
//! ## Coordinates
//!
//! Rectangles are viewport-relative, like `getBoundingClientRect`.
//! Bookmarks are character offsets into the field's text and survive a
//! full content replace as long as the text doesn't change.

use crate::config::EngineSettings;
use crate::errors::EngineError;
use crate::notification::{Key, KeyEvent, Notification};
use richtext_dom::{Dom, NodeId, Position, Range};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Live selection: where it started (anchor) and where it ends (focus)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(position: Position) -> Self {
        Self::new(position, position)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Document-ordered range under `root`
    pub fn range(&self, dom: &Dom, root: NodeId) -> Range {
        dom.ordered_range(root, self.anchor, self.focus)
    }
}

/// Caret/selection snapshot taken before a content replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    pub anchor: usize,
    pub focus: usize,
}

/// Viewport rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }
}

/// How an inline format is represented in the DOM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDefinition {
    /// Matching tags; the first one is used when applying
    pub tags: Vec<String>,

    /// Inline styles that must all be present to match (`span` formatters)
    #[serde(default)]
    pub styles: BTreeMap<String, String>,
}

impl FormatDefinition {
    pub fn inline(tags: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            styles: BTreeMap::new(),
        }
    }

    /// `span` carrying the given styles
    pub fn inline_style(styles: BTreeMap<String, String>) -> Self {
        Self {
            tags: vec!["span".to_string()],
            styles,
        }
    }

    pub fn primary_tag(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or("span")
    }

    /// Serialized `style` attribute for application
    pub fn style_attribute(&self) -> Option<String> {
        if self.styles.is_empty() {
            return None;
        }
        Some(
            self.styles
                .iter()
                .map(|(name, value)| format!("{}: {}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// True if the element is an instance of this format
    pub fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        let Some(tag) = dom.tag_name(node) else {
            return false;
        };
        if !self.tags.iter().any(|t| t == tag) {
            return false;
        }
        if self.styles.is_empty() {
            return true;
        }

        let declared = parse_style(dom.attribute(node, "style").unwrap_or(""));
        self.styles
            .iter()
            .all(|(name, value)| declared.get(name) == Some(value))
    }
}

/// Parse a `style` attribute into declarations
pub fn parse_style(style: &str) -> BTreeMap<String, String> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

/// Commands the surface issues to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    InsertLineBreak,

    /// Insert markup at the selection, replacing it
    InsertContent(String),

    /// Turn the selection into a link, or update the link around it
    InsertLink {
        href: String,
        target: Option<String>,
    },

    Unlink,

    ApplyFormat {
        name: String,
        attributes: BTreeMap<String, String>,
    },

    RemoveFormat(String),

    Undo,
    Redo,
}

impl EngineCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::InsertLineBreak => "InsertLineBreak",
            EngineCommand::InsertContent(_) => "InsertContent",
            EngineCommand::InsertLink { .. } => "InsertLink",
            EngineCommand::Unlink => "Unlink",
            EngineCommand::ApplyFormat { .. } => "ApplyFormat",
            EngineCommand::RemoveFormat(_) => "RemoveFormat",
            EngineCommand::Undo => "Undo",
            EngineCommand::Redo => "Redo",
        }
    }

    /// Undo and redo are owned by the host when it handles them
    pub fn is_history(&self) -> bool {
        matches!(self, EngineCommand::Undo | EngineCommand::Redo)
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyboard shortcut
///
/// `primary` is Ctrl (Cmd on macOS); `access` is Shift+Alt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Shortcut {
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
    pub character: char,
}

impl Shortcut {
    pub fn primary(character: char) -> Self {
        Self {
            primary: true,
            shift: false,
            alt: false,
            character: character.to_ascii_lowercase(),
        }
    }

    pub fn primary_shift(character: char) -> Self {
        Self {
            shift: true,
            ..Self::primary(character)
        }
    }

    pub fn access(character: char) -> Self {
        Self {
            primary: false,
            shift: true,
            alt: true,
            character: character.to_ascii_lowercase(),
        }
    }

    /// Parse engine notation like `meta+y` or `ctrl+shift+z`
    ///
    /// `meta` and `ctrl` both mean the platform's primary modifier.
    pub fn parse(pattern: &str) -> Option<Self> {
        let mut shortcut = Self {
            primary: false,
            shift: false,
            alt: false,
            character: '\0',
        };

        for part in pattern.split('+') {
            match part.trim().to_ascii_lowercase().as_str() {
                "meta" | "ctrl" | "primary" => shortcut.primary = true,
                "shift" => shortcut.shift = true,
                "alt" => shortcut.alt = true,
                "access" => {
                    shortcut.shift = true;
                    shortcut.alt = true;
                }
                key => {
                    let mut chars = key.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => shortcut.character = c,
                        _ => return None,
                    }
                }
            }
        }

        (shortcut.character != '\0').then_some(shortcut)
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        let Key::Char(c) = event.key else {
            return false;
        };
        c.to_ascii_lowercase() == self.character
            && event.primary == self.primary
            && event.shift == self.shift
            && event.alt == self.alt
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primary {
            write!(f, "primary+")?;
        }
        if self.shift {
            write!(f, "shift+")?;
        }
        if self.alt {
            write!(f, "alt+")?;
        }
        write!(f, "{}", self.character)
    }
}

/// Surface-level actions a shortcut can trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShortcut {
    /// Open the link UI for the selection
    AddLink,
    RemoveLink,
    ToggleFormat(String),
}

/// What a registered shortcut does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Run an engine command
    Command(EngineCommand),

    /// Hand the shortcut back to the surface
    Field(FieldShortcut),
}

/// The embedded editing engine
pub trait EditableEngine {
    /// Apply settings before content is loaded
    fn configure(&mut self, settings: EngineSettings);

    /// Root of the editable region
    fn body(&self) -> NodeId;

    fn dom(&self) -> &Dom;
    fn dom_mut(&mut self) -> &mut Dom;

    /// Serialized content of the editable region
    fn get_content(&self) -> String {
        self.dom().inner_html(self.body())
    }

    /// Replace the editable region's content with markup
    fn set_content(&mut self, html: &str) -> Result<(), EngineError>;

    fn selection(&self) -> Option<Selection>;
    fn set_selection(&mut self, selection: Selection);

    fn is_collapsed(&self) -> bool {
        self.selection().map_or(true, |s| s.is_collapsed())
    }

    /// Markup of the selected content
    fn selected_html(&mut self) -> Result<String, EngineError>;

    fn create_bookmark(&self) -> Option<Bookmark>;
    fn restore_bookmark(&mut self, bookmark: Bookmark);

    /// Suspend or resume undo level recording
    fn set_undo_tracking(&mut self, enabled: bool);

    /// Names of the formats active at the selection
    fn match_formats(&self, names: &[String]) -> Vec<String>;

    fn register_formatter(&mut self, name: &str, definition: FormatDefinition);

    fn add_shortcut(&mut self, shortcut: Shortcut, action: ShortcutAction);
    fn remove_shortcut(&mut self, shortcut: &Shortcut) -> Option<ShortcutAction>;
    fn match_shortcut(&self, event: &KeyEvent) -> Option<ShortcutAction>;

    fn exec_command(&mut self, command: EngineCommand) -> Result<(), EngineError>;

    fn has_focus(&self) -> bool;

    fn bounding_rect(&self, node: NodeId) -> Rect;
    fn range_rect(&self, range: Range) -> Rect;

    /// Rectangle of the field's (relatively positioned) container
    fn container_rect(&self) -> Rect;

    /// Scroll the nearest scroll container; `false` if there is none
    fn scroll_by(&mut self, delta: f64) -> bool;

    /// Notifications raised since the last call
    fn drain_notifications(&mut self) -> Vec<Notification> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_parse() {
        assert_eq!(Shortcut::parse("meta+y"), Some(Shortcut::primary('y')));
        assert_eq!(Shortcut::parse("ctrl+shift+Z"), Some(Shortcut::primary_shift('z')));
        assert_eq!(Shortcut::parse("access+d"), Some(Shortcut::access('d')));
        assert_eq!(Shortcut::parse("meta+"), None);
        assert_eq!(Shortcut::parse("meta+enter"), None);
    }

    #[test]
    fn test_shortcut_matches_exact_modifiers() {
        let undo = Shortcut::primary('z');

        assert!(undo.matches(&KeyEvent::char('z').with_primary()));
        assert!(!undo.matches(&KeyEvent::char('z').with_primary().with_shift()));
        assert!(!undo.matches(&KeyEvent::char('z')));
        assert!(Shortcut::access('x').matches(&KeyEvent::char('X').with_shift().with_alt()));
    }

    #[test]
    fn test_format_definition_matches_styles() {
        let mut dom = Dom::new();
        let span = dom.create_element("span");
        dom.set_attribute(span, "style", "color: red; font-weight:bold")
            .unwrap();

        let mut styles = BTreeMap::new();
        styles.insert("color".to_string(), "red".to_string());
        let red = FormatDefinition::inline_style(styles);

        assert!(red.matches(&dom, span));
        assert_eq!(red.style_attribute().as_deref(), Some("color: red"));

        dom.set_attribute(span, "style", "color: blue").unwrap();
        assert!(!red.matches(&dom, span));
        assert!(!FormatDefinition::inline(&["strong", "b"]).matches(&dom, span));
    }
}
