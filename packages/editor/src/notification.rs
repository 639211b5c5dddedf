//! Engine notifications and the response the surface gives back

use crate::engine::{EngineCommand, FieldShortcut};
use crate::paste::PastePayload;
use serde::{Deserialize, Serialize};

/// Keys the surface reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Backspace,
    Delete,
    Enter,
    Left,
    Right,
    Up,
    Down,
    Tab,
    Escape,
    Char(char),
}

/// Keyboard event with modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    /// Ctrl, or Cmd on macOS
    #[serde(default)]
    pub primary: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            shift: false,
            alt: false,
            primary: false,
        }
    }

    pub fn char(c: char) -> Self {
        Self::new(Key::Char(c))
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// What triggered an undo level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOrigin {
    Input,
    Command,
    Blur,
}

/// Everything an engine reports to the surface
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Engine finished setting up
    Init,

    Focus,
    FocusOut,

    /// Content changed through typing
    Input,

    /// An undo level was recorded
    ContentSettled {
        /// No previous level existed
        initial_level: bool,
        origin: ChangeOrigin,
    },

    /// Selection or caret moved
    NodeChange,

    KeyDown(KeyEvent),
    KeyUp(KeyEvent),

    /// The engine created a new root block
    NewBlock,

    /// A command is about to run
    BeforeExecCommand(EngineCommand),

    /// Raw clipboard payload
    Paste(PastePayload),

    /// Markup the engine is about to insert for a paste
    PastePreProcess { content: String },

    /// A field-level shortcut fired
    Shortcut(FieldShortcut),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Init => "init",
            Notification::Focus => "focus",
            Notification::FocusOut => "focusout",
            Notification::Input => "input",
            Notification::ContentSettled { .. } => "change",
            Notification::NodeChange => "nodechange",
            Notification::KeyDown(_) => "keydown",
            Notification::KeyUp(_) => "keyup",
            Notification::NewBlock => "newblock",
            Notification::BeforeExecCommand(_) => "beforeexeccommand",
            Notification::Paste(_) => "paste",
            Notification::PastePreProcess { .. } => "pastepreprocess",
            Notification::Shortcut(_) => "shortcut",
        }
    }
}

/// How the engine should continue after a notification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventResponse {
    /// Skip the engine's default action
    pub prevent_default: bool,

    /// Don't let other handlers see the event
    pub stop_propagation: bool,

    /// Replacement paste content for the engine to insert
    pub content: Option<String>,
}

impl EventResponse {
    /// Let the engine carry on
    pub fn proceed() -> Self {
        Self::default()
    }

    pub fn prevented() -> Self {
        Self {
            prevent_default: true,
            ..Self::default()
        }
    }

    /// Default prevented and propagation stopped
    pub fn consumed() -> Self {
        Self {
            prevent_default: true,
            stop_propagation: true,
            content: None,
        }
    }

    pub fn stopped() -> Self {
        Self {
            stop_propagation: true,
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}
