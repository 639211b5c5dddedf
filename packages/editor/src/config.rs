//! # Configuration
//!
//! [`SurfaceConfig`] carries the tunables of the editing surface itself;
//! [`EngineSettings`] is what gets handed to the embedded engine.
//! Both deserialize from JSON with every field optional.

use crate::errors::SurfaceError;
use crate::value::Multiline;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Caret placeholder the engine inserts at inline boundaries
pub const DEFAULT_SENTINEL: char = '\u{feff}';

/// Offset applied below/right of the caret rectangle for toolbars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolbarOffset {
    pub top: f64,
    pub left: f64,
}

impl Default for ToolbarOffset {
    fn default() -> Self {
        Self {
            top: 10.0,
            left: 0.0,
        }
    }
}

/// Surface-level tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Zero-width caret anchor character
    pub sentinel: char,

    /// Attributes with this prefix are engine bookkeeping
    pub bookkeeping_prefix: String,

    /// Bookkeeping attribute marking synthetic nodes (`"all"` = drop, else unwrap)
    pub synthetic_attribute: String,

    pub toolbar_offset: ToolbarOffset,

    /// Distance from the viewport top the caret is scrolled to
    pub scroll_grace_offset: f64,

    /// Scroll deltas at or below this are ignored
    pub scroll_epsilon: f64,

    /// Quiet period before an accessibility announcement is spoken
    pub announce_debounce_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL,
            bookkeeping_prefix: "data-mce-".to_string(),
            synthetic_attribute: "data-mce-bogus".to_string(),
            toolbar_offset: ToolbarOffset::default(),
            scroll_grace_offset: 100.0,
            scroll_epsilon: 10.0,
            announce_debounce_ms: 500,
        }
    }
}

impl SurfaceConfig {
    pub fn from_json(source: &str) -> Result<Self, SurfaceError> {
        Ok(serde_json::from_str(source)?)
    }
}

/// Settings passed to the engine on setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineSettings {
    /// Host-provided engine options, passed through untouched
    #[serde(flatten)]
    pub options: Map<String, JsonValue>,

    /// Block tag every line is wrapped in (`None` = no forced wrapping)
    pub forced_root_block: Option<String>,

    /// Engine-side undo history depth
    pub custom_undo_redo_levels: usize,
}

impl EngineSettings {
    /// Merge host options with the two fixed policies: root-block wrapping
    /// follows the multiline tag, and the engine keeps a single undo level
    /// (just enough to compare changes; the host owns real history)
    pub fn build(options: Map<String, JsonValue>, multiline: &Multiline) -> Self {
        let mut options = options;
        options.remove("forced_root_block");
        options.remove("custom_undo_redo_levels");

        Self {
            options,
            forced_root_block: multiline.tag().map(str::to_string),
            custom_undo_redo_levels: 1,
        }
    }
}
