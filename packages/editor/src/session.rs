//! # Field Session State
//!
//! Everything a mounted field remembers between notifications.
//!
//! A session starts when the field mounts and is thrown away on unmount or
//! when the field's tag changes. It holds the last value the field emitted
//! (so a host echoing it back doesn't trigger a rewrite), the undo
//! checkpoint flags, transient paste state, and the tracked formats.

use crate::formats::FormatState;
use crate::tracker::{FocusPosition, TrackedSelection};
use crate::undo::UndoCheckpointPolicy;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSessionState {
    /// Last value emitted to, or written from, the host
    pub saved_content: Option<Value>,

    pub undo: UndoCheckpointPolicy,

    /// Plain text of the paste in flight
    pub pending_plain_text: Option<String>,

    /// The paste in flight only offered plain text; its HTML is ignored
    pub is_plain_text_paste: bool,

    pub formats: FormatState,
    pub focus_position: Option<FocusPosition>,

    /// Bumped on every tracked selection change
    pub selection_revision: u64,
}

impl FieldSessionState {
    pub fn new(initial: Option<Value>, field_is_empty: bool) -> Self {
        Self {
            saved_content: initial,
            undo: UndoCheckpointPolicy::new(field_is_empty),
            pending_plain_text: None,
            is_plain_text_paste: false,
            formats: FormatState::new(),
            focus_position: None,
            selection_revision: 0,
        }
    }

    /// Remember a value the field just produced
    pub fn record_emit(&mut self, value: Value) {
        self.saved_content = Some(value);
    }

    /// Whether an incoming value prop must be written into the DOM
    ///
    /// Values equal to the previous prop, or to what the field itself last
    /// emitted, are already on screen.
    pub fn needs_write_back(&self, incoming: Option<&Value>, previous: Option<&Value>) -> bool {
        incoming != previous && incoming != self.saved_content.as_ref()
    }

    pub fn begin_paste(&mut self, plain_text: Option<String>, is_plain_text_paste: bool) {
        self.pending_plain_text = plain_text;
        self.is_plain_text_paste = is_plain_text_paste;
    }

    pub fn apply_tracked(&mut self, tracked: TrackedSelection) {
        self.formats = tracked.formats;
        self.focus_position = Some(tracked.focus_position);
        self.selection_revision += 1;
    }

    pub fn last_change_was_persistent(&self) -> bool {
        self.undo.last_change_was_persistent()
    }
}
