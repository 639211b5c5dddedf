//! # Richtext Editor
//!
//! Editing surface for one rich-text field: keeps an engine-owned DOM
//! region and an immutable content value in sync.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ engine: EditableEngine (DomEngine, browser) │
//! │  - owns the DOM region and the selection    │
//! │  - raises notifications                     │
//! └─────────────────────────────────────────────┘
//!                     ↓ Notification
//! ┌─────────────────────────────────────────────┐
//! │ EditingSurfaceController                    │
//! │  - FormatConverter        DOM ↔ Value       │
//! │  - SelectionAndFormatTracker                │
//! │  - UndoCheckpointPolicy                     │
//! │  - SplitMergeController                     │
//! │  - PasteClassifier + ContentNormalizer      │
//! └─────────────────────────────────────────────┘
//!                     ↓ callbacks
//! ┌─────────────────────────────────────────────┐
//! │ host: FieldHost (block editor)              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Values are replaced, never patched**: every emit is a fresh value
//! 2. **No echo writes**: a value the field just emitted is never written back
//! 3. **The sentinel stays in the DOM**: no value handed out contains it
//! 4. **Split restores first**: the host never sees engine-side edits of a split
//!
//! ## Usage
//!
//! ```rust,ignore
//! use richtext_editor::{DomEngine, EditingSurfaceController, FieldProps, Notification};
//!
//! let props = FieldProps::new("p").with_value(value);
//! let mut field = EditingSurfaceController::new(DomEngine::new(), host, props);
//! field.mount()?;
//!
//! field.engine_mut().type_text("hello")?;
//! field.pump();          // forwards Input / ContentSettled to the host
//! field.run_deferred();  // next tick: deferred splits, undo/redo
//! ```

mod announce;
mod boundary;
mod config;
mod controller;
mod converter;
mod dom_engine;
mod engine;
mod errors;
mod formats;
mod normalizer;
mod notification;
mod paste;
mod props;
mod scheduler;
mod session;
mod split_merge;
mod tracker;
mod undo;
mod undo_stack;
mod value;

pub use announce::{result_count_message, Announcer};
pub use boundary::ZeroWidthBoundaryHandler;
pub use config::{EngineSettings, SurfaceConfig, ToolbarOffset, DEFAULT_SENTINEL};
pub use controller::EditingSurfaceController;
pub use converter::{render_nodes, FormatConverter};
pub use dom_engine::{is_block_element, DomEngine, Layout};
pub use engine::{
    Bookmark, EditableEngine, EngineCommand, FieldShortcut, FormatDefinition, Rect, Selection,
    Shortcut, ShortcutAction,
};
pub use errors::{EngineError, SurfaceError};
pub use formats::{
    default_formatting_controls, FormatChange, FormatDescriptor, FormatState, LinkChange,
    DEFAULT_FORMATS,
};
pub use normalizer::{
    plain_text_to_html, BasicNormalizer, Block, ContentNormalizer, NormalizeRequest, Normalized,
    PasteMode,
};
pub use notification::{ChangeOrigin, EventResponse, Key, KeyEvent, Notification};
pub use paste::{BlobRegistry, BlockRoute, ClipboardFile, PasteClassifier, PasteOutcome, PastePayload};
pub use props::{FieldHost, FieldProps, Formatter, HostCapabilities};
pub use scheduler::{CancellationToken, DeferredQueue, DeferredTask};
pub use session::FieldSessionState;
pub use split_merge::{EnterAction, SplitMergeController, SplitParts};
pub use tracker::{FocusPosition, SelectionAndFormatTracker, TrackedSelection};
pub use undo::{CheckpointDecision, UndoCheckpointPolicy};
pub use undo_stack::{LevelAdded, UndoStack};
pub use value::{Multiline, Node, Value, ValueFormat};

// Re-export the DOM types engines and hosts work with
pub use richtext_dom::{Dom, NodeId, Position, Range};
