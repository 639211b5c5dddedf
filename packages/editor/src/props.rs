//! Field properties and the host callbacks a field talks to

use crate::formats::default_formatting_controls;
use crate::normalizer::Block;
use crate::value::{Multiline, Value, ValueFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// Custom inline-style format registered with the engine on setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formatter {
    pub format: String,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
}

impl Formatter {
    pub fn inline_style(format: impl Into<String>, style: BTreeMap<String, String>) -> Self {
        Self {
            format: format.into(),
            style,
        }
    }
}

/// Everything the host configures a field with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldProps {
    pub value: Option<Value>,
    pub format: ValueFormat,
    pub multiline: Multiline,
    pub tag_name: String,

    /// Formats whose state is tracked
    pub formatting_controls: Vec<String>,
    pub formatters: Vec<Formatter>,

    /// Passed to `set_focused_element` when the field gains focus
    pub instance_id: String,

    pub is_selected: bool,
    pub is_viewport_small: bool,
    pub placeholder: Option<String>,
    pub keep_placeholder_on_focus: bool,
    pub can_use_unfiltered_markup: bool,

    /// Passed through to the engine
    pub engine_options: Map<String, JsonValue>,
}

impl Default for FieldProps {
    fn default() -> Self {
        Self {
            value: None,
            format: ValueFormat::default(),
            multiline: Multiline::default(),
            tag_name: "div".to_string(),
            formatting_controls: default_formatting_controls(),
            formatters: Vec::new(),
            instance_id: String::new(),
            is_selected: false,
            is_viewport_small: false,
            placeholder: None,
            keep_placeholder_on_focus: false,
            can_use_unfiltered_markup: false,
            engine_options: Map::new(),
        }
    }
}

impl FieldProps {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_multiline(mut self, tag: impl Into<String>) -> Self {
        self.multiline = Multiline::Tag(tag.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = id.into();
        self
    }
}

/// Which optional callbacks a host implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCapabilities {
    pub split: bool,
    pub merge: bool,
    pub replace: bool,
    pub remove: bool,
    pub undo: bool,
    pub redo: bool,
    pub focus: bool,
}

impl HostCapabilities {
    pub fn all() -> Self {
        Self {
            split: true,
            merge: true,
            replace: true,
            remove: true,
            undo: true,
            redo: true,
            focus: true,
        }
    }
}

/// Callbacks into the host editor
///
/// Optional callbacks are only invoked when [`HostCapabilities`] says the
/// host has them.
pub trait FieldHost {
    fn on_change(&mut self, value: Value);

    /// Record a checkpoint in the host's history
    fn create_undo_level(&mut self);

    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities::default()
    }

    /// Field split into `before` and `after`, with `blocks` between them
    fn on_split(&mut self, _before: Value, _after: Value, _blocks: Vec<Block>) {}

    fn on_merge(&mut self, _forward: bool) {}

    fn on_replace(&mut self, _blocks: Vec<Block>) {}

    fn on_remove(&mut self, _forward: bool) {}

    fn on_undo(&mut self) {}

    fn on_redo(&mut self) {}

    fn set_focused_element(&mut self, _instance_id: &str) {}
}
