//! # Inline formats
//!
//! Default format table, per-format state reported to toolbars, and the
//! change requests toolbars send back.

use crate::engine::FormatDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Formats enabled when the host doesn't say otherwise
pub const DEFAULT_FORMATS: [&str; 5] = ["bold", "italic", "strikethrough", "link", "code"];

/// Extra key set while the link UI is open for a new link
pub const IS_ADDING: &str = "isAdding";

pub fn default_formatting_controls() -> Vec<String> {
    DEFAULT_FORMATS.iter().map(|f| f.to_string()).collect()
}

/// DOM representation of the default formats
pub fn default_definitions() -> BTreeMap<String, FormatDefinition> {
    [
        ("bold", FormatDefinition::inline(&["strong", "b"])),
        ("italic", FormatDefinition::inline(&["em", "i"])),
        ("strikethrough", FormatDefinition::inline(&["del", "s"])),
        ("link", FormatDefinition::inline(&["a"])),
        ("code", FormatDefinition::inline(&["code"])),
    ]
    .into_iter()
    .map(|(name, definition)| (name.to_string(), definition))
    .collect()
}

/// State of one format at the current selection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl FormatDescriptor {
    pub fn active() -> Self {
        Self {
            is_active: true,
            ..Self::default()
        }
    }

    /// Active link with its `href` and `target` (empty when missing)
    pub fn link(href: Option<&str>, target: Option<&str>) -> Self {
        Self {
            is_active: true,
            value: Some(href.unwrap_or_default().to_string()),
            target: Some(target.unwrap_or_default().to_string()),
            extra: BTreeMap::new(),
        }
    }

    pub fn is_adding(&self) -> bool {
        self.extra.get(IS_ADDING).is_some_and(|v| v == "true")
    }
}

/// Active formats keyed by name
pub type FormatState = BTreeMap<String, FormatDescriptor>;

/// Link change requested by a toolbar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkChange {
    /// The link UI opened; nothing is applied yet
    Adding,

    /// Create or update the link around the selection
    Set {
        href: String,
        target: Option<String>,
    },

    Remove,
}

/// Requested change for one format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatChange {
    Toggle(bool),
    Link(LinkChange),
}

impl FormatChange {
    /// Fold the change into the tracked state
    pub fn merge_into(&self, name: &str, state: &mut FormatState) {
        let descriptor = state.entry(name.to_string()).or_default();
        match self {
            FormatChange::Toggle(active) => descriptor.is_active = *active,
            FormatChange::Link(LinkChange::Adding) => {
                descriptor
                    .extra
                    .insert(IS_ADDING.to_string(), "true".to_string());
            }
            FormatChange::Link(LinkChange::Set { href, target }) => {
                descriptor.is_active = true;
                descriptor.value = Some(href.clone());
                descriptor.target = Some(target.clone().unwrap_or_default());
                descriptor.extra.remove(IS_ADDING);
            }
            FormatChange::Link(LinkChange::Remove) => {
                *descriptor = FormatDescriptor::default();
            }
        }
    }
}
