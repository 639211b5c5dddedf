//! Error types for the editing surface

use thiserror::Error;

/// Failures reported by an [`EditableEngine`](crate::EditableEngine)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("DOM error: {0}")]
    Dom(#[from] richtext_dom::DomError),

    #[error("No selection in the editable region")]
    NoSelection,

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Command not supported: {0}")]
    Unsupported(String),
}

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("DOM error: {0}")]
    Dom(#[from] richtext_dom::DomError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}
