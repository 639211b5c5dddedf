//! # Richtext DOM
//!
//! The document side of the editing surface: an arena node tree with DOM
//! range semantics, a lenient HTML fragment parser and a compact serializer.
//!
//! ```text
//! markup ──tokenize──▶ tokens ──Parser──▶ Dom (arena) ──Serializer──▶ markup
//! ```
//!
//! The editor crate treats a [`Dom`] subtree as the live `contenteditable`
//! region and converts between it and the content model.

pub mod dom;
pub mod entities;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use dom::{byte_offset, is_void_element, Dom, NodeId, NodeKind, Position, Range};
pub use error::{DomError, DomResult};
pub use parser::{parse_html, Parser};
pub use serializer::Serializer;
pub use tokenizer::{tokenize, Token};
