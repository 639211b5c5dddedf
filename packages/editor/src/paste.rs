//! # Paste classification
//!
//! A paste arrives in two steps. The raw clipboard event comes first and
//! only image files are handled there; everything else is recorded and
//! waits for the engine's pre-processing step, where the pasted markup is
//! either turned into a link over the selection or normalized into inline
//! content or blocks.
//!
//! The classifier only decides. The surface controller carries out the
//! decisions against the host and the engine.

use crate::normalizer::{Block, Normalized, PasteMode};
use crate::props::HostCapabilities;
use once_cell::sync::Lazy;
use regex::Regex;
use richtext_dom::entities::decode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

static IMAGE_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^image/(?:jpe?g|png|gif)$").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:https?:)?//\S+$").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardFile {
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub data: Vec<u8>,
}

impl ClipboardFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Raw clipboard contents
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PastePayload {
    pub html: Option<String>,
    pub plain_text: Option<String>,
    #[serde(default)]
    pub files: Vec<ClipboardFile>,
    /// Clipboard data types, in clipboard order
    #[serde(default)]
    pub types: Vec<String>,
}

impl PastePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        if !self.types.iter().any(|t| t == "text/html") {
            self.types.push("text/html".into());
        }
        self
    }

    pub fn with_plain_text(mut self, text: impl Into<String>) -> Self {
        self.plain_text = Some(text.into());
        if !self.types.iter().any(|t| t == "text/plain") {
            self.types.push("text/plain".into());
        }
        self
    }

    pub fn with_file(mut self, file: ClipboardFile) -> Self {
        if !self.types.iter().any(|t| t == "Files") {
            self.types.push("Files".into());
        }
        self.files.push(file);
        self
    }

    pub fn html(&self) -> &str {
        self.html.as_deref().unwrap_or("")
    }

    pub fn plain_text(&self) -> &str {
        self.plain_text.as_deref().unwrap_or("")
    }

    /// Only plain text on the clipboard
    pub fn is_plain_text_only(&self) -> bool {
        self.types.len() == 1 && self.types[0] == "text/plain"
    }
}

/// Object URLs handed out for pasted files. Revoked when the field unmounts.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    next_id: usize,
    entries: BTreeMap<String, ClipboardFile>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, file: ClipboardFile) -> String {
        self.next_id += 1;
        let url = format!("blob:richtext/{}", self.next_id);
        self.entries.insert(url.clone(), file);
        url
    }

    pub fn get(&self, url: &str) -> Option<&ClipboardFile> {
        self.entries.get(url)
    }

    pub fn revoke(&mut self, url: &str) -> bool {
        self.entries.remove(url).is_some()
    }

    pub fn revoke_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where blocks from a paste go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRoute {
    /// The field is empty: blocks replace it
    Replace,
    /// Split the field around the selection and insert between
    Split,
    /// Nobody takes blocks
    Unhandled,
}

/// What to do with the normalized pre-processed paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    /// Engine inserts this markup
    Insert(String),
    /// No split handler: leave the engine's default paste alone
    Passthrough,
    /// Blocks came back empty; swallow the paste
    Discard,
    Replace(Vec<Block>),
    Split(Vec<Block>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PasteClassifier;

impl PasteClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn is_image_type(&self, mime_type: &str) -> bool {
        IMAGE_TYPE.is_match(mime_type)
    }

    /// The single pasted image, if there is exactly one and no markup
    pub fn image_file<'a>(&self, payload: &'a PastePayload) -> Option<&'a ClipboardFile> {
        if !payload.html().is_empty() {
            return None;
        }

        let mut images = payload
            .files
            .iter()
            .filter(|file| self.is_image_type(&file.mime_type));
        let first = images.next()?;
        if images.next().is_some() {
            debug!(files = payload.files.len(), "several images pasted, not treating as image paste");
            return None;
        }
        Some(first)
    }

    /// Text with markup tags removed and surrounding whitespace trimmed
    pub fn strip_tags(&self, html: &str) -> String {
        TAG.replace_all(html, "").trim().to_string()
    }

    pub fn is_link(&self, text: &str) -> bool {
        LINK.is_match(text)
    }

    /// Link target when a URL is pasted over a selection that isn't one
    pub fn link_over_selection(&self, pasted: &str, selected_html: &str) -> Option<String> {
        let pasted = self.strip_tags(pasted);
        let selected = self.strip_tags(selected_html);

        if self.is_link(&pasted) && !self.is_link(&selected) {
            Some(decode(&pasted))
        } else {
            None
        }
    }

    pub fn mode(&self, field_is_empty: bool, capabilities: &HostCapabilities) -> PasteMode {
        if field_is_empty && capabilities.replace {
            PasteMode::Blocks
        } else if capabilities.split {
            PasteMode::Auto
        } else {
            PasteMode::Inline
        }
    }

    pub fn block_route(&self, field_is_empty: bool, capabilities: &HostCapabilities) -> BlockRoute {
        if field_is_empty && capabilities.replace {
            BlockRoute::Replace
        } else if capabilities.split {
            BlockRoute::Split
        } else {
            BlockRoute::Unhandled
        }
    }

    pub fn outcome(
        &self,
        normalized: Normalized,
        field_is_empty: bool,
        capabilities: &HostCapabilities,
    ) -> PasteOutcome {
        match normalized {
            Normalized::Inline(content) => PasteOutcome::Insert(content),
            Normalized::Blocks(_) if !capabilities.split => PasteOutcome::Passthrough,
            Normalized::Blocks(blocks) if blocks.is_empty() => PasteOutcome::Discard,
            Normalized::Blocks(blocks) => match self.block_route(field_is_empty, capabilities) {
                BlockRoute::Replace => PasteOutcome::Replace(blocks),
                _ => PasteOutcome::Split(blocks),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(split: bool, replace: bool) -> HostCapabilities {
        HostCapabilities {
            split,
            replace,
            ..HostCapabilities::default()
        }
    }

    #[test]
    fn test_image_types() {
        let classifier = PasteClassifier::new();

        assert!(classifier.is_image_type("image/png"));
        assert!(classifier.is_image_type("image/jpg"));
        assert!(classifier.is_image_type("image/jpeg"));
        assert!(classifier.is_image_type("image/gif"));
        assert!(!classifier.is_image_type("image/svg+xml"));
        assert!(!classifier.is_image_type("text/image/png"));
    }

    #[test]
    fn test_image_file_requires_single_image_without_html() {
        let classifier = PasteClassifier::new();
        let png = ClipboardFile::new("a.png", "image/png", vec![1, 2, 3]);

        let single = PastePayload::new().with_file(png.clone());
        assert_eq!(classifier.image_file(&single), Some(&png));

        let with_html = single.clone().with_html("<img src=\"x\">");
        assert_eq!(classifier.image_file(&with_html), None);

        let two = single.with_file(ClipboardFile::new("b.gif", "image/gif", vec![]));
        assert_eq!(classifier.image_file(&two), None);

        let text = PastePayload::new().with_file(ClipboardFile::new("a.txt", "text/plain", vec![]));
        assert_eq!(classifier.image_file(&text), None);
    }

    #[test]
    fn test_plain_text_only() {
        assert!(PastePayload::new().with_plain_text("x").is_plain_text_only());
        assert!(!PastePayload::new()
            .with_plain_text("x")
            .with_html("<b>x</b>")
            .is_plain_text_only());
        assert!(!PastePayload::new().is_plain_text_only());
    }

    #[test]
    fn test_link_over_selection() {
        let classifier = PasteClassifier::new();

        assert_eq!(
            classifier.link_over_selection("https://example.org", "click here"),
            Some("https://example.org".into())
        );
        assert_eq!(
            classifier.link_over_selection("<span> //example.org/a?b=1&amp;c=2 </span>", "<em>text</em>"),
            Some("//example.org/a?b=1&c=2".into())
        );
        assert_eq!(classifier.link_over_selection("HTTP://EXAMPLE.ORG", "x"), Some("HTTP://EXAMPLE.ORG".into()));
        // Pasting a URL over a URL keeps the engine's default paste
        assert_eq!(
            classifier.link_over_selection("https://a.example", "https://b.example"),
            None
        );
        assert_eq!(classifier.link_over_selection("not a link", "x"), None);
        assert_eq!(classifier.link_over_selection("https://a.example b", "x"), None);
    }

    #[test]
    fn test_mode() {
        let classifier = PasteClassifier::new();

        assert_eq!(classifier.mode(true, &capabilities(true, true)), PasteMode::Blocks);
        assert_eq!(classifier.mode(false, &capabilities(true, true)), PasteMode::Auto);
        assert_eq!(classifier.mode(true, &capabilities(false, false)), PasteMode::Inline);
        assert_eq!(classifier.mode(false, &capabilities(false, true)), PasteMode::Inline);
    }

    #[test]
    fn test_outcome() {
        let classifier = PasteClassifier::new();
        let blocks = vec![Block::new("core/paragraph").with_attribute("content", "A")];

        assert_eq!(
            classifier.outcome(Normalized::Inline("x".into()), false, &capabilities(true, false)),
            PasteOutcome::Insert("x".into())
        );
        assert_eq!(
            classifier.outcome(Normalized::Blocks(blocks.clone()), false, &capabilities(false, true)),
            PasteOutcome::Passthrough
        );
        assert_eq!(
            classifier.outcome(Normalized::Blocks(vec![]), false, &capabilities(true, false)),
            PasteOutcome::Discard
        );
        assert_eq!(
            classifier.outcome(Normalized::Blocks(blocks.clone()), true, &capabilities(true, true)),
            PasteOutcome::Replace(blocks.clone())
        );
        assert_eq!(
            classifier.outcome(Normalized::Blocks(blocks.clone()), false, &capabilities(true, true)),
            PasteOutcome::Split(blocks)
        );
    }

    #[test]
    fn test_blob_registry() {
        let mut blobs = BlobRegistry::new();
        let first = blobs.create(ClipboardFile::new("a.png", "image/png", vec![]));
        let second = blobs.create(ClipboardFile::new("b.png", "image/png", vec![]));

        assert_eq!(first, "blob:richtext/1");
        assert_ne!(first, second);
        assert_eq!(blobs.get(&first).map(|f| f.name.as_str()), Some("a.png"));
        assert!(blobs.revoke(&first));
        assert!(!blobs.revoke(&first));
        assert_eq!(blobs.revoke_all(), 1);
        assert!(blobs.is_empty());
    }
}
