//! Debounced screen-reader announcements
//!
//! A new announcement replaces a pending one and restarts the quiet
//! period, so a burst of result-count updates is spoken once.

use std::time::{Duration, Instant};
use tracing::trace;

/// Result-count message, pluralized
pub fn result_count_message(count: usize) -> String {
    match count {
        1 => "1 result found.".to_string(),
        n => format!("{} results found.", n),
    }
}

#[derive(Debug, Clone)]
pub struct Announcer {
    debounce: Duration,
    pending: Option<(String, Instant)>,
}

impl Announcer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn announce(&mut self, message: impl Into<String>, now: Instant) {
        let message = message.into();
        trace!(message = %message, "announcement queued");
        self.pending = Some((message, now + self.debounce));
    }

    /// The pending message, once its quiet period has passed
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, due)) if now >= *due => self.pending.take().map(|(message, _)| message),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
