//! # Undo checkpoints
//!
//! The engine keeps a single level of its own history and reports each new
//! level as a content-settled notification. This policy turns those into
//! checkpoints in the host's history:
//!
//! - the first notification of a freshly mounted empty field is the engine
//!   recording its first keystroke, and is skipped (as is any notification
//!   the engine marks as its initial level)
//! - otherwise the content is re-synced first, because formatting commands
//!   change the DOM without an input event; a blur already synced it
//! - then a checkpoint is always requested

use crate::notification::ChangeOrigin;
use tracing::trace;

/// What to do for one content-settled notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointDecision {
    Skip,
    Checkpoint {
        /// Emit the current content before checkpointing
        resync: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoCheckpointPolicy {
    last_change_was_persistent: bool,
    last_level_was_initial: bool,
}

impl UndoCheckpointPolicy {
    /// Policy for a newly mounted field
    pub fn new(field_is_empty: bool) -> Self {
        Self {
            last_change_was_persistent: true,
            last_level_was_initial: field_is_empty,
        }
    }

    pub fn last_change_was_persistent(&self) -> bool {
        self.last_change_was_persistent
    }

    pub fn last_level_was_initial(&self) -> bool {
        self.last_level_was_initial
    }

    /// Typing makes the latest change transient until the next checkpoint
    pub fn on_input(&mut self) {
        self.last_change_was_persistent = false;
    }

    pub fn on_content_settled(&mut self, initial_level: bool, origin: ChangeOrigin) -> CheckpointDecision {
        if initial_level || self.last_level_was_initial {
            self.last_level_was_initial = false;
            trace!(initial_level, "skipping initial undo level");
            return CheckpointDecision::Skip;
        }

        self.last_change_was_persistent = true;
        CheckpointDecision::Checkpoint {
            resync: origin != ChangeOrigin::Blur,
        }
    }

    /// An explicit checkpoint (split, merge) outside the notification flow
    pub fn on_explicit_checkpoint(&mut self) {
        self.last_level_was_initial = false;
        self.last_change_was_persistent = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_first_level_of_empty_field() {
        let mut policy = UndoCheckpointPolicy::new(true);

        assert_eq!(
            policy.on_content_settled(false, ChangeOrigin::Input),
            CheckpointDecision::Skip
        );
        assert_eq!(
            policy.on_content_settled(false, ChangeOrigin::Input),
            CheckpointDecision::Checkpoint { resync: true }
        );
    }

    #[test]
    fn test_engine_initial_sentinel_skips() {
        let mut policy = UndoCheckpointPolicy::new(false);

        assert_eq!(
            policy.on_content_settled(true, ChangeOrigin::Command),
            CheckpointDecision::Skip
        );
        assert_eq!(
            policy.on_content_settled(false, ChangeOrigin::Command),
            CheckpointDecision::Checkpoint { resync: true }
        );
    }

    #[test]
    fn test_blur_checkpoints_without_resync() {
        let mut policy = UndoCheckpointPolicy::new(false);

        assert_eq!(
            policy.on_content_settled(false, ChangeOrigin::Blur),
            CheckpointDecision::Checkpoint { resync: false }
        );
    }

    #[test]
    fn test_persistence_flag() {
        let mut policy = UndoCheckpointPolicy::new(false);
        assert!(policy.last_change_was_persistent());

        policy.on_input();
        assert!(!policy.last_change_was_persistent());

        policy.on_content_settled(false, ChangeOrigin::Input);
        assert!(policy.last_change_was_persistent());
    }

    #[test]
    fn test_skip_is_not_reapplied() {
        let mut policy = UndoCheckpointPolicy::new(true);
        policy.on_explicit_checkpoint();

        assert!(!policy.last_level_was_initial());
        assert!(matches!(
            policy.on_content_settled(false, ChangeOrigin::Input),
            CheckpointDecision::Checkpoint { .. }
        ));
    }
}
