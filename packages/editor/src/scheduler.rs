//! Deferred tasks
//!
//! Some host callbacks must not run while the engine is still inside the
//! event that triggered them (a split right after a paste, undo forwarded
//! from a key handler). They are queued here and run on the host's next
//! tick via `run_deferred`. The queue's token is tied to the field's
//! lifetime: once cancelled, queued and future tasks are dropped.

use crate::normalizer::Block;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    /// Split the field around the selection, inserting blocks
    Split(Vec<Block>),
    Replace(Vec<Block>),
    Undo,
    Redo,
}

#[derive(Debug, Default)]
pub struct DeferredQueue {
    token: CancellationToken,
    tasks: VecDeque<DeferredTask>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Returns false if the queue is already cancelled
    pub fn schedule(&mut self, task: DeferredTask) -> bool {
        if self.token.is_cancelled() {
            debug!(?task, "dropping task scheduled after cancellation");
            return false;
        }
        self.tasks.push_back(task);
        true
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Everything queued so far, in order; nothing once cancelled
    pub fn take_ready(&mut self) -> Vec<DeferredTask> {
        if self.token.is_cancelled() {
            self.tasks.clear();
            return Vec::new();
        }
        self.tasks.drain(..).collect()
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_in_order() {
        let mut queue = DeferredQueue::new();
        queue.schedule(DeferredTask::Undo);
        queue.schedule(DeferredTask::Redo);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take_ready(), vec![DeferredTask::Undo, DeferredTask::Redo]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_through_token() {
        let mut queue = DeferredQueue::new();
        let token = queue.token();
        queue.schedule(DeferredTask::Split(vec![]));

        token.cancel();

        assert!(queue.take_ready().is_empty());
        assert!(!queue.schedule(DeferredTask::Undo));
        assert!(queue.is_empty());
    }
}
