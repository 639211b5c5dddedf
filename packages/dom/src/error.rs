use thiserror::Error;

use crate::NodeId;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("Node is not an element: {0:?}")]
    NotAnElement(NodeId),

    #[error("Node is not text: {0:?}")]
    NotText(NodeId),

    #[error("Offset {offset} out of bounds for {node:?} (length {len})")]
    InvalidOffset {
        node: NodeId,
        offset: usize,
        len: usize,
    },

    #[error("Would create cycle")]
    CycleDetected,
}

impl DomError {
    pub fn invalid_offset(node: NodeId, offset: usize, len: usize) -> Self {
        Self::InvalidOffset { node, offset, len }
    }
}
