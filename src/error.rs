use thiserror::Error;

use crate::types::Key;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("safe boundary regressed from {previous} to {current}")]
    BoundaryRegression { previous: usize, current: usize },
    #[error("stream is finalized; call reset() to start a new session")]
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("no node at key {0}")]
    MissingNode(Key),
    #[error("insert index {index} is out of range under {parent} ({len} children)")]
    InsertOutOfRange { parent: Key, index: usize, len: usize },
    #[error("node at key {0} carries no text")]
    NotText(Key),
    #[error("the root cannot be removed or replaced")]
    RootTarget,
}
