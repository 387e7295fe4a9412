//! Failure causes reported by the `try_` operations.
//!
//! The default operations never surface these: a failed write is a no-op and
//! a failed read returns the caller's default.

use thiserror::Error;

use crate::node::{NodeId, NodeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("tree has no usable buffer")]
    Inert,
    #[error("cursor is detached")]
    Detached,
    #[error("cursor path exceeds the segment or key byte budget")]
    Overflow,
    #[error("cursor was resolved before the last collection")]
    Stale,
    #[error("path not found")]
    NotFound,
    #[error("expected {expected}, found {found}")]
    TypeConflict { expected: NodeType, found: NodeType },
    #[error("{0} is not a container")]
    NotContainer(NodeType),
    #[error("the root must stay an object")]
    RootIsObject,
    #[error("node {0} has been removed")]
    Tombstoned(NodeId),
    #[error("node table exhausted")]
    NodeTableFull,
    #[error("string pool exhausted")]
    StringPoolFull,
}

pub type Result<T> = std::result::Result<T, Error>;
