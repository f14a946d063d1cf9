//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use crate::graph::EdgeType;
use crate::tree::NodeRef;
use thiserror::Error;

/// Errors that can occur while reading an activation trace
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to read trace file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid trace format: {0}")]
    InvalidFormat(String),
}

/// A trace that cannot be turned into a call tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Malformed trace: activation {activation} references unseen parent {parent}")]
    UnknownParent { activation: u64, parent: u64 },

    #[error("Malformed trace: activation {activation} is at level {level} but the deepest open call is at level {deepest}")]
    LevelGap {
        activation: u64,
        level: usize,
        deepest: usize,
    },

    #[error("Malformed trace: activation {activation} descends from {parent}, but the call open at its level is {caller}")]
    NotNestedUnderCaller {
        activation: u64,
        parent: u64,
        caller: u64,
    },
}

/// Internal-consistency faults raised while walking or exporting a tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error(transparent)]
    Build(#[from] TreeError),

    #[error("Graph node {node} reached export with a zero count")]
    ZeroCount { node: usize },

    #[error("Traversal ended with unresolved delegated edges: {kinds:?}")]
    UnresolvedDelegation { kinds: Vec<EdgeType> },

    #[error("A delegated {kind} edge is already pending")]
    DelegationConflict { kind: EdgeType },

    #[error("Mixed node {0:?} was visited before its results were mixed")]
    UnmixedNode(NodeRef),

    #[error("Empty tree element found below the root at {0:?}")]
    UnexpectedEmpty(NodeRef),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Report schema {found} is not compatible with {expected}")]
    IncompatibleVersion { found: String, expected: String },
}
