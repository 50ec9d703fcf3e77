#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # h5gate-ir
//!
//! In-memory representation of a container file under construction.
//!
//! Every group or dataset created through a build session becomes a [`Node`]
//! stored in a [`Document`] arena. Nodes reference each other through
//! [`NodeId`] handles, and every node owns exactly one full path that is
//! unique across the document.

/// Node arena with the path registry and top-level node list.
pub mod document;
/// Schema provenance, quantities and link records attached to nodes.
pub mod metadata;
/// Core node model.
pub mod node;
/// Path helpers for the `/`-separated container hierarchy.
pub mod path;
/// Depth-first visitors over the node tree.
pub mod traversal;
/// Data values plus element type and shape inference.
pub mod value;

pub use document::Document;
pub use metadata::{
    ConditionalClause, DeclaredAttribute, Exclusion, LinkRecord, LinkTarget, MemberStat, Quantity,
    SchemaRef,
};
pub use node::{DatasetInfo, Node, NodeId, NodeKind};
pub use traversal::{Traversal, walk, walk_all};
pub use value::{DataType, Shape, Value};

use thiserror::Error;

/// Errors that can occur when working with the IR
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Node not found at path: {path}")]
    NodeNotFound { path: String },

    #[error("Duplicate node path: {path}")]
    DuplicatePath { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

impl Error {
    /// Build a node-not-found error with path context.
    pub fn node_not_found(path: impl Into<String>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    /// Build a duplicate-path error.
    pub fn duplicate_path(path: impl Into<String>) -> Self {
        Self::DuplicatePath { path: path.into() }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Crate-local result type for IR operations.
pub type Result<T> = std::result::Result<T, Error>;
