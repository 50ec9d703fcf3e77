#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # h5gate-engine
//!
//! Construction sessions: create groups and datasets against a loaded
//! specification, track what was created against what the schema requires,
//! and validate the result when the session is closed.
//!
//! ## Example Usage
//!
//! ```rust
//! use h5gate_engine::{DatasetRequest, Session, SessionOptions};
//! use serde_json::json;
//!
//! let spec = json!({
//!     "core": {
//!         "structures": {"count": {"data_type": "int"}},
//!         "locations": {"/": ["count!"]}
//!     }
//! });
//! let mut session = Session::open(&[spec], &[], "core", SessionOptions::default()).unwrap();
//! session.set_dataset(DatasetRequest::new("count", 5)).unwrap();
//!
//! let report = session.close().unwrap();
//! assert!(report.missing().is_empty());
//! ```

pub mod config;
mod construct;
pub mod link;
pub mod request;
pub mod session;

pub use config::{BackendKind, LinkStyle, RequiredPolicy, SessionOptions};
pub use link::DataArg;
pub use request::{DatasetRequest, GroupRequest};
pub use session::{ConstructionWarning, Session};

use h5gate_ir::NodeId;
use h5gate_storage::BackendError;
use h5gate_validation::ValidationReport;
use thiserror::Error;

/// Errors raised by a construction session
#[derive(Error, Debug)]
pub enum Error {
    #[error("Specification error: {0}")]
    Specification(String),

    #[error("Unknown identifier '{identifier}' in namespace '{namespace}': {reason}")]
    UnknownIdentifier {
        namespace: String,
        identifier: String,
        reason: String,
    },

    #[error("'{identifier}' may be created at {}; pass an explicit path", locations.join(", "))]
    AmbiguousPlacement {
        identifier: String,
        locations: Vec<String>,
    },

    #[error("Naming error for '{identifier}': {reason}")]
    Naming { identifier: String, reason: String },

    #[error("Duplicate path: {path}")]
    DuplicatePath { path: String },

    #[error("Merge conflict on '{key}' between {first} and {second}: {detail}")]
    MergeConflict {
        key: String,
        first: String,
        second: String,
        detail: String,
    },

    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("'{identifier}' cannot be created at '{path}' (allowed: {})", allowed.join(", "))]
    InvalidPlacement {
        identifier: String,
        path: String,
        allowed: Vec<String>,
    },

    #[error("Link target not found: {path}")]
    LinkTargetNotFound { path: String },

    #[error("Invalid link at '{path}': {reason}")]
    InvalidLink { path: String, reason: String },

    #[error("Unknown node {node}")]
    UnknownNode { node: NodeId },

    #[error("Validation failed with {} finding(s)", .0.len())]
    Validation(Box<ValidationReport>),
}

impl Error {
    /// Build an unknown-identifier error.
    pub fn unknown(
        namespace: impl Into<String>,
        identifier: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnknownIdentifier {
            namespace: namespace.into(),
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Build a naming error.
    pub fn naming(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Naming {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Build a duplicate-path error.
    pub fn duplicate_path(path: impl Into<String>) -> Self {
        Self::DuplicatePath { path: path.into() }
    }

    /// Build a type mismatch error.
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Build an invalid-placement error.
    pub fn invalid_placement(
        identifier: impl Into<String>,
        path: impl Into<String>,
        allowed: Vec<String>,
    ) -> Self {
        Self::InvalidPlacement {
            identifier: identifier.into(),
            path: path.into(),
            allowed,
        }
    }

    /// Build an invalid-link error.
    pub fn invalid_link(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLink {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<h5gate_schema::Error> for Error {
    fn from(e: h5gate_schema::Error) -> Self {
        match e {
            h5gate_schema::Error::UnknownIdentifier {
                namespace,
                identifier,
                reason,
            } => Error::UnknownIdentifier {
                namespace,
                identifier,
                reason,
            },
            h5gate_schema::Error::MergeConflict {
                key,
                first,
                second,
                detail,
            } => Error::MergeConflict {
                key,
                first,
                second,
                detail,
            },
            h5gate_schema::Error::Specification(message) | h5gate_schema::Error::Parse(message) => {
                Error::Specification(message)
            }
            h5gate_schema::Error::Io(e) => Error::Specification(e.to_string()),
        }
    }
}

impl From<h5gate_ir::Error> for Error {
    fn from(e: h5gate_ir::Error) -> Self {
        match e {
            h5gate_ir::Error::DuplicatePath { path } => Error::DuplicatePath { path },
            h5gate_ir::Error::NodeNotFound { path } => Error::LinkTargetNotFound { path },
            h5gate_ir::Error::InvalidPath { path, .. } => Error::InvalidPlacement {
                identifier: String::new(),
                path,
                allowed: Vec::new(),
            },
            h5gate_ir::Error::TypeMismatch { expected, found } => Error::TypeMismatch {
                path: String::new(),
                expected,
                found,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
