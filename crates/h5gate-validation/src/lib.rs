#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # h5gate-validation
//!
//! Read-only compliance pass over a finished build session.
//!
//! The engine walks the per-namespace lookup tables and the node tree and
//! reports missing required members, custom nodes and attributes, violated
//! conditional clauses, excluded members that are present and inconsistent
//! dimension references. It never mutates the document and never fails the
//! build; the caller decides what to do with the report.
//!
//! ## Example Usage
//!
//! ```rust
//! use h5gate_ir::{Document, Node, SchemaRef, NodeKind};
//! use h5gate_validation::ValidationEngine;
//! use std::collections::BTreeMap;
//!
//! let mut doc = Document::new();
//! doc.insert(Node::new("", "/", "", SchemaRef::new("core", "/", NodeKind::Group)), None).unwrap();
//!
//! let report = ValidationEngine::new().validate(&doc, &BTreeMap::new(), &[]);
//! assert!(report.is_clean());
//! ```

pub mod engine;
pub mod reporter;
pub mod rules;

pub use engine::{CustomAttribute, RESERVED_ATTRIBUTES, ValidationEngine};
pub use reporter::{IssueKind, Severity, ValidationIssue, ValidationReport};
pub use rules::{
    Condition, RuleResult, check_dimension_references, validate_conditional, validate_data_type,
    validate_declared_dimensions,
};

use thiserror::Error;

/// Errors that can occur while evaluating validation rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid condition '{clause}': {reason}")]
    InvalidCondition { clause: String, reason: String },
}

impl Error {
    /// Build an invalid-condition error.
    pub fn invalid_condition(clause: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCondition {
            clause: clause.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
