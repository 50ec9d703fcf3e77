//! # h5gate-schema
//!
//! Structure model, specification loader and merge/include resolution.
//!
//! A specification is a set of namespaces. Each namespace declares
//! structures (group and dataset definitions) and locations (which
//! structures may be created under which container paths). Structures
//! extend each other through `merge` and compose each other through
//! `include`; [`Resolver`] flattens both into a [`ResolvedStructure`].

pub mod inheritance;
pub mod loader;
pub mod lookup;
pub mod model;
pub mod registry;

pub use inheritance::{
    DescriptionEntry, Expansion, MemberSource, MergeMode, ResolvedMember, ResolvedStructure,
    Resolver,
};
pub use loader::SchemaLoader;
pub use lookup::{LookupEntry, LookupTable};
pub use model::{
    AttributeDef, CUSTOM_MARKER, ConditionDef, DatasetDef, DeclaredType, ExclusionDef, GroupDef,
    IncludeDef, LinkSpec, LocationMember, MemberDef, Namespace, NamespaceInfo, Naming, Structure,
    StructureCommon, StructureDef, StructureId, value_from_json,
};
pub use registry::SchemaRegistry;

pub use h5gate_ir::{NodeKind, Quantity};

use thiserror::Error;

/// Errors that can occur when loading or resolving a specification
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

    #[error("Merge conflict on '{key}' between {first} and {second}: {detail}")]
    MergeConflict {
        key: String,
        first: String,
        second: String,
        detail: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Build a specification error.
    pub fn specification(message: impl Into<String>) -> Self {
        Self::Specification(message.into())
    }

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

    /// Build a merge conflict naming both contributing structures.
    pub fn merge_conflict(
        key: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::MergeConflict {
            key: key.into(),
            first: first.into(),
            second: second.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
