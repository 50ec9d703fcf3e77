//! Metadata attached to nodes: schema provenance, quantities, member
//! statistics and link records

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::{NodeId, NodeKind};
use crate::value::DataType;

/// Required-quantity marker of a member, location entry or attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quantity {
    /// `!` exactly one
    #[default]
    Required,
    /// `?` zero or one
    Optional,
    /// `*` zero or more
    ZeroOrMore,
    /// `+` one or more
    OneOrMore,
}

impl Quantity {
    /// Parse a quantity marker character.
    pub fn from_suffix(c: char) -> Option<Self> {
        match c {
            '!' => Some(Quantity::Required),
            '?' => Some(Quantity::Optional),
            '*' => Some(Quantity::ZeroOrMore),
            '+' => Some(Quantity::OneOrMore),
            _ => None,
        }
    }

    /// Marker character for this quantity.
    pub fn suffix(self) -> char {
        match self {
            Quantity::Required => '!',
            Quantity::Optional => '?',
            Quantity::ZeroOrMore => '*',
            Quantity::OneOrMore => '+',
        }
    }

    /// Whether at least one instance must exist.
    pub fn is_required(self) -> bool {
        matches!(self, Quantity::Required | Quantity::OneOrMore)
    }

    /// Split a trailing quantity marker off an identifier.
    ///
    /// `"<TimeSeries>/*"` becomes `("<TimeSeries>/", Some(ZeroOrMore))`.
    pub fn split(raw: &str) -> (&str, Option<Quantity>) {
        match raw.chars().last().and_then(Quantity::from_suffix) {
            Some(q) => (&raw[..raw.len() - 1], Some(q)),
            None => (raw, None),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Points a node back at the structure definition it was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRef {
    /// Namespace of the defining structure (empty for custom nodes)
    pub namespace: String,
    /// Structure identifier as written in the schema
    pub identifier: String,
    /// Whether the structure describes a group or a dataset
    pub kind: NodeKind,
    /// Transitive merge closure of the structure, nearest first, as `ns:id`
    pub ancestors: Vec<String>,
}

impl SchemaRef {
    pub fn new(namespace: impl Into<String>, identifier: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            namespace: namespace.into(),
            identifier: identifier.into(),
            kind,
            ancestors: Vec::new(),
        }
    }

    /// `ns:id` form of the structure identifier.
    pub fn qualified(&self) -> String {
        if self.namespace.is_empty() {
            self.identifier.clone()
        } else {
            format!("{}:{}", self.namespace, self.identifier)
        }
    }

    /// Whether this structure is `qualified` or merges it transitively.
    pub fn is_a(&self, qualified: &str) -> bool {
        self.qualified() == qualified || self.ancestors.iter().any(|a| a == qualified)
    }
}

/// Per-member bookkeeping kept on a group node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStat {
    /// Namespace the member identifier resolves in
    pub namespace: String,
    /// Member identifier (without quantity marker)
    pub identifier: String,
    pub kind: NodeKind,
    pub quantity: Quantity,
    /// Whether the member came from an `include` rather than a definition or merge
    pub included: bool,
    /// Whether instances of structures merging this one count as this member
    pub allow_subclasses: bool,
    /// Nodes created for this member, in creation order
    pub created: Vec<NodeId>,
}

impl MemberStat {
    pub fn new(
        namespace: impl Into<String>,
        identifier: impl Into<String>,
        kind: NodeKind,
        quantity: Quantity,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            identifier: identifier.into(),
            kind,
            quantity,
            included: false,
            allow_subclasses: false,
            created: Vec::new(),
        }
    }

    /// Whether the member is required but has no instance yet.
    pub fn is_missing(&self) -> bool {
        self.quantity.is_required() && self.created.is_empty()
    }
}

/// Schema-declared attribute as seen by the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredAttribute {
    pub data_type: Option<String>,
    pub quantity: Quantity,
    pub dimensions: Vec<String>,
}

/// `_required` clause carried on a group node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalClause {
    pub name: String,
    pub condition: String,
    pub message: String,
}

/// `_exclude_in` entry carried on a group node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Location (normalized path) the exclusion applies to
    pub location: String,
    pub member: String,
    /// `Required` means the member must be absent; anything else makes it optional
    pub quantity: Quantity,
}

/// Where a link points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkTarget {
    Internal { node: NodeId, path: String },
    External { file: String, path: String },
}

/// Link metadata recorded on a node instead of a duplicated value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub target: LinkTarget,
    /// Element type of the target when it is a dataset in this document
    pub target_dtype: Option<DataType>,
}

impl LinkRecord {
    pub fn new(target: LinkTarget) -> Self {
        Self {
            target,
            target_dtype: None,
        }
    }

    /// Target path inside its file.
    pub fn target_path(&self) -> &str {
        match &self.target {
            LinkTarget::Internal { path, .. } | LinkTarget::External { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_split() {
        assert_eq!(
            Quantity::split("<TimeSeries>/*"),
            ("<TimeSeries>/", Some(Quantity::ZeroOrMore))
        );
        assert_eq!(Quantity::split("data"), ("data", None));
        assert_eq!(Quantity::split("x!"), ("x", Some(Quantity::Required)));
    }

    #[test]
    fn test_quantity_required() {
        assert!(Quantity::Required.is_required());
        assert!(Quantity::OneOrMore.is_required());
        assert!(!Quantity::Optional.is_required());
        assert!(!Quantity::ZeroOrMore.is_required());
    }

    #[test]
    fn test_schema_ref_is_a() {
        let mut sdef = SchemaRef::new("core", "<ImageSeries>/", NodeKind::Group);
        sdef.ancestors.push("core:<TimeSeries>/".to_string());
        assert!(sdef.is_a("core:<ImageSeries>/"));
        assert!(sdef.is_a("core:<TimeSeries>/"));
        assert!(!sdef.is_a("core:<Device>/"));
    }

    #[test]
    fn test_member_missing() {
        let mut stat = MemberStat::new("core", "x", NodeKind::Dataset, Quantity::Required);
        assert!(stat.is_missing());
        stat.created.push(NodeId::new(0));
        assert!(!stat.is_missing());
    }
}
