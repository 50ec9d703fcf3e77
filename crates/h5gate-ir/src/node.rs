//! Node types for the in-memory container tree

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::metadata::{
    ConditionalClause, DeclaredAttribute, Exclusion, LinkRecord, MemberStat, SchemaRef,
};
use crate::value::{DataType, Shape, Value};

/// Handle of a node inside a [`crate::Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kinds of nodes in the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Group,
    Dataset,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Group => f.write_str("group"),
            NodeKind::Dataset => f.write_str("dataset"),
        }
    }
}

/// Type and shape descriptor recorded for a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub dtype: DataType,
    /// Storage type name when the caller supplied one (e.g. `float32`)
    pub storage_type: Option<String>,
    pub shape: Shape,
    /// Dimension names declared by the schema
    pub dimensions: Vec<String>,
    pub compressed: bool,
}

/// A group or dataset instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// Instance name (last path component)
    pub name: String,

    /// Full path, unique across the document
    pub path: String,

    /// Container path the node was placed under
    pub location: String,

    pub kind: NodeKind,

    /// Originating structure definition
    pub sdef: SchemaRef,

    /// Node has no schema declaration
    pub custom: bool,

    pub parent: Option<NodeId>,

    pub children: Vec<NodeId>,

    /// Attribute values written for this node
    pub attributes: BTreeMap<String, Value>,

    /// Attributes the schema declares for this node
    pub declared_attributes: BTreeMap<String, DeclaredAttribute>,

    /// Member statistics, keyed by member identifier (groups only)
    pub members: BTreeMap<String, MemberStat>,

    /// `_required` clauses over members
    pub clauses: Vec<ConditionalClause>,

    /// `_exclude_in` entries over members
    pub exclusions: Vec<Exclusion>,

    /// Type/shape descriptor (datasets only)
    pub dataset: Option<DatasetInfo>,

    /// Set when this node is a link rather than concrete data
    pub link: Option<LinkRecord>,

    /// Nodes linking to this one
    pub linked_from: Vec<NodeId>,
}

impl Node {
    /// Create a new node; the id is assigned when it is inserted into a document
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        location: impl Into<String>,
        sdef: SchemaRef,
    ) -> Self {
        Self {
            id: NodeId::new(usize::MAX),
            name: name.into(),
            path: path.into(),
            location: location.into(),
            kind: sdef.kind,
            sdef,
            custom: false,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            declared_attributes: BTreeMap::new(),
            members: BTreeMap::new(),
            clauses: Vec::new(),
            exclusions: Vec::new(),
            dataset: None,
            link: None,
            linked_from: Vec::new(),
        }
    }

    /// Mark the node as custom
    #[must_use]
    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }

    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::Group
    }

    pub fn is_link(&self) -> bool {
        self.link.is_some()
    }

    /// Set an attribute value
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Whether the schema declares the named attribute
    pub fn declares_attribute(&self, name: &str) -> bool {
        self.declared_attributes.contains_key(name)
    }

    /// Member statistic for the given identifier
    pub fn member(&self, identifier: &str) -> Option<&MemberStat> {
        self.members.get(identifier)
    }

    /// Whether at least one instance of the member exists
    pub fn has_member_instance(&self, identifier: &str) -> bool {
        self.members
            .get(identifier)
            .is_some_and(|stat| !stat.created.is_empty())
    }
}
