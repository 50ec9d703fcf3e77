//! Structure model definitions

use h5gate_ir::{DataType, NodeKind, Quantity, Value, path};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use crate::{Error, Result};

static NAMESPACE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_.\-]*):(.+)$").expect("namespace prefix regex is valid")
});

/// How the instance name of a structure is chosen
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Naming {
    /// The identifier is the literal instance name
    Fixed(String),
    /// The caller supplies the instance name; holds the label between `<` and `>`
    Variable(String),
}

/// A parsed structure identifier
///
/// Identifiers look like `description`, `<ElectricalSeries>/`,
/// `/general/devices/` or `core:<TimeSeries>/`. A trailing `/` marks a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureId {
    /// Explicit namespace qualifier, if any
    pub namespace: Option<String>,
    /// Fixed location for identifiers written with an absolute path prefix
    pub location: Option<String>,
    pub naming: Naming,
    pub kind: NodeKind,
    key: String,
}

impl StructureId {
    /// Parse an identifier (without a quantity marker).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Specification`] for malformed identifiers.
    pub fn parse(raw: &str) -> Result<Self> {
        let (namespace, rest) = match NAMESPACE_PREFIX.captures(raw) {
            Some(caps) => (Some(caps[1].to_string()), caps[2].to_string()),
            None => (None, raw.to_string()),
        };

        if rest == "/" {
            return Ok(Self {
                namespace,
                location: None,
                naming: Naming::Fixed(String::new()),
                kind: NodeKind::Group,
                key: rest,
            });
        }

        let kind = if rest.ends_with('/') {
            NodeKind::Group
        } else {
            NodeKind::Dataset
        };
        let body = rest.strip_suffix('/').unwrap_or(&rest);
        if body.is_empty() {
            return Err(Error::specification(format!("empty identifier '{raw}'")));
        }

        let (location, name) = match body.rfind('/') {
            Some(idx) => {
                if !body.starts_with('/') {
                    return Err(Error::specification(format!(
                        "identifier '{raw}' has a relative path prefix"
                    )));
                }
                let prefix = if idx == 0 { "/" } else { &body[..idx] };
                let location = path::normalize(prefix)
                    .map_err(|e| Error::specification(format!("identifier '{raw}': {e}")))?;
                (Some(location), &body[idx + 1..])
            }
            None => (None, body),
        };

        let naming = if let Some(label) = name.strip_prefix('<').and_then(|n| n.strip_suffix('>')) {
            if label.is_empty() || label.contains(['<', '>']) {
                return Err(Error::specification(format!(
                    "malformed variable name in identifier '{raw}'"
                )));
            }
            Naming::Variable(label.to_string())
        } else {
            if name.is_empty() || name.contains(['<', '>']) {
                return Err(Error::specification(format!(
                    "malformed name in identifier '{raw}'"
                )));
            }
            Naming::Fixed(name.to_string())
        };

        Ok(Self {
            namespace,
            location,
            naming,
            kind,
            key: rest,
        })
    }

    /// Identifier as written in the structures table (no namespace, no quantity).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Namespace this identifier resolves in, given the referencing namespace.
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }

    /// `ns:key` form.
    pub fn qualified(&self, default_namespace: &str) -> String {
        format!("{}:{}", self.namespace_or(default_namespace), self.key)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.naming, Naming::Variable(_))
    }

    /// Whether this is the root group identifier `/`.
    pub fn is_root(&self) -> bool {
        self.key == "/"
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}:{}", self.key),
            None => f.write_str(&self.key),
        }
    }
}

/// Element type declared by the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Text,
    Number,
    Int,
    Float,
    Bool,
    Byte,
    Any,
}

impl DeclaredType {
    /// Parse a schema type name or a storage type name (`int32`, `float64`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Specification`] for unknown type names.
    pub fn parse(name: &str) -> Result<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let parsed = match lower.as_str() {
            "text" | "str" | "string" | "utf8" | "ascii" => DeclaredType::Text,
            "number" => DeclaredType::Number,
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint16" | "uint32"
            | "uint64" => DeclaredType::Int,
            "float" | "float32" | "float64" | "double" => DeclaredType::Float,
            "bool" | "boolean" => DeclaredType::Bool,
            "byte" | "bytes" | "uint8" => DeclaredType::Byte,
            "any" => DeclaredType::Any,
            _ => {
                return Err(Error::specification(format!("unknown data type '{name}'")));
            }
        };
        Ok(parsed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeclaredType::Text => "text",
            DeclaredType::Number => "number",
            DeclaredType::Int => "int",
            DeclaredType::Float => "float",
            DeclaredType::Bool => "bool",
            DeclaredType::Byte => "byte",
            DeclaredType::Any => "any",
        }
    }

    /// Whether a value of the inferred element family satisfies this declaration.
    pub fn accepts(self, dtype: DataType) -> bool {
        if dtype == DataType::Unknown {
            return true;
        }
        match self {
            DeclaredType::Any => true,
            DeclaredType::Number => matches!(dtype, DataType::Int | DataType::Float),
            DeclaredType::Int => dtype == DataType::Int,
            DeclaredType::Float => matches!(dtype, DataType::Int | DataType::Float),
            DeclaredType::Bool => dtype == DataType::Bool,
            DeclaredType::Text => dtype == DataType::Text,
            DeclaredType::Byte => matches!(dtype, DataType::Byte | DataType::Int),
        }
    }

    /// Whether `other` is this declaration or a narrowing of it.
    pub fn covers(self, other: DeclaredType) -> bool {
        self == other
            || self == DeclaredType::Any
            || (self == DeclaredType::Number
                && matches!(other, DeclaredType::Int | DeclaredType::Float))
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute declaration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeDef {
    pub data_type: Option<DeclaredType>,
    /// Value written automatically when the node is created
    pub value: Option<Value>,
    pub description: Option<String>,
    pub dimensions: Vec<String>,
    /// Unset means required
    pub quantity: Option<Quantity>,
}

impl AttributeDef {
    /// Effective quantity (defaults to required).
    pub fn effective_quantity(&self) -> Quantity {
        self.quantity.unwrap_or_default()
    }
}

/// `link` directive: instances are links to nodes of `target_type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub target_type: String,
    pub allow_subclasses: bool,
}

/// One entry of an `include` directive
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeDef {
    /// Target identifier as written (possibly namespace-qualified)
    pub target: String,
    pub quantity: Option<Quantity>,
    /// Field-level overrides applied to the included structure
    pub modifiers: Option<Box<StructureDef>>,
    /// Instances of structures merging the target count as this member
    pub allow_subclasses: bool,
    /// Namespace the include was declared in
    pub namespace: String,
}

/// `_required` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDef {
    pub name: String,
    pub clause: String,
    pub message: String,
}

/// `_exclude_in` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionDef {
    pub location: String,
    pub member: String,
    pub quantity: Quantity,
}

/// Fields shared by group and dataset definitions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureCommon {
    pub description: Option<String>,
    pub merge: Vec<String>,
    pub include: Vec<IncludeDef>,
    pub attributes: BTreeMap<String, AttributeDef>,
    pub parent_attributes: BTreeMap<String, AttributeDef>,
    pub link: Option<LinkSpec>,
    pub is_abstract: bool,
    /// Unrecognized `_`-prefixed keys
    pub extras: BTreeMap<String, serde_json::Value>,
}

/// Nested member declared inside a group definition
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDef {
    pub id: StructureId,
    pub quantity: Quantity,
    /// Namespace the member was declared in
    pub namespace: String,
    pub def: StructureDef,
}

/// Group definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupDef {
    pub common: StructureCommon,
    pub members: BTreeMap<String, MemberDef>,
    pub required: Vec<ConditionDef>,
    pub exclude_in: Vec<ExclusionDef>,
}

/// Dataset definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetDef {
    pub common: StructureCommon,
    pub data_type: Option<DeclaredType>,
    pub dimensions: Vec<String>,
}

/// A structure definition
#[derive(Debug, Clone, PartialEq)]
pub enum StructureDef {
    Group(GroupDef),
    Dataset(DatasetDef),
}

impl StructureDef {
    /// Empty definition of the given kind.
    pub fn empty(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Group => StructureDef::Group(GroupDef::default()),
            NodeKind::Dataset => StructureDef::Dataset(DatasetDef::default()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            StructureDef::Group(_) => NodeKind::Group,
            StructureDef::Dataset(_) => NodeKind::Dataset,
        }
    }

    pub fn common(&self) -> &StructureCommon {
        match self {
            StructureDef::Group(g) => &g.common,
            StructureDef::Dataset(d) => &d.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut StructureCommon {
        match self {
            StructureDef::Group(g) => &mut g.common,
            StructureDef::Dataset(d) => &mut d.common,
        }
    }

    pub fn as_group(&self) -> Option<&GroupDef> {
        match self {
            StructureDef::Group(g) => Some(g),
            StructureDef::Dataset(_) => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&DatasetDef> {
        match self {
            StructureDef::Dataset(d) => Some(d),
            StructureDef::Group(_) => None,
        }
    }
}

/// A top-level structure of a namespace
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub id: StructureId,
    pub def: StructureDef,
}

/// `info` block of a namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Entry of a namespace `locations` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationMember {
    /// Raw identifier (without quantity marker)
    pub identifier: String,
    pub quantity: Quantity,
}

/// A loaded namespace
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub name: String,
    pub info: NamespaceInfo,
    pub structures: BTreeMap<String, Structure>,
    /// Normalized location path to allowed identifiers
    pub locations: BTreeMap<String, Vec<LocationMember>>,
}

impl Namespace {
    /// Look up a structure by its key.
    pub fn structure(&self, key: &str) -> Option<&Structure> {
        self.structures.get(key)
    }
}

/// Marker allowing custom nodes at a location
pub const CUSTOM_MARKER: &str = "__custom";

/// Convert a JSON/YAML scalar or array into a [`Value`].
///
/// # Errors
///
/// Returns [`Error::Specification`] for nulls, mappings and out-of-range numbers.
pub fn value_from_json(json: &serde_json::Value) -> Result<Value> {
    match json {
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(Error::specification(format!("number out of range: {n}")))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Array(items) => Ok(Value::Array(
            items.iter().map(value_from_json).collect::<Result<_>>()?,
        )),
        serde_json::Value::Null => Err(Error::specification("null is not a valid value")),
        serde_json::Value::Object(_) => {
            Err(Error::specification("a mapping is not a valid value"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable_group() {
        let id = StructureId::parse("<TimeSeries>/").unwrap();
        assert_eq!(id.kind, NodeKind::Group);
        assert_eq!(id.naming, Naming::Variable("TimeSeries".to_string()));
        assert_eq!(id.key(), "<TimeSeries>/");
        assert!(id.location.is_none());
        assert!(id.is_variable());
    }

    #[test]
    fn test_parse_fixed_dataset() {
        let id = StructureId::parse("description").unwrap();
        assert_eq!(id.kind, NodeKind::Dataset);
        assert_eq!(id.naming, Naming::Fixed("description".to_string()));
    }

    #[test]
    fn test_parse_absolute_path() {
        let id = StructureId::parse("/general/devices/").unwrap();
        assert_eq!(id.kind, NodeKind::Group);
        assert_eq!(id.location.as_deref(), Some("/general"));
        assert_eq!(id.naming, Naming::Fixed("devices".to_string()));

        let id = StructureId::parse("/file_create_date").unwrap();
        assert_eq!(id.location.as_deref(), Some("/"));
        assert_eq!(id.kind, NodeKind::Dataset);
    }

    #[test]
    fn test_parse_namespace_qualified() {
        let id = StructureId::parse("core:<TimeSeries>/").unwrap();
        assert_eq!(id.namespace.as_deref(), Some("core"));
        assert_eq!(id.key(), "<TimeSeries>/");
        assert_eq!(id.qualified("ext"), "core:<TimeSeries>/");
        assert_eq!(id.to_string(), "core:<TimeSeries>/");
    }

    #[test]
    fn test_parse_root() {
        let id = StructureId::parse("/").unwrap();
        assert!(id.is_root());
        assert_eq!(id.kind, NodeKind::Group);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(StructureId::parse("<>/").is_err());
        assert!(StructureId::parse("a/b").is_err());
        assert!(StructureId::parse("na<me").is_err());
    }

    #[test]
    fn test_declared_type_compatibility() {
        assert!(DeclaredType::Number.accepts(DataType::Int));
        assert!(DeclaredType::Number.accepts(DataType::Float));
        assert!(!DeclaredType::Int.accepts(DataType::Float));
        assert!(!DeclaredType::Text.accepts(DataType::Int));
        assert!(DeclaredType::Any.accepts(DataType::Text));
        assert!(DeclaredType::Number.covers(DeclaredType::Int));
        assert!(!DeclaredType::Int.covers(DeclaredType::Number));
    }

    #[test]
    fn test_declared_type_parse_storage_names() {
        assert_eq!(DeclaredType::parse("float32").unwrap(), DeclaredType::Float);
        assert_eq!(DeclaredType::parse("uint8").unwrap(), DeclaredType::Byte);
        assert_eq!(DeclaredType::parse("int64").unwrap(), DeclaredType::Int);
        assert!(DeclaredType::parse("complex").is_err());
    }

    #[test]
    fn test_value_from_json() {
        let json = serde_json::json!([[1, 2], [3, 4]]);
        let value = value_from_json(&json).unwrap();
        assert_eq!(value, Value::from(vec![vec![1, 2], vec![3, 4]]));
        assert!(value_from_json(&serde_json::Value::Null).is_err());
    }
}
