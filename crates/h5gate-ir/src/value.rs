//! Data values and their inferred element type and shape

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// A value stored in a dataset or attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Bool(bool),

    /// Integer value
    Int(i64),

    /// Floating point value
    Float(f64),

    /// Text value
    Text(String),

    /// Sequence of values (nested for multi-dimensional data)
    Array(Vec<Value>),

    /// Opaque byte string
    Bytes(Vec<u8>),
}

/// Element type family inferred from a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Int,
    Float,
    Bool,
    Byte,
    /// Element type of an empty sequence
    Unknown,
}

/// Shape of a value: a scalar, or the length of each axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Scalar,
    Dims(Vec<usize>),
}

impl DataType {
    /// Lower-case name used in messages and stored descriptors.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
            DataType::Byte => "byte",
            DataType::Unknown => "unknown",
        }
    }

    /// Combine the element types of two sequence members.
    fn unify(self, other: DataType) -> Option<DataType> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (DataType::Unknown, b) => Some(b),
            (a, DataType::Unknown) => Some(a),
            (DataType::Int, DataType::Float) | (DataType::Float, DataType::Int) => {
                Some(DataType::Float)
            }
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Shape {
    /// Number of axes (0 for scalars).
    pub fn rank(&self) -> usize {
        match self {
            Shape::Scalar => 0,
            Shape::Dims(dims) => dims.len(),
        }
    }

    /// Length of the given axis, if it exists.
    pub fn axis(&self, index: usize) -> Option<usize> {
        match self {
            Shape::Scalar => None,
            Shape::Dims(dims) => dims.get(index).copied(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => f.write_str("scalar"),
            Shape::Dims(dims) if dims.len() == 1 => write!(f, "({},)", dims[0]),
            Shape::Dims(dims) => {
                let parts: Vec<String> = dims.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

impl Value {
    /// Infer the element type and shape of this value.
    ///
    /// Nested arrays must be rectangular and hold a single element family
    /// (integers and floats unify to float).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for ragged arrays or mixed element families.
    pub fn infer(&self) -> Result<(DataType, Shape)> {
        match self {
            Value::Bool(_) => Ok((DataType::Bool, Shape::Scalar)),
            Value::Int(_) => Ok((DataType::Int, Shape::Scalar)),
            Value::Float(_) => Ok((DataType::Float, Shape::Scalar)),
            Value::Text(_) => Ok((DataType::Text, Shape::Scalar)),
            Value::Bytes(bytes) => Ok((DataType::Byte, Shape::Dims(vec![bytes.len()]))),
            Value::Array(items) => {
                let mut dtype = DataType::Unknown;
                let mut inner: Option<Shape> = None;
                for item in items {
                    let (item_type, item_shape) = item.infer()?;
                    dtype = dtype.unify(item_type).ok_or_else(|| {
                        Error::type_mismatch(
                            format!("{dtype} elements"),
                            format!("{item_type} element"),
                        )
                    })?;
                    match &inner {
                        None => inner = Some(item_shape),
                        Some(expected) if *expected != item_shape => {
                            return Err(Error::type_mismatch(
                                format!("rectangular array with rows of shape {expected}"),
                                format!("row of shape {item_shape}"),
                            ));
                        }
                        Some(_) => {}
                    }
                }
                let mut dims = vec![items.len()];
                if let Some(Shape::Dims(rest)) = inner {
                    dims.extend(rest);
                }
                Ok((dtype, Shape::Dims(dims)))
            }
        }
    }

    /// Approximate payload size in bytes, used for compression thresholds.
    pub fn byte_len(&self) -> usize {
        match self {
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 8,
            Value::Text(s) => s.len(),
            Value::Bytes(b) => b.len(),
            Value::Array(items) => items.iter().map(Value::byte_len).sum(),
        }
    }

    /// Borrow the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
