//! Construction requests
//!
//! Builders for the arguments of a group or dataset construction call.

use crate::link::DataArg;
use h5gate_ir::{NodeId, Value};
use std::collections::BTreeMap;

/// Arguments of a group construction call
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRequest {
    pub identifier: String,
    /// Instance name, required for variable-named identifiers
    pub name: Option<String>,
    /// Location the group is created under
    pub path: Option<String>,
    /// Group to create the instance in
    pub parent: Option<NodeId>,
    pub attrs: BTreeMap<String, Value>,
    pub link: Option<DataArg>,
    /// When false, an existing group of the same identifier at the path is
    /// returned instead of failing
    pub abort: bool,
}

impl GroupRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: None,
            path: None,
            parent: None,
            attrs: BTreeMap::new(),
            link: None,
            abort: true,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn attrs(mut self, attrs: BTreeMap<String, Value>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    /// Create the group as a link to a node or a `link:`/`extlink:` string
    #[must_use]
    pub fn link(mut self, target: impl Into<DataArg>) -> Self {
        self.link = Some(target.into());
        self
    }

    #[must_use]
    pub fn abort(mut self, abort: bool) -> Self {
        self.abort = abort;
        self
    }
}

/// Arguments of a dataset construction call
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRequest {
    pub identifier: String,
    pub value: DataArg,
    pub name: Option<String>,
    pub path: Option<String>,
    pub parent: Option<NodeId>,
    pub attrs: BTreeMap<String, Value>,
    /// Storage type name such as `int32` or `float64`
    pub dtype: Option<String>,
    pub compress: bool,
}

impl DatasetRequest {
    pub fn new(identifier: impl Into<String>, value: impl Into<DataArg>) -> Self {
        Self {
            identifier: identifier.into(),
            value: value.into(),
            name: None,
            path: None,
            parent: None,
            attrs: BTreeMap::new(),
            dtype: None,
            compress: false,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn attrs(mut self, attrs: BTreeMap<String, Value>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    #[must_use]
    pub fn dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = Some(dtype.into());
        self
    }

    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}
