//! Construction sessions
//!
//! A [`Session`] owns everything one file build needs: the loaded schema,
//! fresh copies of the namespace lookup tables, the node tree, the custom
//! attribute registry and the storage backend. Nothing is shared between
//! sessions.

use crate::config::{BackendKind, RequiredPolicy, SessionOptions};
use crate::construct::Plan;
use crate::request::{DatasetRequest, GroupRequest};
use crate::{Error, Result};
use h5gate_ir::{Document, Node, NodeId, NodeKind, SchemaRef, Value};
use h5gate_schema::{LookupTable, ResolvedStructure, Resolver, SchemaLoader, SchemaRegistry};
use h5gate_storage::{DirectoryBackend, RecordingBackend, StorageBackend};
use h5gate_validation::{CustomAttribute, ValidationEngine, ValidationReport};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Advisory finding recorded while constructing a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionWarning {
    pub path: String,
    pub message: String,
}

/// One file build
pub struct Session<B: StorageBackend = Box<dyn StorageBackend>> {
    pub(crate) registry: SchemaRegistry,
    pub(crate) options: SessionOptions,
    pub(crate) backend: B,
    pub(crate) document: Document,
    pub(crate) lookups: BTreeMap<String, LookupTable>,
    /// Expanded definitions of schema groups, consulted when creating children
    pub(crate) resolved: HashMap<NodeId, ResolvedStructure>,
    pub(crate) custom_attributes: Vec<CustomAttribute>,
    pub(crate) warnings: Vec<ConstructionWarning>,
    root: NodeId,
}

impl Session {
    /// Load the specification documents and open a session on the backend
    /// selected by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Specification`] (or another schema error) when the
    /// documents do not load, and [`Error::Backend`] when the backend cannot
    /// be opened.
    pub fn open(
        definitions: &[serde_json::Value],
        imports: &[serde_json::Value],
        default_namespace: &str,
        options: SessionOptions,
    ) -> Result<Self> {
        let registry = SchemaLoader::new().load(definitions, imports, default_namespace)?;
        Self::new(registry, options)
    }

    /// Open a session on an already loaded registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] when the backend cannot be opened.
    pub fn new(registry: SchemaRegistry, options: SessionOptions) -> Result<Self> {
        let backend: Box<dyn StorageBackend> = match &options.backend {
            BackendKind::RecordOnly => Box::new(RecordingBackend::new()),
            BackendKind::Directory(path) => Box::new(DirectoryBackend::new(path)?),
        };
        Self::with_backend(registry, options, backend)
    }
}

impl<B: StorageBackend> Session<B> {
    /// Open a session writing to `backend`; `options.backend` is ignored.
    ///
    /// The root group `/` is created immediately, following the default
    /// namespace's `/` structure when it defines one.
    ///
    /// # Errors
    ///
    /// Returns schema errors from resolving the root structure and backend
    /// errors from creating it.
    pub fn with_backend(registry: SchemaRegistry, options: SessionOptions, backend: B) -> Result<Self> {
        let default_namespace = registry.default_namespace().to_string();
        let root_structure = match registry
            .namespace(&default_namespace)
            .and_then(|ns| ns.structure("/"))
        {
            Some(_) => Some(Resolver::new(&registry).resolve(&default_namespace, "/")?),
            None => None,
        };

        let mut session = Self {
            lookups: registry.lookup_tables(),
            registry,
            options,
            backend,
            document: Document::new(),
            resolved: HashMap::new(),
            custom_attributes: Vec::new(),
            warnings: Vec::new(),
            root: NodeId::new(0),
        };

        let mut sdef = SchemaRef::new(&default_namespace, "/", NodeKind::Group);
        if let Some(structure) = &root_structure {
            sdef.ancestors.clone_from(&structure.ancestors);
        }
        let plan = Plan {
            kind: NodeKind::Group,
            name: String::new(),
            location: String::new(),
            path: "/".to_string(),
            parent: None,
            sdef,
            structure: root_structure,
            member_key: None,
            lookup_key: None,
            custom: false,
        };
        let attributes = session.merge_attributes(&plan, BTreeMap::new(), false)?;
        session.backend.create_group("/")?;
        session.root = session.register(plan, None, None, attributes)?;

        info!(
            "Opened session on {} backend (default namespace '{}')",
            session.backend.name(),
            default_namespace
        );
        Ok(session)
    }

    /// Create a schema group.
    ///
    /// With `request.parent` set, the identifier is looked up among the
    /// parent's members first; otherwise placement follows the namespace
    /// lookup table.
    ///
    /// # Errors
    ///
    /// Fails fast with the error describing the first violated rule:
    /// unknown or abstract identifier, naming, placement, duplicate path,
    /// link, attribute type or backend failure.
    pub fn make_group(&mut self, request: GroupRequest) -> Result<NodeId> {
        let plan = self.plan(
            &request.identifier,
            NodeKind::Group,
            request.name.as_deref(),
            request.path.as_deref(),
            request.parent,
            false,
        )?;
        self.build_group(plan, request)
    }

    /// Create a schema dataset.
    ///
    /// # Errors
    ///
    /// See [`Session::make_group`]; additionally fails with
    /// [`Error::TypeMismatch`] when the value's element family does not match
    /// the declared data type.
    pub fn set_dataset(&mut self, request: DatasetRequest) -> Result<NodeId> {
        let plan = self.plan(
            &request.identifier,
            NodeKind::Dataset,
            request.name.as_deref(),
            request.path.as_deref(),
            request.parent,
            false,
        )?;
        self.build_dataset(plan, request)
    }

    /// Create a group without a schema declaration.
    ///
    /// # Errors
    ///
    /// Fails on naming, duplicate path, link and backend errors.
    pub fn make_custom_group(&mut self, request: GroupRequest) -> Result<NodeId> {
        let plan = self.plan(
            &request.identifier,
            NodeKind::Group,
            request.name.as_deref(),
            request.path.as_deref(),
            request.parent,
            true,
        )?;
        self.build_group(plan, request)
    }

    /// Create a dataset without a schema declaration.
    ///
    /// # Errors
    ///
    /// Fails on naming, duplicate path, link and backend errors.
    pub fn set_custom_dataset(&mut self, request: DatasetRequest) -> Result<NodeId> {
        let plan = self.plan(
            &request.identifier,
            NodeKind::Dataset,
            request.name.as_deref(),
            request.path.as_deref(),
            request.parent,
            true,
        )?;
        self.build_dataset(plan, request)
    }

    /// Create a group inside `parent`.
    ///
    /// # Errors
    ///
    /// See [`Session::make_group`].
    pub fn make_child_group(&mut self, parent: NodeId, request: GroupRequest) -> Result<NodeId> {
        self.make_group(request.parent(parent))
    }

    /// Create a dataset inside `parent`.
    ///
    /// # Errors
    ///
    /// See [`Session::set_dataset`].
    pub fn set_child_dataset(&mut self, parent: NodeId, request: DatasetRequest) -> Result<NodeId> {
        self.set_dataset(request.parent(parent))
    }

    /// Set an attribute on an existing node.
    ///
    /// Declared attributes are type checked. Undeclared attributes are only
    /// accepted with `custom = true` (or on custom nodes) and are recorded in
    /// the custom attribute registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`], [`Error::UnknownIdentifier`] for an
    /// undeclared attribute without `custom`, [`Error::TypeMismatch`] and
    /// backend errors.
    pub fn set_attr(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<Value>,
        custom: bool,
    ) -> Result<()> {
        let value = value.into();
        let target = self.document.get(node).ok_or(Error::UnknownNode { node })?;
        let path = target.path.clone();

        let is_custom = if target.custom {
            true
        } else if let Some(declared) = target.declared_attributes.get(name) {
            crate::construct::check_attribute_type(
                &path,
                name,
                declared.data_type.as_deref(),
                &value,
            )?;
            false
        } else if custom {
            true
        } else {
            return Err(Error::unknown(
                &target.sdef.namespace,
                name,
                format!(
                    "attribute is not declared by {}; set it as a custom attribute",
                    target.sdef.qualified()
                ),
            ));
        };

        self.backend.set_attribute(&path, name, &value)?;
        if let Some(target) = self.document.get_mut(node) {
            target.set_attribute(name, value);
        }
        if is_custom {
            self.record_custom_attribute(&path, name);
        }
        debug!("Set attribute '{}' on {}", name, path);
        Ok(())
    }

    /// Run the validation pass over the current state.
    ///
    /// Does not touch the backend; calling it twice without intervening
    /// construction yields identical reports.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationEngine::new()
            .max_examples(self.options.max_report_examples)
            .validate(&self.document, &self.lookups, &self.custom_attributes);
        for warning in &self.warnings {
            report.add_warning(&warning.path, &warning.message);
        }
        report
    }

    /// Validate, finalize the backend and return the report.
    ///
    /// # Errors
    ///
    /// Returns backend errors from finalizing, and [`Error::Validation`] when
    /// the required policy is [`RequiredPolicy::Enforce`] and required
    /// members are missing.
    pub fn close(self) -> Result<ValidationReport> {
        self.finish().map(|(report, _)| report)
    }

    /// Like [`Session::close`], also handing back the finalized backend.
    ///
    /// # Errors
    ///
    /// See [`Session::close`].
    pub fn finish(mut self) -> Result<(ValidationReport, B)> {
        let report = self.validate();
        self.backend.finalize()?;
        info!(
            "Closed session: {} node(s), {} finding(s)",
            self.document.len(),
            report.len()
        );

        if self.options.required_policy == RequiredPolicy::Enforce
            && report.has_required_violations()
        {
            return Err(Error::Validation(Box::new(report)));
        }
        Ok((report, self.backend))
    }

    /// The root group
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.document.get(id)
    }

    pub fn node_at(&self, path: &str) -> Option<&Node> {
        self.document.node_at(path)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Lookup table of a namespace, with the nodes recorded so far
    pub fn lookup(&self, namespace: &str) -> Option<&LookupTable> {
        self.lookups.get(namespace)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Expanded definition a schema group was created from
    pub fn structure_of(&self, id: NodeId) -> Option<&ResolvedStructure> {
        self.resolved.get(&id)
    }

    pub fn custom_attributes(&self) -> &[CustomAttribute] {
        &self.custom_attributes
    }

    pub fn warnings(&self) -> &[ConstructionWarning] {
        &self.warnings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn warn(&mut self, path: &str, message: impl Into<String>) {
        let message = message.into();
        warn!("{}: {}", path, message);
        self.warnings.push(ConstructionWarning {
            path: path.to_string(),
            message,
        });
    }

    pub(crate) fn record_custom_attribute(&mut self, path: &str, name: &str) {
        let attribute = CustomAttribute::new(path, name);
        if !self.custom_attributes.contains(&attribute) {
            debug!("Custom attribute '{}' on {}", name, path);
            self.custom_attributes.push(attribute);
        }
    }
}
