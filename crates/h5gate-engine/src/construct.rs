//! Node construction
//!
//! Every construction call goes through the same steps: deduce the identity
//! and placement of the new node ([`Session::plan`]), resolve link intent,
//! create the concrete object or link in the backend, merge caller
//! attributes over the declared ones and register the node with its parent,
//! the lookup tables and the path registry.

use crate::config::LinkStyle;
use crate::link::{DataArg, link_placeholder};
use crate::request::{DatasetRequest, GroupRequest};
use crate::session::Session;
use crate::{Error, Result};
use h5gate_ir::{
    ConditionalClause, DataType, DatasetInfo, DeclaredAttribute, Exclusion, LinkRecord,
    LinkTarget, MemberStat, Node, NodeId, NodeKind, SchemaRef, Value, path,
};
use h5gate_schema::{
    DeclaredType, MemberSource, Naming, ResolvedStructure, Resolver, StructureId,
};
use h5gate_storage::StorageBackend;
use h5gate_validation::{validate_data_type, validate_declared_dimensions};
use std::collections::BTreeMap;
use tracing::debug;

/// Identity and placement deduced for one construction call
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub kind: NodeKind,
    pub name: String,
    /// Normalized path of the containing location
    pub location: String,
    pub path: String,
    pub parent: Option<NodeId>,
    pub sdef: SchemaRef,
    /// Expanded definition; `None` for custom nodes
    pub structure: Option<ResolvedStructure>,
    /// Parent member the instance counts against
    pub member_key: Option<String>,
    /// `(namespace, identifier)` to record in the lookup tables
    pub lookup_key: Option<(String, String)>,
    pub custom: bool,
}

/// Attribute value queued for writing after the object exists
#[derive(Debug, Clone)]
pub(crate) struct PendingAttribute {
    name: String,
    value: Value,
    custom: bool,
}

/// Check a value against an attribute's declared type name.
pub(crate) fn check_attribute_type(
    path: &str,
    name: &str,
    declared: Option<&str>,
    value: &Value,
) -> Result<()> {
    let Some(declared) = declared else {
        return Ok(());
    };
    let declared = DeclaredType::parse(declared)?;
    let (inferred, _) = value
        .infer()
        .map_err(|e| Error::type_mismatch(format!("{path}@{name}"), declared.as_str(), e.to_string()))?;
    if declared.accepts(inferred) {
        Ok(())
    } else {
        Err(Error::type_mismatch(
            format!("{path}@{name}"),
            declared.as_str(),
            inferred.as_str(),
        ))
    }
}

/// Storage type written when the caller does not pass an explicit dtype
fn storage_type(inferred: DataType, declared: Option<DeclaredType>) -> &'static str {
    match (inferred, declared) {
        (DataType::Int, Some(DeclaredType::Float)) => "float64",
        (DataType::Text, _) | (DataType::Unknown, Some(DeclaredType::Text)) => "text",
        (DataType::Int, _) | (DataType::Unknown, Some(DeclaredType::Int)) => "int64",
        (DataType::Bool, _) | (DataType::Unknown, Some(DeclaredType::Bool)) => "bool",
        (DataType::Byte, _) | (DataType::Unknown, Some(DeclaredType::Byte)) => "uint8",
        (DataType::Float | DataType::Unknown, _) => "float64",
    }
}

fn validate_name(identifier: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::naming(identifier, "instance name is empty"));
    }
    if name.contains('/') {
        return Err(Error::naming(
            identifier,
            format!("instance name '{name}' contains '/'"),
        ));
    }
    Ok(())
}

impl<B: StorageBackend> Session<B> {
    pub(crate) fn plan(
        &self,
        identifier: &str,
        kind: NodeKind,
        name: Option<&str>,
        location: Option<&str>,
        parent: Option<NodeId>,
        custom: bool,
    ) -> Result<Plan> {
        let id = StructureId::parse(identifier)
            .map_err(|e| Error::naming(identifier, e.to_string()))?;
        if !custom && id.kind != kind {
            return Err(Error::unknown(
                id.namespace_or(self.registry.default_namespace()),
                identifier,
                format!("identifier names a {}, not a {kind}", id.kind),
            ));
        }

        let location = location
            .map(|raw| {
                path::normalize(raw)
                    .map_err(|_| Error::invalid_placement(identifier, raw, Vec::new()))
            })
            .transpose()?;

        let parent = match parent {
            Some(parent) => {
                let node = self
                    .document
                    .get(parent)
                    .ok_or(Error::UnknownNode { node: parent })?;
                if !node.is_group() || node.is_link() {
                    return Err(Error::invalid_placement(
                        identifier,
                        &node.path,
                        Vec::new(),
                    ));
                }
                if let Some(location) = &location {
                    if *location != node.path {
                        return Err(Error::invalid_placement(
                            identifier,
                            location,
                            vec![node.path.clone()],
                        ));
                    }
                }
                Some(parent)
            }
            None => None,
        };

        let name = self.instance_name(identifier, &id, name)?;
        if custom {
            return self.plan_custom(identifier, &id, kind, name, location, parent);
        }

        // A path naming an existing group that declares the identifier
        // means "create it in that group".
        let scope = parent.or_else(|| {
            location
                .as_deref()
                .and_then(|loc| self.document.by_path(loc))
                .filter(|candidate| {
                    self.resolved.contains_key(candidate)
                        && self.document.get(*candidate).is_some_and(|n| !n.is_link())
                })
        });

        let member = match scope {
            Some(scope) => self.find_member(scope, &id)?.map(|found| (scope, found)),
            None => None,
        };

        let (location, parent, member_key, structure) = match member {
            Some((scope, (member_key, structure))) => {
                let scope_path = self
                    .document
                    .get(scope)
                    .map(|n| n.path.clone())
                    .ok_or(Error::UnknownNode { node: scope })?;
                (scope_path, Some(scope), Some(member_key), structure)
            }
            None => {
                let namespace = id
                    .namespace_or(self.registry.default_namespace())
                    .to_string();
                let structure = Resolver::new(&self.registry).resolve(&namespace, id.key())?;
                let wanted = match parent {
                    Some(parent) => self.document.get(parent).map(|n| n.path.clone()),
                    None => location,
                };
                let location = self.placement(&namespace, &id, wanted)?;
                let parent = self.document.by_path(&location).filter(|p| {
                    self.document.get(*p).is_some_and(|n| n.is_group() && !n.is_link())
                });
                let member_key = match parent {
                    Some(parent) => self.find_member(parent, &id)?.map(|(key, _)| key),
                    None => None,
                };
                (location, parent, member_key, structure)
            }
        };
        let lookup_key = Some((structure.namespace.clone(), structure.id.key().to_string()));

        if structure.is_abstract() {
            return Err(Error::unknown(
                &structure.namespace,
                identifier,
                "abstract",
            ));
        }

        let mut sdef = SchemaRef::new(&structure.namespace, structure.id.key(), kind);
        sdef.ancestors.clone_from(&structure.ancestors);
        let path = path::join(&location, &name);

        Ok(Plan {
            kind,
            name,
            location,
            path,
            parent,
            sdef,
            structure: Some(structure),
            member_key,
            lookup_key,
            custom: false,
        })
    }

    fn plan_custom(
        &self,
        identifier: &str,
        id: &StructureId,
        kind: NodeKind,
        name: String,
        location: Option<String>,
        parent: Option<NodeId>,
    ) -> Result<Plan> {
        let location = match parent {
            Some(parent) => self
                .document
                .get(parent)
                .map(|n| n.path.clone())
                .ok_or(Error::UnknownNode { node: parent })?,
            None => location
                .or_else(|| id.location.clone())
                .unwrap_or_else(|| "/".to_string()),
        };
        let parent = parent.or_else(|| self.document.by_path(&location));
        if let Some(node) = parent.and_then(|p| self.document.get(p)) {
            if !node.is_group() || node.is_link() {
                return Err(Error::invalid_placement(identifier, &location, Vec::new()));
            }
        }

        let path = path::join(&location, &name);
        Ok(Plan {
            kind,
            sdef: SchemaRef::new("", id.key(), kind),
            name,
            location,
            path,
            parent,
            structure: None,
            member_key: None,
            lookup_key: None,
            custom: true,
        })
    }

    /// Apply the naming contract of `id` to a caller-supplied name.
    fn instance_name(&self, identifier: &str, id: &StructureId, name: Option<&str>) -> Result<String> {
        let name = name.filter(|n| !n.is_empty());
        match (&id.naming, name) {
            (Naming::Fixed(fixed), None) => Ok(fixed.clone()),
            (Naming::Fixed(_), Some(given)) => Err(Error::naming(
                identifier,
                format!("fixed-name identifier does not take a name (got '{given}')"),
            )),
            (Naming::Variable(_), Some(given)) => {
                validate_name(identifier, given)?;
                Ok(given.to_string())
            }
            (Naming::Variable(label), None) => Err(Error::naming(
                identifier,
                format!("variable-named identifier needs a name for <{label}>"),
            )),
        }
    }

    /// Pick the location of a top-level instance from the lookup table.
    fn placement(&self, namespace: &str, id: &StructureId, wanted: Option<String>) -> Result<String> {
        let allowed: Vec<String> = match &id.location {
            Some(fixed) => vec![fixed.clone()],
            None => self
                .lookups
                .get(namespace)
                .and_then(|table| table.locations(id.key()))
                .map(|locations| locations.keys().cloned().collect())
                .unwrap_or_default(),
        };

        match wanted {
            Some(wanted) if allowed.contains(&wanted) => Ok(wanted),
            Some(wanted) => Err(Error::invalid_placement(id.to_string(), wanted, allowed)),
            None => match allowed.as_slice() {
                [only] => Ok(only.clone()),
                [] => Err(Error::unknown(
                    namespace,
                    id.key(),
                    "not listed in any location; create it inside a group that declares it",
                )),
                _ => Err(Error::AmbiguousPlacement {
                    identifier: id.to_string(),
                    locations: allowed,
                }),
            },
        }
    }

    /// Find the member of a schema group that an instance of `id` counts
    /// against, together with the definition to build it from.
    fn find_member(
        &self,
        group: NodeId,
        id: &StructureId,
    ) -> Result<Option<(String, ResolvedStructure)>> {
        let Some(owner) = self.resolved.get(&group) else {
            return Ok(None);
        };
        let resolver = Resolver::new(&self.registry);

        if let Some(member) = owner.members.get(id.key()) {
            let qualifier_matches = id
                .namespace
                .as_deref()
                .is_none_or(|ns| ns == member.namespace);
            if qualifier_matches && member.kind() == id.kind {
                let structure = resolver.resolve_member(member)?;
                return Ok(Some((id.key().to_string(), structure)));
            }
        }

        let namespace = id.namespace_or(self.registry.default_namespace());
        let subclass_members: Vec<_> = owner
            .members
            .iter()
            .filter(|(_, m)| m.allow_subclasses && m.kind() == id.kind)
            .collect();
        if subclass_members.is_empty() || self.registry.structure(namespace, id.key()).is_err() {
            return Ok(None);
        }
        let candidate = resolver.resolve(namespace, id.key())?;
        for (key, member) in subclass_members {
            if candidate.ancestors.contains(&member.qualified()) {
                debug!(
                    "{} counts as subclass member '{}' of {}",
                    candidate.qualified(),
                    key,
                    owner.qualified()
                );
                return Ok(Some((key.clone(), candidate)));
            }
        }
        Ok(None)
    }

    /// Resolve a link argument to a target; `None` for concrete values.
    fn link_target(&self, arg: &DataArg) -> Result<Option<LinkTarget>> {
        match arg {
            DataArg::Value(_) => Ok(None),
            DataArg::Node(node) => {
                let target = self.document.get(*node).ok_or(Error::UnknownNode { node: *node })?;
                Ok(Some(LinkTarget::Internal {
                    node: *node,
                    path: target.path.clone(),
                }))
            }
            DataArg::InternalLink(raw) => {
                let not_found = || Error::LinkTargetNotFound { path: raw.clone() };
                let normalized = path::normalize(raw).map_err(|_| not_found())?;
                let node = self.document.by_path(&normalized).ok_or_else(not_found)?;
                Ok(Some(LinkTarget::Internal {
                    node,
                    path: normalized,
                }))
            }
            DataArg::ExternalLink { file, path } => Ok(Some(LinkTarget::External {
                file: file.clone(),
                path: path.clone(),
            })),
        }
    }

    /// Enforce the structure's `link` directive and the kind of the target.
    fn check_link(&self, plan: &Plan, target: Option<&LinkTarget>) -> Result<()> {
        let spec = plan
            .structure
            .as_ref()
            .and_then(|s| s.def.common().link.as_ref().map(|spec| (s, spec)));

        match (spec, target) {
            (Some((_, spec)), None) => Err(Error::invalid_link(
                &plan.path,
                format!("must be created as a link to a {}", spec.target_type),
            )),
            (spec, Some(LinkTarget::Internal { node, path })) => {
                let target = self
                    .document
                    .get(*node)
                    .ok_or_else(|| Error::LinkTargetNotFound { path: path.clone() })?;
                if target.kind != plan.kind {
                    return Err(Error::invalid_link(
                        &plan.path,
                        format!("a {} cannot link to {} {}", plan.kind, target.kind, target.path),
                    ));
                }
                if let Some((structure, spec)) = spec {
                    let (ns, id, _) = self
                        .registry
                        .resolve_id(&spec.target_type, &structure.namespace)?;
                    let wanted = id.qualified(&ns);
                    let accepted = if spec.allow_subclasses {
                        target.sdef.is_a(&wanted)
                    } else {
                        target.sdef.qualified() == wanted
                    };
                    if !accepted {
                        return Err(Error::invalid_link(
                            &plan.path,
                            format!("target {} is a {}, not a {wanted}", target.path, target.sdef.qualified()),
                        ));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Write a link object according to the configured link style.
    fn write_link(&mut self, at: &str, kind: NodeKind, target: &LinkTarget) -> Result<()> {
        match target {
            LinkTarget::External { file, path } => {
                self.backend.create_external_link(at, file, path)?;
            }
            LinkTarget::Internal { path, .. } => match self.options.link_style {
                LinkStyle::Soft => self.backend.create_softlink(at, path)?,
                LinkStyle::Hard => self.backend.create_hardlink(at, path)?,
                LinkStyle::String => {
                    let placeholder = Value::Text(link_placeholder(path));
                    match kind {
                        NodeKind::Dataset => {
                            self.backend.create_dataset(at, &placeholder, "text", false)?;
                        }
                        NodeKind::Group => {
                            self.backend.create_group(at)?;
                            self.backend.set_attribute(at, "link_target", &placeholder)?;
                        }
                    }
                }
            },
        }
        Ok(())
    }

    pub(crate) fn build_group(&mut self, plan: Plan, request: GroupRequest) -> Result<NodeId> {
        if let Some(existing) = self.document.by_path(&plan.path) {
            let reusable = self.document.get(existing).is_some_and(|node| {
                node.is_group()
                    && node.custom == plan.custom
                    && node.sdef.qualified() == plan.sdef.qualified()
            });
            if request.abort || !reusable {
                return Err(Error::duplicate_path(&plan.path));
            }
            debug!("Returning existing node at {}", plan.path);
            return Ok(existing);
        }

        let target = match &request.link {
            Some(DataArg::Value(_)) => {
                return Err(Error::invalid_link(
                    &plan.path,
                    "a group link needs a node or a link string",
                ));
            }
            Some(arg) => self.link_target(arg)?,
            None => None,
        };
        self.check_link(&plan, target.as_ref())?;
        let attributes = self.merge_attributes(&plan, request.attrs, target.is_some())?;

        let link = match target {
            Some(target) => {
                self.write_link(&plan.path, NodeKind::Group, &target)?;
                Some(LinkRecord::new(target))
            }
            None => {
                self.backend.create_group(&plan.path)?;
                None
            }
        };
        self.register(plan, link, None, attributes)
    }

    pub(crate) fn build_dataset(&mut self, plan: Plan, request: DatasetRequest) -> Result<NodeId> {
        if self.document.by_path(&plan.path).is_some() {
            return Err(Error::duplicate_path(&plan.path));
        }

        let target = self.link_target(&request.value)?;
        self.check_link(&plan, target.as_ref())?;
        let attributes = self.merge_attributes(&plan, request.attrs, target.is_some())?;
        let declared = plan
            .structure
            .as_ref()
            .and_then(|s| s.def.as_dataset())
            .and_then(|d| d.data_type);
        let dimensions = plan
            .structure
            .as_ref()
            .and_then(|s| s.def.as_dataset())
            .map(|d| d.dimensions.clone())
            .unwrap_or_default();

        let (link, info) = match (target, request.value) {
            (Some(target), _) => {
                let target_info = match &target {
                    LinkTarget::Internal { node, .. } => {
                        self.document.get(*node).and_then(|n| n.dataset.clone())
                    }
                    LinkTarget::External { .. } => None,
                };
                if let (Some(declared), Some(info)) = (declared, &target_info) {
                    if !validate_data_type(declared, info.dtype).is_valid {
                        return Err(Error::type_mismatch(
                            &plan.path,
                            declared.as_str(),
                            format!("link to {} data", info.dtype),
                        ));
                    }
                }
                self.write_link(&plan.path, NodeKind::Dataset, &target)?;
                let mut record = LinkRecord::new(target);
                record.target_dtype = target_info.as_ref().map(|info| info.dtype);
                let info = target_info.map(|mut info| {
                    info.dimensions.clone_from(&dimensions);
                    info
                });
                (Some(record), info)
            }
            (None, DataArg::Value(value)) => {
                let info = self.write_dataset(
                    &plan.path,
                    &value,
                    declared,
                    dimensions,
                    request.dtype.as_deref(),
                    request.compress,
                )?;
                (None, Some(info))
            }
            (None, other) => {
                return Err(Error::invalid_link(
                    &plan.path,
                    format!("unresolved link argument {other:?}"),
                ));
            }
        };

        self.register(plan, link, info, attributes)
    }

    fn write_dataset(
        &mut self,
        at: &str,
        value: &Value,
        declared: Option<DeclaredType>,
        dimensions: Vec<String>,
        dtype: Option<&str>,
        compress: bool,
    ) -> Result<DatasetInfo> {
        let (inferred, shape) = value.infer().map_err(|e| match e {
            h5gate_ir::Error::TypeMismatch { expected, found } => {
                Error::type_mismatch(at, expected, found)
            }
            other => other.into(),
        })?;

        if let Some(name) = dtype {
            let explicit = DeclaredType::parse(name)
                .map_err(|_| Error::type_mismatch(at, "a storage type name", name))?;
            if !validate_data_type(explicit, inferred).is_valid {
                return Err(Error::type_mismatch(at, name, inferred.as_str()));
            }
            if let Some(declared) = declared {
                if !declared.covers(explicit) {
                    return Err(Error::type_mismatch(
                        at,
                        declared.as_str(),
                        format!("dtype '{name}'"),
                    ));
                }
            }
        }
        if let Some(declared) = declared {
            if !validate_data_type(declared, inferred).is_valid {
                return Err(Error::type_mismatch(at, declared.as_str(), inferred.as_str()));
            }
        }

        let dims = validate_declared_dimensions(&dimensions, &shape);
        if let Some(message) = dims.message {
            self.warn(at, message);
        }

        let storage = dtype.map_or_else(
            || storage_type(inferred, declared).to_string(),
            str::to_string,
        );
        let compressed = compress || self.options.should_compress(value.byte_len());
        self.backend.create_dataset(at, value, &storage, compressed)?;

        Ok(DatasetInfo {
            dtype: inferred,
            storage_type: Some(storage),
            shape,
            dimensions,
            compressed,
        })
    }

    /// Combine schema attribute values with caller attributes; caller values win.
    pub(crate) fn merge_attributes(
        &mut self,
        plan: &Plan,
        attrs: BTreeMap<String, Value>,
        is_link: bool,
    ) -> Result<Vec<PendingAttribute>> {
        if is_link {
            if !attrs.is_empty() {
                let names: Vec<_> = attrs.keys().cloned().collect();
                self.warn(
                    &plan.path,
                    format!("attributes on a link are ignored: {}", names.join(", ")),
                );
            }
            return Ok(Vec::new());
        }

        let declared = plan.structure.as_ref().map(ResolvedStructure::attributes);
        let mut pending = Vec::new();

        if let Some(declared) = declared {
            for (name, def) in declared {
                if let (Some(value), false) = (&def.value, attrs.contains_key(name)) {
                    pending.push(PendingAttribute {
                        name: name.clone(),
                        value: value.clone(),
                        custom: false,
                    });
                }
            }
        }

        for (name, value) in attrs {
            let def = declared.and_then(|d| d.get(&name));
            if let Some(def) = def {
                let data_type = def.data_type.map(DeclaredType::as_str);
                check_attribute_type(&plan.path, &name, data_type, &value)?;
            }
            pending.push(PendingAttribute {
                custom: def.is_none(),
                name,
                value,
            });
        }
        Ok(pending)
    }

    /// Insert the node and wire it into the parent, lookup tables and backend attributes.
    pub(crate) fn register(
        &mut self,
        plan: Plan,
        link: Option<LinkRecord>,
        dataset: Option<DatasetInfo>,
        attributes: Vec<PendingAttribute>,
    ) -> Result<NodeId> {
        let mut node = Node::new(&plan.name, &plan.path, &plan.location, plan.sdef.clone());
        node.custom = plan.custom;
        node.dataset = dataset;
        node.link = link;

        if let Some(structure) = &plan.structure {
            for (name, def) in structure.attributes() {
                node.declared_attributes.insert(
                    name.clone(),
                    DeclaredAttribute {
                        data_type: def.data_type.map(|t| t.as_str().to_string()),
                        quantity: def.effective_quantity(),
                        dimensions: def.dimensions.clone(),
                    },
                );
            }
        }
        // A link borrows its target's contents, so it has no members of its own.
        if let Some(structure) = plan.structure.as_ref().filter(|_| node.link.is_none()) {
            for (key, member) in &structure.members {
                let mut stat =
                    MemberStat::new(&member.namespace, key, member.kind(), member.quantity);
                stat.included = member.source == MemberSource::Included;
                stat.allow_subclasses = member.allow_subclasses;
                node.members.insert(key.clone(), stat);
            }
            if let Some(group) = structure.def.as_group() {
                node.clauses = group
                    .required
                    .iter()
                    .map(|c| ConditionalClause {
                        name: c.name.clone(),
                        condition: c.clause.clone(),
                        message: c.message.clone(),
                    })
                    .collect();
                node.exclusions = group
                    .exclude_in
                    .iter()
                    .map(|e| Exclusion {
                        location: e.location.clone(),
                        member: e.member.clone(),
                        quantity: e.quantity,
                    })
                    .collect();
            }
        }

        let id = self.document.insert(node, plan.parent)?;

        if !plan.custom && plan.structure.is_some() && !self.is_link(id) && self.options.tag_schema_ids {
            self.write_attribute(id, &plan.path, "schema_id", Value::Text(plan.sdef.qualified()))?;
        }
        if plan.custom && self.options.flag_custom {
            self.write_attribute(id, &plan.path, "schema_custom", Value::Bool(true))?;
        }
        for attribute in attributes {
            self.write_attribute(id, &plan.path, &attribute.name, attribute.value)?;
            if attribute.custom {
                self.record_custom_attribute(&plan.path, &attribute.name);
            }
        }

        if let (Some(parent), Some(key)) = (plan.parent, &plan.member_key) {
            if let Some(stat) = self
                .document
                .get_mut(parent)
                .and_then(|p| p.members.get_mut(key))
            {
                stat.created.push(id);
            }
        }
        if let Some((namespace, key)) = &plan.lookup_key {
            if let Some(table) = self.lookups.get_mut(namespace) {
                table.record(key, &plan.location, id);
            }
        }
        if let Some(LinkTarget::Internal { node: target, .. }) =
            self.document.get(id).and_then(|n| n.link.as_ref()).map(|l| l.target.clone())
        {
            if let Some(target) = self.document.get_mut(target) {
                target.linked_from.push(id);
            }
        }

        if let Some(structure) = plan.structure {
            self.inject_parent_attributes(&plan.path, plan.parent, &structure)?;
            if plan.kind == NodeKind::Group && !self.is_link(id) {
                self.resolved.insert(id, structure);
            }
        }

        debug!(
            "Created {} {} ({})",
            plan.kind,
            plan.path,
            if plan.custom { "custom".to_string() } else { plan.sdef.qualified() }
        );
        Ok(id)
    }

    fn is_link(&self, id: NodeId) -> bool {
        self.document.get(id).is_some_and(Node::is_link)
    }

    fn write_attribute(&mut self, id: NodeId, at: &str, name: &str, value: Value) -> Result<()> {
        self.backend.set_attribute(at, name, &value)?;
        if let Some(node) = self.document.get_mut(id) {
            node.set_attribute(name, value);
        }
        Ok(())
    }

    /// Declare (and where valued, write) a child's `parent_attributes` on its parent.
    fn inject_parent_attributes(
        &mut self,
        child_path: &str,
        parent: Option<NodeId>,
        structure: &ResolvedStructure,
    ) -> Result<()> {
        if structure.parent_attributes.is_empty() {
            return Ok(());
        }
        let Some(parent) = parent else {
            self.warn(
                child_path,
                "parent attributes declared but the node has no parent group",
            );
            return Ok(());
        };
        let Some(parent_path) = self.document.get(parent).map(|p| p.path.clone()) else {
            return Err(Error::UnknownNode { node: parent });
        };

        for (name, def) in &structure.parent_attributes {
            if let Some(node) = self.document.get_mut(parent) {
                node.declared_attributes.insert(
                    name.clone(),
                    DeclaredAttribute {
                        data_type: def.data_type.map(|t| t.as_str().to_string()),
                        quantity: def.effective_quantity(),
                        dimensions: def.dimensions.clone(),
                    },
                );
            }
            if let Some(value) = &def.value {
                self.write_attribute(parent, &parent_path, name, value.clone())?;
            }
        }
        debug!(
            "Injected {} parent attribute(s) from {} into {}",
            structure.parent_attributes.len(),
            child_path,
            parent_path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_follows_declared_float() {
        assert_eq!(storage_type(DataType::Int, Some(DeclaredType::Float)), "float64");
        assert_eq!(storage_type(DataType::Int, Some(DeclaredType::Number)), "int64");
        assert_eq!(storage_type(DataType::Text, None), "text");
        assert_eq!(storage_type(DataType::Unknown, Some(DeclaredType::Bool)), "bool");
        assert_eq!(storage_type(DataType::Unknown, None), "float64");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("<Foo>/", "foo").is_ok());
        assert!(matches!(validate_name("<Foo>/", "a/b"), Err(Error::Naming { .. })));
        assert!(matches!(validate_name("<Foo>/", ""), Err(Error::Naming { .. })));
    }

    #[test]
    fn test_attribute_type_check() {
        assert!(check_attribute_type("/", "unit", Some("text"), &Value::from("s")).is_ok());
        assert!(check_attribute_type("/", "unit", None, &Value::from(3)).is_ok());
        let err = check_attribute_type("/g", "rate", Some("float"), &Value::from("fast")).unwrap_err();
        match err {
            Error::TypeMismatch { path, .. } => assert_eq!(path, "/g@rate"),
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }
}
