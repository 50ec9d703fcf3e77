//! Merge and include resolution
//!
//! A structure's effective definition is built by applying the transitive
//! closure of its `merge` targets (farthest ancestor first), then its own
//! definition, and finally expanding the staged `include` entries into
//! members.

use crate::model::{AttributeDef, IncludeDef, StructureDef, StructureId};
use crate::registry::SchemaRegistry;
use crate::{Error, Result};
use h5gate_ir::{DataType, NodeKind, Quantity, Value};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt::Debug;
use tracing::{debug, trace};

/// How colliding scalar fields are treated while merging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Differing values are a merge conflict
    Merge,
    /// The incoming value wins (own definition, include-site modifiers)
    Override,
}

/// One description contributed by a structure in the merge chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionEntry {
    /// `ns:id` of the contributing structure
    pub origin: String,
    pub text: String,
}

/// Where a resolved member came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSource {
    /// Declared inline by the structure or one of its merge ancestors
    Defined,
    /// Composed through an `include` entry
    Included,
}

/// A member of a resolved group
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMember {
    /// Namespace the member definition resolves in
    pub namespace: String,
    pub id: StructureId,
    pub quantity: Quantity,
    pub source: MemberSource,
    pub allow_subclasses: bool,
    pub def: StructureDef,
}

impl ResolvedMember {
    pub fn kind(&self) -> NodeKind {
        self.def.kind()
    }

    /// `ns:id` form of the member identifier.
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.namespace, self.id.key())
    }
}

/// Fully expanded definition an instance must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStructure {
    pub namespace: String,
    pub id: StructureId,
    /// Description log, farthest ancestor first
    pub descriptions: Vec<DescriptionEntry>,
    /// Merged fields; members and includes are moved into `members`
    pub def: StructureDef,
    /// Merge closure as `ns:id`, nearest first
    pub ancestors: Vec<String>,
    /// Attributes to inject into the parent of an instance
    pub parent_attributes: BTreeMap<String, AttributeDef>,
    pub members: BTreeMap<String, ResolvedMember>,
}

impl ResolvedStructure {
    pub fn kind(&self) -> NodeKind {
        self.def.kind()
    }

    pub fn qualified(&self) -> String {
        format!("{}:{}", self.namespace, self.id.key())
    }

    pub fn is_abstract(&self) -> bool {
        self.def.common().is_abstract
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeDef> {
        &self.def.common().attributes
    }

    /// Description text with provenance, one line per contributing structure
    pub fn documentation(&self) -> String {
        self.descriptions
            .iter()
            .map(|entry| {
                if entry.origin == self.qualified() {
                    entry.text.clone()
                } else {
                    format!("{} (from {})", entry.text, entry.origin)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Accumulator for the merge chain of one structure
#[derive(Debug, Clone)]
pub struct Expansion {
    pub def: StructureDef,
    pub descriptions: Vec<DescriptionEntry>,
    pub parent_attributes: BTreeMap<String, AttributeDef>,
    /// Staged includes, resolved after all merges are applied
    pub includes: Vec<IncludeDef>,
    /// Field path to the structure that last set it
    provenance: BTreeMap<String, String>,
}

impl Expansion {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            def: StructureDef::empty(kind),
            descriptions: Vec::new(),
            parent_attributes: BTreeMap::new(),
            includes: Vec::new(),
            provenance: BTreeMap::new(),
        }
    }

    /// Merge one source definition into the accumulated definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MergeConflict`] naming both contributing structures
    /// when a field cannot be reconciled.
    pub fn merge_definition(
        &mut self,
        source: &StructureDef,
        origin: &str,
        mode: MergeMode,
    ) -> Result<()> {
        trace!("Merging {} into expansion ({:?})", origin, mode);
        let common = source.common();

        if let Some(text) = &common.description {
            self.descriptions.push(DescriptionEntry {
                origin: origin.to_string(),
                text: text.clone(),
            });
        }
        self.includes.extend(common.include.iter().cloned());

        let mut fields = FieldMerge {
            provenance: &mut self.provenance,
            origin,
            mode,
        };
        fields.merge_attributes(
            &mut self.parent_attributes,
            &common.parent_attributes,
            "parent_attributes.",
        )?;
        fields.merge_fields(&mut self.def, source, "", false)
    }
}

struct FieldMerge<'a> {
    provenance: &'a mut BTreeMap<String, String>,
    origin: &'a str,
    mode: MergeMode,
}

impl FieldMerge<'_> {
    fn record(&mut self, path: &str) {
        self.provenance
            .insert(path.to_string(), self.origin.to_string());
    }

    fn conflict(&self, path: &str, detail: String) -> Error {
        let first = self
            .provenance
            .get(path)
            .cloned()
            .unwrap_or_else(|| "an earlier definition".to_string());
        Error::merge_conflict(path, first, self.origin, detail)
    }

    fn claim<T: PartialEq + Clone + Debug>(
        &mut self,
        path: &str,
        dest: &mut Option<T>,
        src: Option<&T>,
    ) -> Result<()> {
        let Some(src) = src else {
            return Ok(());
        };
        match dest {
            Some(current) if current == src => Ok(()),
            Some(current) if self.mode == MergeMode::Merge => {
                Err(self.conflict(path, format!("{current:?} vs {src:?}")))
            }
            _ => {
                *dest = Some(src.clone());
                self.record(path);
                Ok(())
            }
        }
    }

    fn merge_fields(
        &mut self,
        dest: &mut StructureDef,
        src: &StructureDef,
        prefix: &str,
        nested: bool,
    ) -> Result<()> {
        if dest.kind() != src.kind() {
            return Err(self.conflict(
                &format!("{prefix}kind"),
                format!("cannot merge a {} into a {}", src.kind(), dest.kind()),
            ));
        }

        let src_common = src.common();
        {
            let dest_common = dest.common_mut();
            if nested {
                if src_common.description.is_some()
                    && (dest_common.description.is_none() || self.mode == MergeMode::Override)
                {
                    dest_common.description.clone_from(&src_common.description);
                }
                dest_common.include.extend(src_common.include.iter().cloned());
                dest_common.merge.extend(src_common.merge.iter().cloned());
                self.merge_attributes(
                    &mut dest_common.parent_attributes,
                    &src_common.parent_attributes,
                    &format!("{prefix}parent_attributes."),
                )?;
            }
            self.merge_attributes(
                &mut dest_common.attributes,
                &src_common.attributes,
                &format!("{prefix}attributes."),
            )?;
            self.claim(
                &format!("{prefix}link"),
                &mut dest_common.link,
                src_common.link.as_ref(),
            )?;
            for (key, value) in &src_common.extras {
                let mut current = dest_common.extras.get(key).cloned();
                self.claim(&format!("{prefix}{key}"), &mut current, Some(value))?;
                if let Some(current) = current {
                    dest_common.extras.insert(key.clone(), current);
                }
            }
        }

        match (dest, src) {
            (StructureDef::Group(dest), StructureDef::Group(src)) => {
                for (key, member) in &src.members {
                    let path = format!("{prefix}{key}");
                    match dest.members.get_mut(key) {
                        None => {
                            dest.members.insert(key.clone(), member.clone());
                            self.record(&format!("{path}.quantity"));
                        }
                        Some(existing) => {
                            let mut quantity = Some(existing.quantity);
                            self.claim(&format!("{path}.quantity"), &mut quantity, Some(&member.quantity))?;
                            existing.quantity = quantity.unwrap_or(existing.quantity);
                            self.merge_fields(&mut existing.def, &member.def, &format!("{path}."), true)?;
                        }
                    }
                }
                for condition in &src.required {
                    let path = format!("{prefix}_required.{}", condition.name);
                    let position = dest.required.iter().position(|c| c.name == condition.name);
                    let mut current = position.map(|i| dest.required[i].clone());
                    self.claim(&path, &mut current, Some(condition))?;
                    match (position, current) {
                        (Some(i), Some(c)) => dest.required[i] = c,
                        (None, Some(c)) => dest.required.push(c),
                        _ => {}
                    }
                }
                for exclusion in &src.exclude_in {
                    if !dest.exclude_in.contains(exclusion) {
                        dest.exclude_in.push(exclusion.clone());
                    }
                }
            }
            (StructureDef::Dataset(dest), StructureDef::Dataset(src)) => {
                let path = format!("{prefix}data_type");
                match (dest.data_type, src.data_type) {
                    (_, None) => {}
                    (None, Some(new)) => {
                        dest.data_type = Some(new);
                        self.record(&path);
                    }
                    (Some(current), Some(new)) => {
                        if current.covers(new) || self.mode == MergeMode::Override {
                            dest.data_type = Some(new);
                            self.record(&path);
                        } else if !new.covers(current) {
                            return Err(self.conflict(&path, format!("{current} vs {new}")));
                        }
                    }
                }
                let mut dims = (!dest.dimensions.is_empty()).then(|| dest.dimensions.clone());
                let src_dims = (!src.dimensions.is_empty()).then_some(&src.dimensions);
                self.claim(&format!("{prefix}dimensions"), &mut dims, src_dims)?;
                dest.dimensions = dims.unwrap_or_default();
            }
            _ => {}
        }
        Ok(())
    }

    fn merge_attributes(
        &mut self,
        dest: &mut BTreeMap<String, AttributeDef>,
        src: &BTreeMap<String, AttributeDef>,
        prefix: &str,
    ) -> Result<()> {
        for (name, attribute) in src {
            let path = format!("{prefix}{name}");
            let Some(existing) = dest.get_mut(name) else {
                dest.insert(name.clone(), attribute.clone());
                self.record(&format!("{path}.value"));
                continue;
            };

            self.merge_attribute_value(&format!("{path}.value"), &mut existing.value, attribute.value.as_ref())?;
            if let Some(new) = attribute.data_type {
                match existing.data_type {
                    Some(current) if !current.covers(new) && !new.covers(current) => {
                        if self.mode == MergeMode::Merge {
                            return Err(self.conflict(
                                &format!("{path}.data_type"),
                                format!("{current} vs {new}"),
                            ));
                        }
                        existing.data_type = Some(new);
                    }
                    Some(current) if new.covers(current) => {}
                    _ => existing.data_type = Some(new),
                }
            }
            if attribute.description.is_some() {
                existing.description.clone_from(&attribute.description);
            }
            if !attribute.dimensions.is_empty() {
                existing.dimensions.clone_from(&attribute.dimensions);
            }
            if attribute.quantity.is_some() {
                existing.quantity = attribute.quantity;
            }
        }
        Ok(())
    }

    /// Append-or-replace: `+text` appends comma-joined, anything else
    /// replaces a value of the same type family.
    fn merge_attribute_value(
        &mut self,
        path: &str,
        dest: &mut Option<Value>,
        src: Option<&Value>,
    ) -> Result<()> {
        let Some(new) = src else {
            return Ok(());
        };

        if let Value::Text(text) = new {
            if let Some(appended) = text.strip_prefix('+') {
                match dest {
                    Some(Value::Text(current)) => {
                        if !current.is_empty() {
                            current.push(',');
                        }
                        current.push_str(appended);
                    }
                    Some(other) => {
                        return Err(self.conflict(path, format!("cannot append text to {other}")));
                    }
                    None => *dest = Some(Value::Text(appended.to_string())),
                }
                self.record(path);
                return Ok(());
            }
        }

        if let Some(current) = dest {
            if !same_family(current, new) {
                return Err(self.conflict(path, format!("{current} vs {new}")));
            }
        }
        *dest = Some(new.clone());
        self.record(path);
        Ok(())
    }
}

fn same_family(a: &Value, b: &Value) -> bool {
    match (a.infer(), b.infer()) {
        (Ok((left, _)), Ok((right, _))) => {
            left == right || left == DataType::Unknown || right == DataType::Unknown
        }
        _ => false,
    }
}

/// Expands structures against a registry
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a top-level structure by namespace and key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownIdentifier`] for unknown structures or merge
    /// targets and [`Error::MergeConflict`] for irreconcilable fields.
    pub fn resolve(&self, namespace: &str, key: &str) -> Result<ResolvedStructure> {
        let structure = self.registry.structure(namespace, key)?;
        self.resolve_def(namespace, &structure.id, &structure.def)
    }

    /// Resolve a member of an already resolved group.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn resolve_member(&self, member: &ResolvedMember) -> Result<ResolvedStructure> {
        self.resolve_def(&member.namespace, &member.id, &member.def)
    }

    /// Resolve an arbitrary definition declared in `namespace`.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn resolve_def(
        &self,
        namespace: &str,
        id: &StructureId,
        def: &StructureDef,
    ) -> Result<ResolvedStructure> {
        let own = format!("{namespace}:{}", id.key());
        let closure = self.resolve_merges(namespace, &own, &def.common().merge)?;

        let mut expansion = Expansion::new(def.kind());
        for (ancestor_ns, ancestor_key) in closure.iter().rev() {
            let ancestor = self.registry.structure(ancestor_ns, ancestor_key)?;
            if ancestor.def.kind() != def.kind() {
                return Err(Error::specification(format!(
                    "'{own}' is a {} but merges {} '{ancestor_ns}:{ancestor_key}'",
                    def.kind(),
                    ancestor.def.kind()
                )));
            }
            expansion.merge_definition(
                &ancestor.def,
                &format!("{ancestor_ns}:{ancestor_key}"),
                MergeMode::Merge,
            )?;
        }
        expansion.merge_definition(def, &own, MergeMode::Override)?;

        let mut merged = expansion.def;
        merged.common_mut().is_abstract = def.common().is_abstract;
        merged.common_mut().include.clear();
        merged.common_mut().merge.clear();

        let mut members = BTreeMap::new();
        if let StructureDef::Group(group) = &mut merged {
            for (key, member) in std::mem::take(&mut group.members) {
                members.insert(
                    key,
                    ResolvedMember {
                        namespace: member.namespace,
                        id: member.id,
                        quantity: member.quantity,
                        source: MemberSource::Defined,
                        allow_subclasses: false,
                        def: member.def,
                    },
                );
            }
        }
        self.resolve_includes(&own, &expansion.includes, &mut members)?;

        if merged.kind() == NodeKind::Dataset && !members.is_empty() {
            return Err(Error::specification(format!(
                "dataset '{own}' cannot include members"
            )));
        }

        let ancestors: Vec<String> = closure
            .iter()
            .map(|(ns, key)| format!("{ns}:{key}"))
            .collect();
        debug!(
            "Resolved {} ({} ancestor(s), {} member(s))",
            own,
            ancestors.len(),
            members.len()
        );

        Ok(ResolvedStructure {
            namespace: namespace.to_string(),
            id: id.clone(),
            descriptions: expansion.descriptions,
            def: merged,
            ancestors,
            parent_attributes: expansion.parent_attributes,
            members,
        })
    }

    /// Breadth-first transitive closure of merge targets, nearest first.
    ///
    /// Identifiers already visited (including `own`) are skipped, so diamond
    /// and cyclic merge graphs terminate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownIdentifier`] if a target is not defined.
    pub fn resolve_merges(
        &self,
        namespace: &str,
        own: &str,
        targets: &[String],
    ) -> Result<Vec<(String, String)>> {
        let mut visited = HashSet::from([own.to_string()]);
        let mut queue: VecDeque<(String, String)> = targets
            .iter()
            .map(|t| (namespace.to_string(), t.clone()))
            .collect();
        let mut closure = Vec::new();

        while let Some((context, raw)) = queue.pop_front() {
            let (target_ns, id, structure) = self.registry.resolve_id(&raw, &context)?;
            let qualified = format!("{target_ns}:{}", id.key());
            if !visited.insert(qualified) {
                continue;
            }
            for next in &structure.def.common().merge {
                queue.push_back((target_ns.clone(), next.clone()));
            }
            closure.push((target_ns, id.key().to_string()));
        }
        Ok(closure)
    }

    /// Merge closure of a structure as `ns:id`, nearest first.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve_merges`].
    pub fn ancestors(&self, namespace: &str, key: &str) -> Result<Vec<String>> {
        let structure = self.registry.structure(namespace, key)?;
        let own = format!("{namespace}:{key}");
        Ok(self
            .resolve_merges(namespace, &own, &structure.def.common().merge)?
            .into_iter()
            .map(|(ns, key)| format!("{ns}:{key}"))
            .collect())
    }

    fn resolve_includes(
        &self,
        owner: &str,
        includes: &[IncludeDef],
        members: &mut BTreeMap<String, ResolvedMember>,
    ) -> Result<()> {
        for include in includes {
            let (target_ns, id, structure) =
                self.registry.resolve_id(&include.target, &include.namespace)?;
            let target = format!("{target_ns}:{}", id.key());

            let mut def = structure.def.clone();
            if let Some(modifiers) = &include.modifiers {
                let mut provenance = BTreeMap::new();
                let site = format!("{owner} include {target}");
                FieldMerge {
                    provenance: &mut provenance,
                    origin: &site,
                    mode: MergeMode::Override,
                }
                .merge_fields(&mut def, modifiers, "", true)?;
            }
            let quantity = include.quantity.unwrap_or_default();
            let key = id.key().to_string();

            match members.get_mut(&key) {
                Some(existing) if existing.source == MemberSource::Defined => {
                    return Err(Error::merge_conflict(
                        key,
                        owner,
                        format!("include {target}"),
                        "member is both defined and included",
                    ));
                }
                Some(existing) => {
                    if existing.quantity != quantity || existing.namespace != target_ns {
                        return Err(Error::merge_conflict(
                            key,
                            existing.qualified(),
                            format!("include {target}"),
                            format!("quantity {} vs {}", existing.quantity, quantity),
                        ));
                    }
                    existing.allow_subclasses |= include.allow_subclasses;
                    let mut provenance = BTreeMap::new();
                    FieldMerge {
                        provenance: &mut provenance,
                        origin: &target,
                        mode: MergeMode::Merge,
                    }
                    .merge_fields(&mut existing.def, &def, "", true)?;
                }
                None => {
                    trace!("Including {} into {} as {}{}", target, owner, key, quantity);
                    members.insert(
                        key,
                        ResolvedMember {
                            namespace: target_ns,
                            id,
                            quantity,
                            source: MemberSource::Included,
                            allow_subclasses: include.allow_subclasses,
                            def,
                        },
                    );
                }
            }
        }
        Ok(())
    }
}
