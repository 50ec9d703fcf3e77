//! Specification loader
//!
//! Reads namespace documents (JSON or YAML), merges documents that
//! contribute to the same namespace, converts the untyped mappings into the
//! typed structure model and builds the per-namespace lookup tables.

use crate::lookup::LookupTable;
use crate::model::{
    AttributeDef, ConditionDef, DatasetDef, DeclaredType, ExclusionDef, GroupDef, IncludeDef,
    LinkSpec, LocationMember, MemberDef, Namespace, NamespaceInfo, Structure, StructureCommon,
    StructureDef, StructureId, value_from_json,
};
use crate::registry::SchemaRegistry;
use crate::{Error, Result};
use h5gate_ir::{NodeKind, Quantity, path};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, trace};

/// Raw namespace body accumulated across documents
#[derive(Debug, Default)]
struct RawNamespace {
    info: Option<Json>,
    structures: Map<String, Json>,
    locations: Vec<(String, Vec<Json>)>,
}

/// Loads specification documents into a [`SchemaRegistry`]
#[derive(Debug, Default, Clone)]
pub struct SchemaLoader;

impl SchemaLoader {
    /// Create a new schema loader
    pub fn new() -> Self {
        Self
    }

    /// Parse a document from JSON text
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the text is not valid JSON.
    pub fn parse_json(&self, json: &str) -> Result<Json> {
        serde_json::from_str(json).map_err(|e| Error::Parse(format!("JSON parse error: {e}")))
    }

    /// Parse a document from YAML text
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the text is not valid YAML.
    pub fn parse_yaml(&self, yaml: &str) -> Result<Json> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Parse(format!("YAML parse error: {e}")))
    }

    /// Read a document from a file; `.yaml`/`.yml` selects the YAML parser
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Parse`]
    /// if it cannot be parsed.
    pub fn read_file(&self, path: &Path) -> Result<Json> {
        trace!("Loading specification from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            self.parse_yaml(&content)
        } else {
            self.parse_json(&content)
        }
    }

    /// Load specification files and imports into a registry
    ///
    /// # Errors
    ///
    /// Propagates file, parse and specification errors.
    pub fn load_files<P: AsRef<Path>>(
        &self,
        definitions: &[P],
        imports: &[P],
        default_namespace: &str,
    ) -> Result<SchemaRegistry> {
        let definitions = definitions
            .iter()
            .map(|p| self.read_file(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let imports = imports
            .iter()
            .map(|p| self.read_file(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.load(&definitions, &imports, default_namespace)
    }

    /// Merge parsed documents, validate their shape and build lookup tables
    ///
    /// # Errors
    ///
    /// Returns [`Error::Specification`] if the merged definitions are empty,
    /// a namespace lacks `structures` or `locations`, the default namespace
    /// is absent, a structure is malformed or a location references an
    /// identifier that is not defined.
    pub fn load(
        &self,
        definitions: &[Json],
        imports: &[Json],
        default_namespace: &str,
    ) -> Result<SchemaRegistry> {
        let mut raw: BTreeMap<String, RawNamespace> = BTreeMap::new();
        for (idx, doc) in definitions.iter().chain(imports.iter()).enumerate() {
            merge_document(&mut raw, doc, idx)?;
        }

        if raw.is_empty() {
            return Err(Error::specification("no namespaces defined"));
        }
        if !raw.contains_key(default_namespace) {
            return Err(Error::specification(format!(
                "default namespace '{default_namespace}' is not defined (found: {})",
                raw.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        }

        let mut namespaces = BTreeMap::new();
        for (name, body) in raw {
            let namespace = convert_namespace(&name, body)?;
            namespaces.insert(name, namespace);
        }

        let mut lookups = BTreeMap::new();
        for (name, namespace) in &namespaces {
            lookups.insert(name.clone(), LookupTable::build(namespace)?);
        }

        info!(
            "Loaded {} namespace(s), default '{}'",
            namespaces.len(),
            default_namespace
        );
        Ok(SchemaRegistry::new(
            namespaces,
            lookups,
            default_namespace.to_string(),
        ))
    }
}

fn merge_document(raw: &mut BTreeMap<String, RawNamespace>, doc: &Json, idx: usize) -> Result<()> {
    let Json::Object(namespaces) = doc else {
        return Err(Error::specification(format!(
            "document {idx} must map namespace names to namespace bodies"
        )));
    };

    for (name, body) in namespaces {
        let Json::Object(body) = body else {
            return Err(Error::specification(format!(
                "namespace '{name}' must be a mapping"
            )));
        };
        let structures = match body.get("structures") {
            Some(Json::Object(s)) => s,
            Some(_) => {
                return Err(Error::specification(format!(
                    "'structures' of namespace '{name}' must be a mapping"
                )));
            }
            None => {
                return Err(Error::specification(format!(
                    "namespace '{name}' has no 'structures'"
                )));
            }
        };
        let locations = match body.get("locations") {
            Some(Json::Object(l)) => l,
            Some(_) => {
                return Err(Error::specification(format!(
                    "'locations' of namespace '{name}' must be a mapping"
                )));
            }
            None => {
                return Err(Error::specification(format!(
                    "namespace '{name}' has no 'locations'"
                )));
            }
        };

        let entry = raw.entry(name.clone()).or_default();
        if entry.info.is_none() {
            entry.info = body.get("info").cloned();
        }
        for (key, def) in structures {
            if entry.structures.contains_key(key) {
                return Err(Error::specification(format!(
                    "structure '{key}' defined more than once in namespace '{name}'"
                )));
            }
            entry.structures.insert(key.clone(), def.clone());
        }
        for (location, ids) in locations {
            let Json::Array(ids) = ids else {
                return Err(Error::specification(format!(
                    "location '{location}' of namespace '{name}' must list identifiers"
                )));
            };
            entry.locations.push((location.clone(), ids.clone()));
        }
        debug!(
            "Merged document {} into namespace '{}' ({} structures)",
            idx,
            name,
            structures.len()
        );
    }
    Ok(())
}

fn convert_namespace(name: &str, body: RawNamespace) -> Result<Namespace> {
    let info = match body.info {
        Some(info) => serde_json::from_value::<NamespaceInfo>(info)
            .map_err(|e| Error::specification(format!("info of namespace '{name}': {e}")))?,
        None => NamespaceInfo::default(),
    };

    let mut structures = BTreeMap::new();
    for (key, def) in &body.structures {
        let id = StructureId::parse(key)?;
        if let Some(ns) = &id.namespace {
            return Err(Error::specification(format!(
                "structure key '{key}' in namespace '{name}' must not be qualified with '{ns}'"
            )));
        }
        let def = parse_structure(name, &id, def, key)?;
        structures.insert(id.key().to_string(), Structure { id, def });
    }

    let mut locations: BTreeMap<String, Vec<LocationMember>> = BTreeMap::new();
    for (location, ids) in body.locations {
        let normalized = path::normalize(&location)
            .map_err(|e| Error::specification(format!("location '{location}': {e}")))?;
        let members = locations.entry(normalized).or_default();
        for id in ids {
            let Json::String(raw) = id else {
                return Err(Error::specification(format!(
                    "location '{location}' of namespace '{name}' lists a non-string identifier"
                )));
            };
            let (identifier, quantity) = Quantity::split(&raw);
            let member = LocationMember {
                identifier: identifier.to_string(),
                quantity: quantity.unwrap_or_default(),
            };
            if !members.contains(&member) {
                members.push(member);
            }
        }
    }

    Ok(Namespace {
        name: name.to_string(),
        info,
        structures,
        locations,
    })
}

/// Convert one untyped structure mapping into a typed definition
///
/// # Errors
///
/// Returns [`Error::Specification`] describing the first malformed key.
pub fn parse_structure(
    namespace: &str,
    id: &StructureId,
    json: &Json,
    origin: &str,
) -> Result<StructureDef> {
    parse_definition(namespace, id.kind, json, origin)
}

fn parse_definition(namespace: &str, kind: NodeKind, json: &Json, origin: &str) -> Result<StructureDef> {
    let Json::Object(map) = json else {
        return Err(Error::specification(format!(
            "definition of '{origin}' must be a mapping"
        )));
    };

    let mut common = StructureCommon::default();
    let mut group = GroupDef::default();
    let mut dataset = DatasetDef::default();

    for (key, value) in map {
        match key.as_str() {
            "description" => common.description = Some(expect_str(value, origin, key)?.to_string()),
            "merge" => common.merge = string_list(value, origin, key)?,
            "include" => common.include = parse_includes(namespace, value, origin)?,
            "attributes" => common.attributes = parse_attributes(value, origin, key)?,
            "parent_attributes" => {
                common.parent_attributes = parse_attributes(value, origin, key)?;
            }
            "link" => common.link = Some(parse_link(value, origin)?),
            "data_type" => {
                if kind == NodeKind::Group {
                    return Err(Error::specification(format!(
                        "group '{origin}' cannot declare a data_type"
                    )));
                }
                dataset.data_type = Some(DeclaredType::parse(expect_str(value, origin, key)?)?);
            }
            "dimensions" => {
                if kind == NodeKind::Group {
                    return Err(Error::specification(format!(
                        "group '{origin}' cannot declare dimensions"
                    )));
                }
                dataset.dimensions = string_list(value, origin, key)?;
            }
            "_required" => group.required = parse_required(value, origin)?,
            "_exclude_in" => group.exclude_in = parse_exclusions(value, origin)?,
            "_properties" => {
                let Json::Object(props) = value else {
                    return Err(Error::specification(format!(
                        "'_properties' of '{origin}' must be a mapping"
                    )));
                };
                for (prop, prop_value) in props {
                    if prop == "abstract" {
                        common.is_abstract = prop_value.as_bool().ok_or_else(|| {
                            Error::specification(format!(
                                "'_properties.abstract' of '{origin}' must be a boolean"
                            ))
                        })?;
                    } else {
                        common
                            .extras
                            .insert(format!("_properties.{prop}"), prop_value.clone());
                    }
                }
            }
            other if other.starts_with('_') => {
                common.extras.insert(other.to_string(), value.clone());
            }
            other => {
                if kind == NodeKind::Dataset {
                    return Err(Error::specification(format!(
                        "dataset '{origin}' cannot declare member '{other}'"
                    )));
                }
                if !value.is_object() {
                    return Err(Error::specification(format!(
                        "unexpected value for key '{other}' in '{origin}'"
                    )));
                }
                let (raw_id, quantity) = Quantity::split(other);
                let member_id = StructureId::parse(raw_id)?;
                let member_origin = format!("{origin}{raw_id}");
                let def = parse_definition(namespace, member_id.kind, value, &member_origin)?;
                group.members.insert(
                    member_id.key().to_string(),
                    MemberDef {
                        id: member_id,
                        quantity: quantity.unwrap_or_default(),
                        namespace: namespace.to_string(),
                        def,
                    },
                );
            }
        }
    }

    if (!group.required.is_empty() || !group.exclude_in.is_empty()) && kind == NodeKind::Dataset {
        return Err(Error::specification(format!(
            "dataset '{origin}' cannot declare '_required' or '_exclude_in'"
        )));
    }

    Ok(match kind {
        NodeKind::Group => {
            group.common = common;
            StructureDef::Group(group)
        }
        NodeKind::Dataset => {
            dataset.common = common;
            StructureDef::Dataset(dataset)
        }
    })
}

fn expect_str<'a>(value: &'a Json, origin: &str, key: &str) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        Error::specification(format!("'{key}' of '{origin}' must be a string"))
    })
}

fn string_list(value: &Json, origin: &str, key: &str) -> Result<Vec<String>> {
    match value {
        Json::String(s) => Ok(vec![s.clone()]),
        Json::Array(items) => items
            .iter()
            .map(|item| expect_str(item, origin, key).map(str::to_string))
            .collect(),
        _ => Err(Error::specification(format!(
            "'{key}' of '{origin}' must be a string or a list of strings"
        ))),
    }
}

fn parse_includes(namespace: &str, value: &Json, origin: &str) -> Result<Vec<IncludeDef>> {
    let entries: Vec<(String, Option<&Json>)> = match value {
        Json::Array(items) => items
            .iter()
            .map(|item| expect_str(item, origin, "include").map(|s| (s.to_string(), None)))
            .collect::<Result<_>>()?,
        Json::Object(map) => map.iter().map(|(k, v)| (k.clone(), Some(v))).collect(),
        _ => {
            return Err(Error::specification(format!(
                "'include' of '{origin}' must be a mapping or a list"
            )));
        }
    };

    let mut includes = Vec::with_capacity(entries.len());
    for (raw, modifiers) in entries {
        let (target, quantity) = Quantity::split(&raw);
        let target_id = StructureId::parse(target)?;
        let mut allow_subclasses = false;
        let mut parsed_modifiers = None;

        if let Some(Json::Object(map)) = modifiers {
            let mut map = map.clone();
            if let Some(options) = map.remove("_options") {
                allow_subclasses = options
                    .get("subclasses")
                    .and_then(Json::as_bool)
                    .unwrap_or(false);
            }
            if !map.is_empty() {
                let site = format!("{origin} include {target}");
                let def = parse_definition(namespace, target_id.kind, &Json::Object(map), &site)?;
                parsed_modifiers = Some(Box::new(def));
            }
        } else if let Some(other) = modifiers {
            if !other.is_null() {
                return Err(Error::specification(format!(
                    "modifiers of include '{raw}' in '{origin}' must be a mapping"
                )));
            }
        }

        includes.push(IncludeDef {
            target: target.to_string(),
            quantity,
            modifiers: parsed_modifiers,
            allow_subclasses,
            namespace: namespace.to_string(),
        });
    }
    Ok(includes)
}

fn parse_attributes(value: &Json, origin: &str, key: &str) -> Result<BTreeMap<String, AttributeDef>> {
    let Json::Object(map) = value else {
        return Err(Error::specification(format!(
            "'{key}' of '{origin}' must be a mapping"
        )));
    };

    let mut attributes = BTreeMap::new();
    for (raw_name, def) in map {
        let Json::Object(fields) = def else {
            return Err(Error::specification(format!(
                "attribute '{raw_name}' of '{origin}' must be a mapping"
            )));
        };
        let (name, suffix_quantity) = Quantity::split(raw_name);
        let mut attribute = AttributeDef {
            quantity: suffix_quantity,
            ..AttributeDef::default()
        };
        for (field, field_value) in fields {
            let context = format!("{origin}@{name}");
            match field.as_str() {
                "data_type" => {
                    attribute.data_type =
                        Some(DeclaredType::parse(expect_str(field_value, &context, field)?)?);
                }
                "value" => attribute.value = Some(value_from_json(field_value)?),
                "description" => {
                    attribute.description =
                        Some(expect_str(field_value, &context, field)?.to_string());
                }
                "dimensions" => attribute.dimensions = string_list(field_value, &context, field)?,
                "quantity" | "qty" => {
                    let marker = expect_str(field_value, &context, field)?;
                    let mut chars = marker.chars();
                    attribute.quantity = match (chars.next().and_then(Quantity::from_suffix), chars.next()) {
                        (Some(q), None) => Some(q),
                        _ => {
                            return Err(Error::specification(format!(
                                "invalid quantity '{marker}' for attribute '{context}'"
                            )));
                        }
                    };
                }
                _ => trace!("Ignoring attribute field '{}' of {}", field, context),
            }
        }
        attributes.insert(name.to_string(), attribute);
    }
    Ok(attributes)
}

fn parse_link(value: &Json, origin: &str) -> Result<LinkSpec> {
    let Json::Object(map) = value else {
        return Err(Error::specification(format!(
            "'link' of '{origin}' must be a mapping"
        )));
    };
    let target_type = map
        .get("target_type")
        .and_then(Json::as_str)
        .ok_or_else(|| {
            Error::specification(format!("'link' of '{origin}' requires a 'target_type'"))
        })?;
    let allow_subclasses = map
        .get("allow_subclasses")
        .and_then(Json::as_bool)
        .unwrap_or(false);
    Ok(LinkSpec {
        target_type: target_type.to_string(),
        allow_subclasses,
    })
}

fn parse_required(value: &Json, origin: &str) -> Result<Vec<ConditionDef>> {
    let Json::Object(map) = value else {
        return Err(Error::specification(format!(
            "'_required' of '{origin}' must be a mapping"
        )));
    };
    map.iter()
        .map(|(name, clause)| match clause {
            Json::Array(parts) if parts.len() == 2 => Ok(ConditionDef {
                name: name.clone(),
                clause: expect_str(&parts[0], origin, "_required")?.to_string(),
                message: expect_str(&parts[1], origin, "_required")?.to_string(),
            }),
            _ => Err(Error::specification(format!(
                "'_required.{name}' of '{origin}' must be [condition, message]"
            ))),
        })
        .collect()
}

fn parse_exclusions(value: &Json, origin: &str) -> Result<Vec<ExclusionDef>> {
    let Json::Object(map) = value else {
        return Err(Error::specification(format!(
            "'_exclude_in' of '{origin}' must be a mapping"
        )));
    };
    let mut exclusions = Vec::new();
    for (location, members) in map {
        let location = path::normalize(location)
            .map_err(|e| Error::specification(format!("'_exclude_in' of '{origin}': {e}")))?;
        for member in string_list(members, origin, "_exclude_in")? {
            let (id, quantity) = Quantity::split(&member);
            exclusions.push(ExclusionDef {
                location: location.clone(),
                member: id.to_string(),
                quantity: quantity.unwrap_or(Quantity::Optional),
            });
        }
    }
    Ok(exclusions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Json {
        json!({
            "core": {
                "info": {"name": "core", "version": "1.0"},
                "structures": {
                    "/": {"description": "root"},
                    "session_description": {"data_type": "text"},
                    "<TimeSeries>/": {
                        "description": "a time series",
                        "attributes": {"unit": {"data_type": "text", "value": "s"}},
                        "data": {"data_type": "number", "dimensions": ["num_times"]},
                        "timestamps?": {"data_type": "float"},
                        "_required": {"time": ["data AND timestamps", "needs timestamps"]}
                    }
                },
                "locations": {
                    "/": ["session_description!", "<TimeSeries>/*"]
                }
            }
        })
    }

    #[test]
    fn test_load_minimal() {
        let registry = SchemaLoader::new().load(&[minimal()], &[], "core").unwrap();
        let ns = registry.namespace("core").unwrap();
        assert_eq!(ns.structures.len(), 3);
        assert_eq!(ns.info.version.as_deref(), Some("1.0"));
        assert_eq!(ns.locations["/"].len(), 2);

        let ts = ns.structure("<TimeSeries>/").unwrap();
        let group = ts.def.as_group().unwrap();
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.members["timestamps"].quantity, Quantity::Optional);
        assert_eq!(group.members["data"].quantity, Quantity::Required);
        assert_eq!(group.required.len(), 1);
        assert_eq!(
            group.common.attributes["unit"].value,
            Some(h5gate_ir::Value::from("s"))
        );
    }

    #[test]
    fn test_empty_definitions_rejected() {
        let err = SchemaLoader::new().load(&[], &[], "core").unwrap_err();
        assert!(matches!(err, Error::Specification(_)));
    }

    #[test]
    fn test_missing_structures_rejected() {
        let doc = json!({"core": {"locations": {}}});
        let err = SchemaLoader::new().load(&[doc], &[], "core").unwrap_err();
        assert!(err.to_string().contains("has no 'structures'"));
    }

    #[test]
    fn test_missing_locations_rejected() {
        let doc = json!({"core": {"structures": {}}});
        let err = SchemaLoader::new().load(&[doc], &[], "core").unwrap_err();
        assert!(err.to_string().contains("has no 'locations'"));
    }

    #[test]
    fn test_missing_default_namespace_rejected() {
        let err = SchemaLoader::new()
            .load(&[minimal()], &[], "other")
            .unwrap_err();
        assert!(err.to_string().contains("default namespace 'other'"));
    }

    #[test]
    fn test_undefined_location_identifier_rejected() {
        let doc = json!({
            "core": {"structures": {}, "locations": {"/": ["missing"]}}
        });
        let err = SchemaLoader::new().load(&[doc], &[], "core").unwrap_err();
        assert!(matches!(err, Error::UnknownIdentifier { .. }));
    }

    #[test]
    fn test_unreferenced_structures_tolerated() {
        let doc = json!({
            "core": {"structures": {"<Base>/": {}}, "locations": {}}
        });
        assert!(SchemaLoader::new().load(&[doc], &[], "core").is_ok());
    }

    #[test]
    fn test_documents_merge_per_namespace() {
        let extra = json!({
            "core": {
                "structures": {"notes": {"data_type": "text"}},
                "locations": {"/": ["notes?", "session_description!"]}
            }
        });
        let registry = SchemaLoader::new()
            .load(&[minimal()], &[extra], "core")
            .unwrap();
        let ns = registry.namespace("core").unwrap();
        assert!(ns.structure("notes").is_some());
        assert_eq!(ns.locations["/"].len(), 3);
    }

    #[test]
    fn test_duplicate_structure_rejected() {
        let extra = json!({
            "core": {"structures": {"session_description": {}}, "locations": {}}
        });
        let err = SchemaLoader::new()
            .load(&[minimal()], &[extra], "core")
            .unwrap_err();
        assert!(err.to_string().contains("defined more than once"));
    }

    #[test]
    fn test_dataset_members_rejected() {
        let doc = json!({
            "core": {"structures": {"d": {"child": {}}}, "locations": {}}
        });
        assert!(SchemaLoader::new().load(&[doc], &[], "core").is_err());
    }

    #[test]
    fn test_includes_parsed() {
        let doc = json!({
            "core": {
                "structures": {
                    "<TimeSeries>/": {},
                    "<Module>/": {
                        "include": {
                            "<TimeSeries>/*": {
                                "_options": {"subclasses": true},
                                "description": "overridden"
                            }
                        }
                    }
                },
                "locations": {}
            }
        });
        let registry = SchemaLoader::new().load(&[doc], &[], "core").unwrap();
        let module = registry.namespace("core").unwrap().structure("<Module>/").unwrap();
        let include = &module.def.common().include[0];
        assert_eq!(include.target, "<TimeSeries>/");
        assert_eq!(include.quantity, Some(Quantity::ZeroOrMore));
        assert!(include.allow_subclasses);
        assert_eq!(
            include.modifiers.as_ref().unwrap().common().description.as_deref(),
            Some("overridden")
        );
    }

    #[test]
    fn test_abstract_and_exclusions() {
        let doc = json!({
            "core": {
                "structures": {
                    "<Base>/": {
                        "_properties": {"abstract": true},
                        "_exclude_in": {"/stimulus/templates/": ["timestamps!", "num_samples"]}
                    }
                },
                "locations": {}
            }
        });
        let registry = SchemaLoader::new().load(&[doc], &[], "core").unwrap();
        let base = registry.namespace("core").unwrap().structure("<Base>/").unwrap();
        assert!(base.def.common().is_abstract);
        let group = base.def.as_group().unwrap();
        assert_eq!(group.exclude_in.len(), 2);
        assert_eq!(group.exclude_in[0].location, "/stimulus/templates");
        assert_eq!(group.exclude_in[0].quantity, Quantity::Required);
        assert_eq!(group.exclude_in[1].quantity, Quantity::Optional);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
core:
  structures:
    "<Foo>/":
      description: foo
      base: {data_type: int}
  locations:
    "/": ["<Foo>/*"]
"#;
        let loader = SchemaLoader::new();
        let doc = loader.parse_yaml(yaml).unwrap();
        let registry = loader.load(&[doc], &[], "core").unwrap();
        assert!(registry.namespace("core").unwrap().structure("<Foo>/").is_some());
    }

    #[test]
    fn test_load_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.json");
        std::fs::write(&path, minimal().to_string()).unwrap();
        let registry = SchemaLoader::new()
            .load_files(&[path.as_path()], &[], "core")
            .unwrap();
        assert_eq!(registry.default_namespace(), "core");
    }

    #[test]
    fn test_invalid_json_rejected() {
        let result = SchemaLoader::new().parse_json("not valid json");
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
