//! Registry of loaded namespaces

use crate::lookup::LookupTable;
use crate::model::{Namespace, Structure, StructureId};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Loaded, immutable specification: namespaces plus their template lookup tables
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    namespaces: BTreeMap<String, Namespace>,
    lookups: BTreeMap<String, LookupTable>,
    default_namespace: String,
}

impl SchemaRegistry {
    /// Create a registry from already validated parts
    pub fn new(
        namespaces: BTreeMap<String, Namespace>,
        lookups: BTreeMap<String, LookupTable>,
        default_namespace: String,
    ) -> Self {
        Self {
            namespaces,
            lookups,
            default_namespace,
        }
    }

    /// Name of the default namespace
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Get a namespace by name
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// All namespaces in name order
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// Check if a namespace exists
    pub fn contains(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    /// Template lookup table of a namespace
    pub fn lookup(&self, namespace: &str) -> Option<&LookupTable> {
        self.lookups.get(namespace)
    }

    /// Fresh copies of every lookup table, for one build session
    pub fn lookup_tables(&self) -> BTreeMap<String, LookupTable> {
        self.lookups.clone()
    }

    /// Get a structure by namespace and key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownIdentifier`] if the namespace or the key is unknown.
    pub fn structure(&self, namespace: &str, key: &str) -> Result<&Structure> {
        let ns = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| Error::unknown(namespace, key, "namespace is not loaded"))?;
        ns.structure(key)
            .ok_or_else(|| Error::unknown(namespace, key, "not defined in namespace"))
    }

    /// Parse a possibly qualified identifier and resolve it relative to
    /// `referencing_namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Specification`] for malformed identifiers and
    /// [`Error::UnknownIdentifier`] if the structure is not defined.
    pub fn resolve_id(
        &self,
        raw: &str,
        referencing_namespace: &str,
    ) -> Result<(String, StructureId, &Structure)> {
        let id = StructureId::parse(raw)?;
        let namespace = id.namespace_or(referencing_namespace).to_string();
        let structure = self.structure(&namespace, id.key())?;
        Ok((namespace, id, structure))
    }
}
