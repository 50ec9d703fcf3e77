//! Per-namespace lookup tables
//!
//! A lookup table maps every identifier listed in a namespace's `locations`
//! section to the container paths it may occupy, together with the declared
//! quantity and the nodes actually created there.

use crate::model::{CUSTOM_MARKER, Namespace, StructureId};
use crate::{Error, Result};
use h5gate_ir::{NodeId, NodeKind, Quantity};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One allowed location of an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    pub kind: NodeKind,
    pub quantity: Quantity,
    /// Nodes created at this location, in creation order
    pub created: Vec<NodeId>,
}

impl LookupEntry {
    /// Whether the entry is required and has no instance.
    pub fn is_missing(&self) -> bool {
        self.quantity.is_required() && self.created.is_empty()
    }
}

/// Identifier → location → entry index for one namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: BTreeMap<String, BTreeMap<String, LookupEntry>>,
    custom_locations: BTreeSet<String>,
}

impl LookupTable {
    /// Build the table from a namespace's `locations` section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownIdentifier`] for identifiers absent from the
    /// namespace's structures and [`Error::Specification`] for identifiers
    /// qualified with another namespace.
    pub fn build(namespace: &Namespace) -> Result<Self> {
        let mut table = Self::default();

        for (location, members) in &namespace.locations {
            for member in members {
                if member.identifier == CUSTOM_MARKER {
                    table.custom_locations.insert(location.clone());
                    continue;
                }

                let id = StructureId::parse(&member.identifier)?;
                if id.namespace_or(&namespace.name) != namespace.name {
                    return Err(Error::specification(format!(
                        "location '{location}' of namespace '{}' lists foreign identifier '{}'",
                        namespace.name, member.identifier
                    )));
                }
                let Some(structure) = namespace.structure(id.key()) else {
                    return Err(Error::unknown(
                        &namespace.name,
                        &member.identifier,
                        format!("listed in location '{location}' but not defined"),
                    ));
                };

                table
                    .entries
                    .entry(id.key().to_string())
                    .or_default()
                    .insert(
                        location.clone(),
                        LookupEntry {
                            kind: structure.def.kind(),
                            quantity: member.quantity,
                            created: Vec::new(),
                        },
                    );
            }
        }

        debug!(
            "Built lookup table for '{}': {} identifier(s), {} custom location(s)",
            namespace.name,
            table.entries.len(),
            table.custom_locations.len()
        );
        Ok(table)
    }

    /// Allowed locations of an identifier.
    pub fn locations(&self, identifier: &str) -> Option<&BTreeMap<String, LookupEntry>> {
        self.entries.get(identifier)
    }

    /// Whether the identifier appears in any location list.
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Record a created node under `identifier` at `location`.
    ///
    /// Returns `false` when the pair is not part of the table.
    pub fn record(&mut self, identifier: &str, location: &str, node: NodeId) -> bool {
        match self
            .entries
            .get_mut(identifier)
            .and_then(|locations| locations.get_mut(location))
        {
            Some(entry) => {
                entry.created.push(node);
                true
            }
            None => false,
        }
    }

    /// Whether custom nodes are explicitly allowed at the location.
    pub fn allows_custom(&self, location: &str) -> bool {
        self.custom_locations.contains(location)
    }

    /// Whether the namespace lists `__custom` under any location.
    pub fn restricts_custom(&self) -> bool {
        !self.custom_locations.is_empty()
    }

    /// All `(identifier, location, entry)` triples in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &LookupEntry)> {
        self.entries.iter().flat_map(|(id, locations)| {
            locations
                .iter()
                .map(move |(location, entry)| (id.as_str(), location.as_str(), entry))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SchemaLoader;
    use serde_json::json;

    fn namespace() -> Namespace {
        let doc = json!({
            "core": {
                "structures": {
                    "<TimeSeries>/": {},
                    "session_description": {"data_type": "text"}
                },
                "locations": {
                    "/": ["session_description", "<TimeSeries>/*", "__custom"],
                    "/acquisition/": ["<TimeSeries>/*"]
                }
            }
        });
        SchemaLoader::new()
            .load(&[doc], &[], "core")
            .unwrap()
            .namespace("core")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_build() {
        let table = LookupTable::build(&namespace()).unwrap();
        assert_eq!(table.len(), 2);

        let ts = table.locations("<TimeSeries>/").unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!(ts["/acquisition"].quantity, Quantity::ZeroOrMore);
        assert_eq!(ts["/acquisition"].kind, NodeKind::Group);

        let desc = &table.locations("session_description").unwrap()["/"];
        assert_eq!(desc.quantity, Quantity::Required);
        assert_eq!(desc.kind, NodeKind::Dataset);
        assert!(desc.is_missing());

        assert!(table.allows_custom("/"));
        assert!(!table.allows_custom("/acquisition"));
        assert!(table.restricts_custom());
        assert!(!LookupTable::default().restricts_custom());
    }

    #[test]
    fn test_record() {
        let mut table = LookupTable::build(&namespace()).unwrap();
        assert!(table.record("session_description", "/", NodeId::new(1)));
        assert!(!table.record("session_description", "/acquisition", NodeId::new(2)));
        assert!(!table.locations("session_description").unwrap()["/"].is_missing());
    }

    #[test]
    fn test_build_is_deterministic() {
        let ns = namespace();
        assert_eq!(LookupTable::build(&ns).unwrap(), LookupTable::build(&ns).unwrap());
    }
}
