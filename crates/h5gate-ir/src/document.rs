//! Document: the node arena of one build session
#![allow(clippy::must_use_candidate)] // Accessor API reads clearly without pervasive #[must_use].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::node::{Node, NodeId};
use crate::{Error, Result};

/// All nodes constructed in a session, indexed by id and by full path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    nodes: Vec<Node>,

    /// Full path to node registry
    paths: BTreeMap<String, NodeId>,

    /// Nodes created as schema top-level instances (or custom nodes without a parent)
    top_level: Vec<NodeId>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, wiring it under `parent` when given.
    ///
    /// Nodes without a parent are recorded as top-level nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePath`] if a node already occupies the path and
    /// [`Error::NodeNotFound`] for an unknown parent.
    pub fn insert(&mut self, mut node: Node, parent: Option<NodeId>) -> Result<NodeId> {
        if self.paths.contains_key(&node.path) {
            return Err(Error::duplicate_path(&node.path));
        }
        if let Some(parent_id) = parent {
            if self.get(parent_id).is_none() {
                return Err(Error::node_not_found(format!("{parent_id}")));
            }
        }

        let id = NodeId::new(self.nodes.len());
        node.id = id;
        node.parent = parent;
        self.paths.insert(node.path.clone(), id);
        self.nodes.push(node);

        match parent {
            Some(parent_id) => self.nodes[parent_id.index()].children.push(id),
            None => self.top_level.push(id),
        }

        tracing::trace!("Inserted node {} at {}", id, self.nodes[id.index()].path);
        Ok(id)
    }

    /// Get a node by id
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by id
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Look up a node id by full path
    pub fn by_path(&self, path: &str) -> Option<NodeId> {
        self.paths.get(path).copied()
    }

    /// Get a node by full path
    pub fn node_at(&self, path: &str) -> Option<&Node> {
        self.by_path(path).and_then(|id| self.get(id))
    }

    /// Top-level nodes in creation order
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    /// All nodes in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of a node, resolved
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        self.get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.get(*child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SchemaRef;
    use crate::node::NodeKind;

    fn group(name: &str, path: &str) -> Node {
        Node::new(
            name,
            path,
            "/",
            SchemaRef::new("core", format!("{name}/"), NodeKind::Group),
        )
    }

    #[test]
    fn test_document_creation() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert!(doc.top_level().is_empty());
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut doc = Document::new();
        let root = doc.insert(group("", "/"), None).unwrap();
        let child = doc.insert(group("acq", "/acq"), Some(root)).unwrap();

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.by_path("/acq"), Some(child));
        assert_eq!(doc.get(child).unwrap().parent, Some(root));
        assert_eq!(doc.get(root).unwrap().children, vec![child]);
        assert_eq!(doc.top_level(), &[root]);
        assert_eq!(doc.children(root).count(), 1);
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut doc = Document::new();
        doc.insert(group("a", "/a"), None).unwrap();
        let err = doc.insert(group("a", "/a"), None).unwrap_err();
        assert_eq!(err, Error::duplicate_path("/a"));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut doc = Document::new();
        let result = doc.insert(group("a", "/a"), Some(NodeId::new(9)));
        assert!(matches!(result, Err(Error::NodeNotFound { .. })));
    }
}
