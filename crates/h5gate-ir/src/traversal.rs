//! Depth-first traversal of the node tree

use crate::document::Document;
use crate::node::{Node, NodeId};

/// Visitor over the node tree
pub trait Traversal {
    /// Visit a node
    fn visit(&mut self, node: &Node, depth: usize);

    /// Called when entering a group with children
    fn enter(&mut self, _node: &Node, _depth: usize) {}

    /// Called when leaving a group with children
    fn leave(&mut self, _node: &Node, _depth: usize) {}

    /// Returns true if traversal should continue
    fn should_continue(&self) -> bool {
        true
    }
}

/// Walk the subtree rooted at `start` depth-first, children in creation order
pub fn walk<T: Traversal + ?Sized>(doc: &Document, start: NodeId, visitor: &mut T) {
    walk_inner(doc, start, 0, visitor);
}

fn walk_inner<T: Traversal + ?Sized>(doc: &Document, id: NodeId, depth: usize, visitor: &mut T) {
    if !visitor.should_continue() {
        return;
    }
    let Some(node) = doc.get(id) else {
        return;
    };

    visitor.visit(node, depth);

    if node.children.is_empty() {
        return;
    }
    visitor.enter(node, depth);
    for child in &node.children {
        walk_inner(doc, *child, depth + 1, visitor);
    }
    visitor.leave(node, depth);
}

/// Walk every top-level subtree in creation order
pub fn walk_all<T: Traversal + ?Sized>(doc: &Document, visitor: &mut T) {
    for id in doc.top_level() {
        walk(doc, *id, visitor);
    }
}
