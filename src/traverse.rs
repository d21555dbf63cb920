//! Traversal driver: pre-order depth-first walk over a borrowed tree.
//!
//! The walk and the dispatch logic are split the same way as a visitor:
//! [`walk`] owns the recursion and the ancestor stack, a [`Visit`]
//! implementation receives `enter`/`leave` callbacks with the node and its
//! ancestor chain. Returning an error from a visit stops the walk
//! immediately, which is the caller-driven cancellation sentinel.
//!
//! # Traversal Order
//!
//! - `enter` is called before descending into children
//! - Children come from the node tag's entry in the [`ChildKeyMap`], slots
//!   visited in declared order; a slot may hold one node or an ordered
//!   sequence of nodes
//! - Tags absent from the map fall back to enumerating the node's own
//!   fields in deterministic (lexicographic) order, skipping non-node
//!   values
//! - `leave` is called after all children have been visited; a leaf gets
//!   `enter` then `leave` with nothing between

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RunError;
use crate::node::{is_node, tag_of};

// ============================================================================
// Child Key Map
// ============================================================================

/// Per-type-tag ordered list of child-bearing field names.
///
/// Tags without an entry are traversed through the fallback enumerator, so
/// an incomplete map degrades to full (if less precisely ordered)
/// traversal rather than silently skipping subtrees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildKeyMap {
    entries: HashMap<String, Vec<String>>,
}

impl ChildKeyMap {
    /// Create an empty map; every tag will use the fallback enumerator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with<N, K, I>(mut self, tag: N, keys: I) -> Self
    where
        N: Into<String>,
        K: Into<String>,
        I: IntoIterator<Item = K>,
    {
        self.insert(tag, keys);
        self
    }

    /// Register the ordered child-field list for a tag, replacing any
    /// previous list.
    pub fn insert<N, K, I>(&mut self, tag: N, keys: I)
    where
        N: Into<String>,
        K: Into<String>,
        I: IntoIterator<Item = K>,
    {
        self.entries
            .insert(tag.into(), keys.into_iter().map(Into::into).collect());
    }

    /// The ordered child-field list for a tag, if registered.
    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.entries.get(tag).map(Vec::as_slice)
    }
}

// ============================================================================
// Child enumeration
// ============================================================================

/// The flattened ordered child list of a node.
///
/// Also used by the matcher for sibling and position tests, so both sides
/// of the engine agree on what "the children" are.
pub(crate) fn flat_children<'t>(
    node: &'t Value,
    type_field: &str,
    child_keys: &ChildKeyMap,
) -> Vec<&'t Value> {
    let mut children = Vec::new();
    let Some(object) = node.as_object() else {
        return children;
    };
    match tag_of(node, type_field).and_then(|tag| child_keys.get(tag)) {
        Some(slots) => {
            for key in slots {
                if let Some(value) = object.get(key) {
                    collect_slot(value, type_field, &mut children);
                }
            }
        }
        None => {
            for value in object.values() {
                collect_slot(value, type_field, &mut children);
            }
        }
    }
    children
}

fn collect_slot<'t>(value: &'t Value, type_field: &str, children: &mut Vec<&'t Value>) {
    match value {
        Value::Array(items) => {
            children.extend(items.iter().filter(|item| is_node(item, type_field)));
        }
        single if is_node(single, type_field) => children.push(single),
        _ => {}
    }
}

// ============================================================================
// Walk
// ============================================================================

/// Read-only traversal callbacks.
///
/// `ancestry` is the path from the root to the node's parent, root first;
/// it is empty for the root itself, and identical for `enter` and `leave`.
pub trait Visit<'t> {
    /// Called pre-order, before the node's children.
    fn enter(&mut self, node: &'t Value, ancestry: &[&'t Value]) -> Result<(), RunError>;

    /// Called post-order, after the node's children.
    fn leave(&mut self, node: &'t Value, ancestry: &[&'t Value]) -> Result<(), RunError>;
}

/// Walk a tree depth-first, invoking the visitor at each node.
///
/// The root must be a node (an object whose `type_field` holds a string).
/// The tree is borrowed for the whole walk and must not be mutated; a
/// `serde_json::Value` tree is acyclic by construction, so the walk always
/// terminates.
pub fn walk<'t, V: Visit<'t>>(
    root: &'t Value,
    type_field: &str,
    child_keys: &ChildKeyMap,
    visitor: &mut V,
) -> Result<(), RunError> {
    if !is_node(root, type_field) {
        return Err(RunError::InvalidRoot {
            field: type_field.to_string(),
        });
    }
    let mut ancestry: Vec<&'t Value> = Vec::new();
    walk_node(root, type_field, child_keys, &mut ancestry, visitor)
}

fn walk_node<'t, V: Visit<'t>>(
    node: &'t Value,
    type_field: &str,
    child_keys: &ChildKeyMap,
    ancestry: &mut Vec<&'t Value>,
    visitor: &mut V,
) -> Result<(), RunError> {
    visitor.enter(node, ancestry)?;
    ancestry.push(node);
    for child in flat_children(node, type_field, child_keys) {
        walk_node(child, type_field, child_keys, ancestry, visitor)?;
    }
    ancestry.pop();
    visitor.leave(node, ancestry)
}
