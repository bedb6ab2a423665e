//! Host-side DOM patch protocol.
//!
//! The host page mutates a [`crate::Document`] by applying ordered patch batches; each applied
//! batch shows up as mutation records, which is what observers get notified about.
//!
//! Invariants:
//! - Patches are applied in order; a failing patch stops the batch, earlier patches stay applied.
//! - References must point to live keys at the time they are used (except the `key` in create
//!   operations, which must be unallocated).
//! - `NodeKey::INVALID` is never valid in a patch.
//! - Element and attribute names are expected to be canonical ASCII-lowercase.
//! - Operations must not create cycles; a node may have at most one parent.

use crate::NodeKey;

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomPatch {
    /// Create a detached element node with initial attributes.
    CreateElement {
        key: NodeKey,
        name: String,
        attributes: Vec<(String, Option<String>)>,
    },
    /// Create a detached text node.
    CreateText { key: NodeKey, text: String },
    /// Create a detached comment node.
    CreateComment { key: NodeKey, text: String },
    /// Append a child to the end of a parent's children list.
    AppendChild { parent: NodeKey, child: NodeKey },
    /// Insert a child before an existing sibling.
    InsertBefore {
        parent: NodeKey,
        child: NodeKey,
        before: NodeKey,
    },
    /// Remove a node and its entire subtree. Keys in the subtree become invalid.
    RemoveNode { key: NodeKey },
    /// Replace all attributes on an element node.
    SetAttributes {
        key: NodeKey,
        attributes: Vec<(String, Option<String>)>,
    },
    /// Replace the text content of a text node.
    SetText { key: NodeKey, text: String },
}
