use crate::error::DomError;
use crate::patch::DomPatch;
use html::Node;
use std::collections::{HashMap, HashSet};

/// Stable node identity within one document. Keys are never reused, so a key held across
/// mutations either still names the same node or is no longer live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

impl NodeKey {
    /// Reserved sentinel for "unassigned/invalid" identity.
    pub const INVALID: NodeKey = NodeKey(0);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document {
        doctype: Option<String>,
    },
    Element {
        name: String,
        attributes: Vec<(String, Option<String>)>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

/// What an observer is told after the tree changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    ChildList {
        parent: NodeKey,
        added: Vec<NodeKey>,
        removed: Vec<NodeKey>,
    },
    Attributes {
        target: NodeKey,
    },
    CharacterData {
        target: NodeKey,
    },
}

struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

impl NodeRecord {
    fn allows_children(&self) -> bool {
        matches!(self.kind, NodeKind::Document { .. } | NodeKind::Element { .. })
    }
}

/// Mutable arena document with parent links.
///
/// Nodes are addressed by [`NodeKey`]. Detached nodes (created but not inserted) are live but
/// unreachable from the root; removed subtrees are dropped from the live set.
pub struct Document {
    nodes: Vec<NodeRecord>,
    live: HashMap<NodeKey, usize>,
    allocated: HashSet<NodeKey>,
    next_key: u32,
    root: NodeKey,
    mutations: Vec<MutationRecord>,
}

impl Document {
    pub fn new() -> Self {
        let root = NodeKey(1);
        let mut doc = Self {
            nodes: Vec::new(),
            live: HashMap::new(),
            allocated: HashSet::new(),
            next_key: root.0 + 1,
            root,
            mutations: Vec::new(),
        };
        doc.insert_record(root, NodeKind::Document { doctype: None });
        doc
    }

    /// Build from an owned tree. Construction does not produce mutation records.
    pub fn from_node(node: &Node) -> Self {
        let mut doc = Self::new();
        match node {
            Node::Document { doctype, children } => {
                if let Some(record) = doc.record_mut(doc.root) {
                    record.kind = NodeKind::Document {
                        doctype: doctype.clone(),
                    };
                }
                let root = doc.root;
                for child in children {
                    doc.import(root, child);
                }
            }
            other => {
                let root = doc.root;
                doc.import(root, other);
            }
        }
        doc
    }

    pub fn parse_html(input: &str) -> Self {
        Self::from_node(&html::parse_document(input))
    }

    fn import(&mut self, parent: NodeKey, node: &Node) {
        // Explicit stack: saved pages can nest deeply.
        let mut stack = vec![(parent, node)];
        while let Some((parent, node)) = stack.pop() {
            let (kind, children) = match node {
                Node::Document { children, .. } => {
                    stack.extend(children.iter().rev().map(|c| (parent, c)));
                    continue;
                }
                Node::Element {
                    name,
                    attributes,
                    children,
                } => (
                    NodeKind::Element {
                        name: name.clone(),
                        attributes: attributes.clone(),
                    },
                    children.as_slice(),
                ),
                Node::Text { text } => (NodeKind::Text { text: text.clone() }, &[][..]),
                Node::Comment { text } => (NodeKind::Comment { text: text.clone() }, &[][..]),
            };
            let Ok(key) = self.alloc(kind) else {
                // Every key is taken; the rest of the tree cannot be stored.
                break;
            };
            self.link_last(parent, key);
            stack.extend(children.iter().rev().map(|c| (key, c)));
        }
    }

    /// Next free key at or after `next_key`, wrapping past `u32::MAX` back to 1. Host patches
    /// may have claimed any key, so taken ones are skipped.
    fn alloc(&mut self, kind: NodeKind) -> Result<NodeKey, DomError> {
        if self.allocated.len() >= u32::MAX as usize {
            return Err(DomError::KeySpaceExhausted);
        }
        let mut candidate = self.next_key;
        while candidate == NodeKey::INVALID.0 || self.allocated.contains(&NodeKey(candidate)) {
            candidate = candidate.wrapping_add(1);
        }
        self.next_key = candidate.wrapping_add(1);
        let key = NodeKey(candidate);
        self.insert_record(key, kind);
        Ok(key)
    }

    fn insert_record(&mut self, key: NodeKey, kind: NodeKind) {
        let index = self.nodes.len();
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.allocated.insert(key);
        self.live.insert(key, index);
    }

    fn link_last(&mut self, parent: NodeKey, child: NodeKey) {
        if let Some(record) = self.record_mut(parent) {
            record.children.push(child);
        }
        if let Some(record) = self.record_mut(child) {
            record.parent = Some(parent);
        }
    }

    fn record(&self, key: NodeKey) -> Option<&NodeRecord> {
        self.live.get(&key).map(|&index| &self.nodes[index])
    }

    fn record_mut(&mut self, key: NodeKey) -> Option<&mut NodeRecord> {
        let index = *self.live.get(&key)?;
        Some(&mut self.nodes[index])
    }

    fn live_record(&self, key: NodeKey) -> Result<&NodeRecord, DomError> {
        if key == NodeKey::INVALID {
            return Err(DomError::InvalidKey(key));
        }
        self.record(key).ok_or(DomError::MissingKey(key))
    }

    // ---- reads ----

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.record(key).map(|r| &r.kind)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.record(key).and_then(|r| r.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.record(key).map(|r| r.children.as_slice()).unwrap_or(&[])
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let siblings = self.children(self.parent(key)?);
        let pos = siblings.iter().position(|k| *k == key)?;
        siblings.get(pos + 1).copied()
    }

    pub fn is_element(&self, key: NodeKey) -> bool {
        matches!(self.kind(key), Some(NodeKind::Element { .. }))
    }

    pub fn element_name(&self, key: NodeKey) -> Option<&str> {
        match self.kind(key)? {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self, key: NodeKey) -> &[(String, Option<String>)] {
        match self.kind(key) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    /// First attribute named `name` (ASCII case-insensitive). Valueless attributes read as "".
    pub fn attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.attributes(key)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    /// Concatenated text of all descendant text nodes, like DOM `textContent`.
    pub fn text_content(&self, key: NodeKey) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text { text }) = self.kind(key) {
            out.push_str(text);
            return out;
        }
        for node in self.descendants(key) {
            if let Some(NodeKind::Text { text }) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Preorder descendants of `key`, excluding `key` itself.
    pub fn descendants(&self, key: NodeKey) -> Descendants<'_> {
        let mut stack: Vec<NodeKey> = self.children(key).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    // ---- writes ----

    pub fn create_element(
        &mut self,
        name: &str,
        attributes: Vec<(String, Option<String>)>,
    ) -> Result<NodeKey, DomError> {
        self.alloc(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes,
        })
    }

    pub fn create_text(&mut self, text: &str) -> Result<NodeKey, DomError> {
        self.alloc(NodeKind::Text {
            text: text.to_string(),
        })
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.link_last(parent, child);
        self.mutations.push(MutationRecord::ChildList {
            parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        before: NodeKey,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.live_record(before)?;
        let pos = self
            .children(parent)
            .iter()
            .position(|k| *k == before)
            .ok_or(DomError::InvalidSibling { parent, before })?;
        if let Some(record) = self.record_mut(parent) {
            record.children.insert(pos, child);
        }
        if let Some(record) = self.record_mut(child) {
            record.parent = Some(parent);
        }
        self.mutations.push(MutationRecord::ChildList {
            parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Insert `child` as the immediate next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.live_record(reference)?;
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        match self.next_sibling(reference) {
            Some(next) => self.insert_before(parent, child, next),
            None => self.append_child(parent, child),
        }
    }

    /// Detach `key` from its parent and drop its subtree.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), DomError> {
        self.live_record(key)?;
        if key == self.root {
            return Err(DomError::RootRemoval);
        }
        if let Some(parent) = self.parent(key) {
            if let Some(record) = self.record_mut(parent) {
                record.children.retain(|k| *k != key);
            }
            self.mutations.push(MutationRecord::ChildList {
                parent,
                added: Vec::new(),
                removed: vec![key],
            });
        }
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(index) = self.live.remove(&current) {
                let record = &mut self.nodes[index];
                record.parent = None;
                stack.append(&mut record.children);
            }
        }
        Ok(())
    }

    pub fn set_attributes(
        &mut self,
        key: NodeKey,
        attributes: Vec<(String, Option<String>)>,
    ) -> Result<(), DomError> {
        self.live_record(key)?;
        match self.record_mut(key).map(|r| &mut r.kind) {
            Some(NodeKind::Element { attributes: attrs, .. }) => *attrs = attributes,
            _ => return Err(DomError::WrongNodeKind(key)),
        }
        self.mutations.push(MutationRecord::Attributes { target: key });
        Ok(())
    }

    pub fn set_text(&mut self, key: NodeKey, text: &str) -> Result<(), DomError> {
        self.live_record(key)?;
        match self.record_mut(key).map(|r| &mut r.kind) {
            Some(NodeKind::Text { text: existing }) => {
                existing.clear();
                existing.push_str(text);
            }
            _ => return Err(DomError::WrongNodeKind(key)),
        }
        self.mutations.push(MutationRecord::CharacterData { target: key });
        Ok(())
    }

    fn check_insert(&self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        let parent_record = self.live_record(parent)?;
        let child_record = self.live_record(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        if !parent_record.allows_children() {
            return Err(DomError::InvalidParent(parent));
        }
        if child_record.parent.is_some() || child == self.root {
            return Err(DomError::InvalidParent(child));
        }
        Ok(())
    }

    fn is_ancestor(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let mut current = self.parent(node);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.parent(k);
        }
        false
    }

    // ---- host patches ----

    /// Apply a host patch batch in order.
    pub fn apply(&mut self, patches: &[DomPatch]) -> Result<(), DomError> {
        for patch in patches {
            self.apply_one(patch)?;
        }
        Ok(())
    }

    fn apply_one(&mut self, patch: &DomPatch) -> Result<(), DomError> {
        match patch {
            DomPatch::CreateElement {
                key,
                name,
                attributes,
            } => self.create_with_key(
                *key,
                NodeKind::Element {
                    name: name.to_ascii_lowercase(),
                    attributes: attributes.clone(),
                },
            ),
            DomPatch::CreateText { key, text } => {
                self.create_with_key(*key, NodeKind::Text { text: text.clone() })
            }
            DomPatch::CreateComment { key, text } => {
                self.create_with_key(*key, NodeKind::Comment { text: text.clone() })
            }
            DomPatch::AppendChild { parent, child } => self.append_child(*parent, *child),
            DomPatch::InsertBefore {
                parent,
                child,
                before,
            } => self.insert_before(*parent, *child, *before),
            DomPatch::RemoveNode { key } => self.remove(*key),
            DomPatch::SetAttributes { key, attributes } => {
                self.set_attributes(*key, attributes.clone())
            }
            DomPatch::SetText { key, text } => self.set_text(*key, text),
        }
    }

    fn create_with_key(&mut self, key: NodeKey, kind: NodeKind) -> Result<(), DomError> {
        if key == NodeKey::INVALID {
            return Err(DomError::InvalidKey(key));
        }
        if self.allocated.contains(&key) {
            return Err(DomError::DuplicateKey(key));
        }
        self.insert_record(key, kind);
        if let Some(after) = key.0.checked_add(1) {
            self.next_key = self.next_key.max(after);
        }
        Ok(())
    }

    // ---- observation ----

    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    /// Drain the records accumulated since the last call.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeKey>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let key = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(key).iter().rev().copied());
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(doc: &Document, name: &str) -> NodeKey {
        doc.descendants(doc.root())
            .find(|k| doc.element_name(*k) == Some(name))
            .unwrap_or_else(|| panic!("no <{name}> in document"))
    }

    #[test]
    fn parse_html_links_parents_and_siblings() {
        let doc = Document::parse_html("<div><code><a href=x>abc1234</a></code><p>t</p></div>");
        let a = first_element(&doc, "a");
        let code = first_element(&doc, "code");
        let p = first_element(&doc, "p");
        assert_eq!(doc.parent(a), Some(code));
        assert_eq!(doc.next_sibling(code), Some(p));
        assert_eq!(doc.next_sibling(a), None);
        assert_eq!(doc.text_content(code), "abc1234");
        assert_eq!(doc.attribute(a, "HREF"), Some("x"));
        assert!(!doc.has_pending_mutations(), "parsing must not record mutations");
    }

    #[test]
    fn insert_after_places_immediate_next_sibling() {
        let mut doc = Document::parse_html("<p><a>1</a><b>2</b></p>");
        let a = first_element(&doc, "a");
        let b = first_element(&doc, "b");
        let marker = doc
            .create_element("span", vec![("class".to_string(), Some("m".to_string()))])
            .expect("fresh key");
        doc.insert_after(a, marker).expect("insert after a");
        assert_eq!(doc.next_sibling(a), Some(marker));
        assert_eq!(doc.next_sibling(marker), Some(b));

        let tail = doc.create_element("span", Vec::new()).expect("fresh key");
        doc.insert_after(b, tail).expect("insert after last child");
        assert_eq!(doc.next_sibling(b), Some(tail));

        let records = doc.take_mutations();
        assert_eq!(records.len(), 2, "unexpected records: {records:?}");
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn remove_drops_subtree_and_records_mutation() {
        let mut doc = Document::parse_html("<div><span><i>x</i></span></div>");
        let span = first_element(&doc, "span");
        let i = first_element(&doc, "i");
        doc.remove(span).expect("remove span");
        assert!(doc.kind(span).is_none());
        assert!(doc.kind(i).is_none());
        assert_eq!(doc.remove(span), Err(DomError::MissingKey(span)));
        assert!(matches!(
            doc.take_mutations().as_slice(),
            [MutationRecord::ChildList { removed, .. }] if removed == &vec![span]
        ));
    }

    #[test]
    fn insert_rejects_cycles_and_attached_children() {
        let mut doc = Document::parse_html("<div><span></span></div>");
        let div = first_element(&doc, "div");
        let span = first_element(&doc, "span");
        assert_eq!(
            doc.append_child(span, div),
            Err(DomError::CycleDetected {
                parent: span,
                child: div
            })
        );
        assert_eq!(doc.append_child(div, span), Err(DomError::InvalidParent(span)));
        let root = doc.root();
        assert_eq!(doc.remove(root), Err(DomError::RootRemoval));
    }

    #[test]
    fn apply_runs_host_patches_in_order() {
        let mut doc = Document::parse_html("<div id=list></div>");
        let div = first_element(&doc, "div");
        let batch = [
            DomPatch::CreateElement {
                key: NodeKey(100),
                name: "A".to_string(),
                attributes: vec![("href".to_string(), Some("/x".to_string()))],
            },
            DomPatch::CreateText {
                key: NodeKey(101),
                text: "hi".to_string(),
            },
            DomPatch::AppendChild {
                parent: NodeKey(100),
                child: NodeKey(101),
            },
            DomPatch::AppendChild {
                parent: div,
                child: NodeKey(100),
            },
        ];
        doc.apply(&batch).expect("valid batch");
        assert_eq!(doc.children(div), &[NodeKey(100)]);
        assert_eq!(doc.element_name(NodeKey(100)), Some("a"));
        assert_eq!(doc.text_content(div), "hi");

        // Fresh keys continue past host-chosen ones.
        let next = doc.create_text("x").expect("fresh key");
        assert!(next.0 > 101);

        let dup = [DomPatch::CreateText {
            key: NodeKey(100),
            text: String::new(),
        }];
        assert_eq!(doc.apply(&dup), Err(DomError::DuplicateKey(NodeKey(100))));
    }

    #[test]
    fn fresh_keys_skip_host_keys_and_wrap_past_the_top() {
        let mut doc = Document::parse_html("<div></div>");
        let div = first_element(&doc, "div");
        let batch = [
            DomPatch::CreateElement {
                key: NodeKey(u32::MAX),
                name: "p".to_string(),
                attributes: Vec::new(),
            },
            DomPatch::AppendChild {
                parent: div,
                child: NodeKey(u32::MAX),
            },
        ];
        doc.apply(&batch).expect("max key is a valid host key");
        let next = doc.create_text("a").expect("fresh key");
        assert!(next.0 < u32::MAX, "{next:?}");

        doc.next_key = u32::MAX;
        let wrapped = doc.create_text("b").expect("wraps past the host key");
        assert_ne!(wrapped, NodeKey(u32::MAX));
        assert_ne!(wrapped, NodeKey::INVALID);
        assert_eq!(doc.element_name(NodeKey(u32::MAX)), Some("p"));
        assert_eq!(doc.parent(NodeKey(u32::MAX)), Some(div));
    }

    #[test]
    fn parse_html_survives_non_ascii_in_tags() {
        let doc = Document::parse_html("<a é=x href=/o/r/commit/abc>abc</a>");
        let a = first_element(&doc, "a");
        assert_eq!(doc.attribute(a, "href"), Some("/o/r/commit/abc"));
    }
}
