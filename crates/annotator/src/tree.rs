//! The element tree the discovery engine and reconciler work against.
//!
//! Node handles are plain `Copy` keys. The host page may replace any element between passes,
//! so callers must re-locate nodes every pass instead of holding on to them.

use css::SelectorList;
use dom::{Document, DomError, NodeKey};
use std::fmt;
use std::hash::Hash;

/// An element to insert: name, attributes in order, and optional text content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementSpec {
    pub name: String,
    pub attributes: Vec<(String, Option<String>)>,
    pub text: Option<String>,
}

pub trait ElementTree {
    type NodeRef: Copy + Eq + Hash + fmt::Debug;
    type Error: std::error::Error;

    /// Matching elements in document order.
    fn select_all(&self, selectors: &SelectorList) -> Vec<Self::NodeRef>;

    fn select_first(&self, selectors: &SelectorList) -> Option<Self::NodeRef> {
        self.select_all(selectors).into_iter().next()
    }

    /// Matching descendants of `scope` (excluding `scope`), in document order.
    fn select_within(&self, scope: Self::NodeRef, selectors: &SelectorList) -> Vec<Self::NodeRef>;

    /// Nearest inclusive ancestor matching `selectors`.
    fn closest(&self, node: Self::NodeRef, selectors: &SelectorList) -> Option<Self::NodeRef>;

    fn attribute(&self, node: Self::NodeRef, name: &str) -> Option<&str>;

    fn text_content(&self, node: Self::NodeRef) -> String;

    fn parent(&self, node: Self::NodeRef) -> Option<Self::NodeRef>;

    /// Next sibling of any node kind.
    fn next_sibling(&self, node: Self::NodeRef) -> Option<Self::NodeRef>;

    fn is_element(&self, node: Self::NodeRef) -> bool;

    /// Insert a new element as the immediate next sibling of `reference`.
    fn insert_after(
        &mut self,
        reference: Self::NodeRef,
        element: &ElementSpec,
    ) -> Result<Self::NodeRef, Self::Error>;

    fn remove(&mut self, node: Self::NodeRef) -> Result<(), Self::Error>;
}

impl ElementTree for Document {
    type NodeRef = NodeKey;
    type Error = DomError;

    fn select_all(&self, selectors: &SelectorList) -> Vec<NodeKey> {
        Document::select_all(self, selectors)
    }

    fn select_first(&self, selectors: &SelectorList) -> Option<NodeKey> {
        Document::select_first(self, selectors)
    }

    fn select_within(&self, scope: NodeKey, selectors: &SelectorList) -> Vec<NodeKey> {
        Document::select_within(self, scope, selectors)
    }

    fn closest(&self, node: NodeKey, selectors: &SelectorList) -> Option<NodeKey> {
        Document::closest(self, node, selectors)
    }

    fn attribute(&self, node: NodeKey, name: &str) -> Option<&str> {
        Document::attribute(self, node, name)
    }

    fn text_content(&self, node: NodeKey) -> String {
        Document::text_content(self, node)
    }

    fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        Document::parent(self, node)
    }

    fn next_sibling(&self, node: NodeKey) -> Option<NodeKey> {
        Document::next_sibling(self, node)
    }

    fn is_element(&self, node: NodeKey) -> bool {
        Document::is_element(self, node)
    }

    fn insert_after(&mut self, reference: NodeKey, element: &ElementSpec) -> Result<NodeKey, DomError> {
        let key = self.create_element(&element.name, element.attributes.clone())?;
        let placed = match &element.text {
            Some(text) => self
                .create_text(text)
                .and_then(|text| self.append_child(key, text))
                .and_then(|_| Document::insert_after(self, reference, key)),
            None => Document::insert_after(self, reference, key),
        };
        if let Err(e) = placed {
            // Do not leave a detached orphan behind.
            let _ = Document::remove(self, key);
            return Err(e);
        }
        Ok(key)
    }

    fn remove(&mut self, node: NodeKey) -> Result<(), DomError> {
        Document::remove(self, node)
    }
}
