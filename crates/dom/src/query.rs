use crate::{Document, NodeKey};
use css::{Element, SelectorList};

/// A document element seen through the selector matcher.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    key: NodeKey,
}

impl<'a> ElementRef<'a> {
    pub fn new(doc: &'a Document, key: NodeKey) -> Option<Self> {
        doc.is_element(key).then_some(Self { doc, key })
    }
}

impl Element for ElementRef<'_> {
    fn local_name(&self) -> &str {
        self.doc.element_name(self.key).unwrap_or("")
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.doc.attribute(self.key, name)
    }

    fn parent_element(&self) -> Option<Self> {
        let parent = self.doc.parent(self.key)?;
        ElementRef::new(self.doc, parent)
    }
}

impl Document {
    pub fn matches(&self, key: NodeKey, selectors: &SelectorList) -> bool {
        ElementRef::new(self, key).is_some_and(|el| selectors.matches(&el))
    }

    /// Elements under the root matching `selectors`, in document order.
    pub fn select_all(&self, selectors: &SelectorList) -> Vec<NodeKey> {
        self.select_within(self.root(), selectors)
    }

    pub fn select_first(&self, selectors: &SelectorList) -> Option<NodeKey> {
        self.descendants(self.root())
            .find(|k| self.matches(*k, selectors))
    }

    /// Descendants of `scope` (not `scope` itself) matching `selectors`, in document order.
    pub fn select_within(&self, scope: NodeKey, selectors: &SelectorList) -> Vec<NodeKey> {
        self.descendants(scope)
            .filter(|k| self.matches(*k, selectors))
            .collect()
    }

    /// Nearest inclusive ancestor element matching `selectors`.
    pub fn closest(&self, key: NodeKey, selectors: &SelectorList) -> Option<NodeKey> {
        let mut current = Some(key);
        while let Some(k) = current {
            if self.matches(k, selectors) {
                return Some(k);
            }
            current = self.parent(k);
        }
        None
    }
}
