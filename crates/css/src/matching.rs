use crate::syntax::{
    AttributeOp, AttributeSelector, Combinator, ComplexSelector, Compound, Selector, SelectorList,
};

/// What the matcher needs to know about an element.
///
/// Implementations are cheap handles (a document reference plus a node key); `parent_element`
/// must return `None` at the root and for detached nodes.
pub trait Element: Sized {
    fn local_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn parent_element(&self) -> Option<Self>;
}

impl SelectorList {
    pub fn matches<E: Element>(&self, element: &E) -> bool {
        self.selectors.iter().any(|s| matches_complex(element, s))
    }
}

pub fn matches_complex<E: Element>(element: &E, selector: &ComplexSelector) -> bool {
    let Some(last) = selector.compounds.len().checked_sub(1) else {
        return false;
    };
    matches_from(element, selector, last)
}

// Right-to-left: `index` is the compound that `element` must satisfy.
fn matches_from<E: Element>(element: &E, selector: &ComplexSelector, index: usize) -> bool {
    if !matches_compound(element, &selector.compounds[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match selector.combinators[index - 1] {
        Combinator::Child => element
            .parent_element()
            .is_some_and(|parent| matches_from(&parent, selector, index - 1)),
        Combinator::Descendant => {
            let mut ancestor = element.parent_element();
            while let Some(current) = ancestor {
                if matches_from(&current, selector, index - 1) {
                    return true;
                }
                ancestor = current.parent_element();
            }
            false
        }
    }
}

fn matches_compound<E: Element>(element: &E, compound: &Compound) -> bool {
    compound.simple.iter().all(|s| matches_simple(element, s))
}

// Check if an element matches a simple selector
fn matches_simple<E: Element>(element: &E, selector: &Selector) -> bool {
    match selector {
        Selector::Universal => true,
        Selector::Type(t) => element.local_name().eq_ignore_ascii_case(t),
        Selector::Id(want) => element.attribute("id").is_some_and(|v| v == want),
        Selector::Class(want) => element
            .attribute("class")
            .is_some_and(|classlist| classlist.split_whitespace().any(|c| c == want)),
        Selector::Attribute(attr) => matches_attribute(element, attr),
    }
}

fn matches_attribute<E: Element>(element: &E, selector: &AttributeSelector) -> bool {
    let Some(value) = element.attribute(&selector.name) else {
        return false;
    };
    let Some((op, want)) = &selector.matcher else {
        return true;
    };
    match op {
        AttributeOp::Equals => value == want,
        AttributeOp::Includes => value.split_whitespace().any(|v| v == want),
        AttributeOp::DashMatch => {
            value == want
                || value
                    .strip_prefix(want.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
        }
        // Empty needles never match for the substring family.
        AttributeOp::Prefix => !want.is_empty() && value.starts_with(want.as_str()),
        AttributeOp::Suffix => !want.is_empty() && value.ends_with(want.as_str()),
        AttributeOp::Substring => !want.is_empty() && value.contains(want.as_str()),
    }
}
