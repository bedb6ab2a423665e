pub mod matching;
pub mod syntax;

// Re-exports so other crates can just use `css::...` nicely.
pub use matching::Element;
pub use syntax::{
    AttributeOp, AttributeSelector, Combinator, ComplexSelector, Compound, Selector,
    SelectorError, SelectorList, parse_selector_list,
};
