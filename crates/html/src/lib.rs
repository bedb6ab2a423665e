//! Markup loading for saved pages: a small tokenizer and a tree builder producing an owned
//! [`Node`] tree.

mod dom_builder;
mod entities;
mod tokenizer;
mod types;

pub use crate::dom_builder::build_dom;
pub use crate::tokenizer::tokenize;
pub use crate::types::{Node, Token};

/// Tokenize and build in one step.
pub fn parse_document(input: &str) -> Node {
    build_dom(&tokenize(input))
}
