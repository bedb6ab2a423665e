//! Mutable document model for the annotated page: an arena of nodes with parent links,
//! host patches, mutation records, selector queries and serialization.

mod document;
mod error;
pub mod patch;
pub mod query;
pub mod serialize;

pub use crate::document::{Descendants, Document, MutationRecord, NodeKey, NodeKind};
pub use crate::error::DomError;
pub use crate::patch::DomPatch;
pub use crate::query::ElementRef;
pub use crate::serialize::{outline, to_html};
