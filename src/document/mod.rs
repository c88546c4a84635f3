//! The structured document model.
//!
//! This module handles:
//! - The element/text tree the structured surface edits
//! - Positions, selections and resolving them to text blocks
//! - Lossless conversion between markdown text and the tree

mod parser;
mod position;
mod types;

pub use parser::{parse, parse_inline, serialize, serialize_inline};
pub use position::{BlockCursor, Position, Selection, end_of_document, resolve};
pub(crate) use types::char_to_byte;
pub use types::{
    Element, ElementKind, InlineStyle, ListMarker, Node, NodeRef, TextRun,
};
