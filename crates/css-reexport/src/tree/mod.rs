//! Stylesheet tree: the node model shared by both passes.

mod node;
mod root;
mod source;

pub use node::{
    AtRule, Comment, Declaration, END_MARKER_SELECTOR, Marker, MarkerKind, Node, Rule,
    START_MARKER_SELECTOR, SpanId,
};
pub use root::Root;
pub use source::Source;
