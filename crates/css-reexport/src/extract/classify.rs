//! Span-shape classification.
//!
//! A marked block can reach extraction in four shapes, depending on whether
//! media wrapping kept its boundary markers together:
//!
//! ```text
//! Unwrapped    START .b END
//! Wrapped      @media print { START .b END }
//! SplitPair    @media screen { START .b }  @media screen { .b2 END }
//! SplitMixed   @media screen { START .b }  .b2 END
//! ```
//!
//! [`plan_spans`] classifies every span head of one child list up front so
//! the caller can rebuild the list in a single pass.

use crate::tree::{AtRule, MarkerKind, Node, Source};
use crate::{Error, Result};

/// Where a span sits in a child list. Indices are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanShape {
    /// Start and end markers are both direct children.
    Unwrapped { start: usize, end: usize },
    /// One at-rule whose first child is the start marker and whose last child
    /// is the matching end marker.
    Wrapped { index: usize },
    /// The start marker opens an at-rule and the end marker closes a later
    /// sibling at-rule.
    SplitPair { start: usize, end: usize },
    /// One boundary is a direct marker, the other sits in an at-rule.
    SplitMixed { start: usize, end: usize },
}

impl SpanShape {
    /// Index of the first node of the run.
    pub fn first(&self) -> usize {
        match *self {
            SpanShape::Unwrapped { start, .. }
            | SpanShape::SplitPair { start, .. }
            | SpanShape::SplitMixed { start, .. } => start,
            SpanShape::Wrapped { index } => index,
        }
    }

    /// Index of the last node of the run.
    pub fn last(&self) -> usize {
        match *self {
            SpanShape::Unwrapped { end, .. }
            | SpanShape::SplitPair { end, .. }
            | SpanShape::SplitMixed { end, .. } => end,
            SpanShape::Wrapped { index } => index,
        }
    }
}

/// How the direct children of an at-rule touch span boundaries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Boundaries {
    /// First direct marker is an end: the at-rule closes a span opened earlier.
    closes: bool,
    /// Last direct marker is a start: the at-rule leaves a span open.
    opens: bool,
    /// The at-rule holds exactly one complete span, edge to edge.
    wraps: bool,
}

fn boundaries(at: &AtRule) -> Boundaries {
    let children = at.children();
    let kinds: Vec<MarkerKind> = children
        .iter()
        .filter_map(Node::as_marker)
        .map(|m| m.kind)
        .collect();
    let mut content = children.iter().filter(|n| !n.is_comment());
    let first = content.next();
    let last = content.last().or(first);

    Boundaries {
        closes: kinds.first() == Some(&MarkerKind::End),
        opens: kinds.last() == Some(&MarkerKind::Start),
        wraps: kinds == [MarkerKind::Start, MarkerKind::End]
            && first.is_some_and(Node::is_start_marker)
            && last.is_some_and(Node::is_end_marker),
    }
}

enum Closing {
    /// A direct end marker.
    Marker(usize),
    /// An at-rule whose first direct marker is an end.
    AtRule(usize),
}

/// Find the sibling that closes the span opened at `from`.
fn find_closing(nodes: &[Node], from: usize) -> Result<Closing> {
    for (index, node) in nodes.iter().enumerate().skip(from + 1) {
        match node {
            Node::Marker(m) if m.kind == MarkerKind::End => return Ok(Closing::Marker(index)),
            Node::Marker(m) => {
                return Err(Error::unexpected_marker(
                    &m.source,
                    "start marker inside an import block that is still open",
                ));
            }
            Node::AtRule(at) => {
                let b = boundaries(at);
                match (b.closes, b.opens) {
                    (true, false) => return Ok(Closing::AtRule(index)),
                    // closes this span and opens the next one: the run goes on
                    (true, true) => {}
                    (false, true) => {
                        return Err(Error::unexpected_marker(
                            &at.source,
                            "import block opened inside an import block that is still open",
                        ));
                    }
                    (false, false) => {}
                }
            }
            _ => {}
        }
    }
    Err(Error::unclosed_marker(nodes[from].source()))
}

/// Classify the node at `index` as the head of a span, if it is one.
///
/// At-rules that merely contain complete spans deeper inside are not span
/// heads; the caller recurses into them.
pub fn classify_at(nodes: &[Node], index: usize) -> Result<Option<SpanShape>> {
    let shape = match &nodes[index] {
        Node::Marker(m) if m.kind == MarkerKind::Start => match find_closing(nodes, index)? {
            Closing::Marker(end) => SpanShape::Unwrapped { start: index, end },
            Closing::AtRule(end) => SpanShape::SplitMixed { start: index, end },
        },
        Node::Marker(m) => return Err(stray_end(&m.source)),
        Node::AtRule(at) => {
            let b = boundaries(at);
            if b.closes {
                return Err(stray_end(&at.source));
            }
            if b.wraps {
                SpanShape::Wrapped { index }
            } else if b.opens {
                match find_closing(nodes, index)? {
                    Closing::Marker(end) => SpanShape::SplitMixed { start: index, end },
                    Closing::AtRule(end) => SpanShape::SplitPair { start: index, end },
                }
            } else {
                return Ok(None);
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(shape))
}

fn stray_end(at: &Source) -> Error {
    Error::unexpected_marker(at, "end marker without a matching start")
}

/// Classify every span in `nodes`, in document order.
///
/// The returned runs never overlap.
pub fn plan_spans(nodes: &[Node]) -> Result<Vec<SpanShape>> {
    let mut shapes = vec![];
    let mut index = 0;
    while index < nodes.len() {
        match classify_at(nodes, index)? {
            Some(shape) => {
                index = shape.last() + 1;
                shapes.push(shape);
            }
            None => index += 1,
        }
    }
    Ok(shapes)
}
