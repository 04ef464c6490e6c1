//! Nested-media normalization.
//!
//! An import tagged with a media condition may reach the extractor as one
//! `@media` block that also contains a nested `@media` with the very same
//! condition, or as a run of sibling `@media` blocks. Both are unified into a
//! single `@media <params>` node whose children are the plain nodes plus the
//! flattened children of every same-condition block.
//!
//! Conditions are compared as exact strings: `screen and (x)` and
//! `screen  and (x)` are different blocks and are never merged.

use crate::tree::{AtRule, Node, Source};

/// Normalize one node into `@media <params>`.
///
/// For an at-rule, its own children are flattened; any other node becomes
/// the single child of the new block.
pub fn normalize_media(node: Node, params: &str) -> Node {
    match node {
        Node::AtRule(at) => {
            let source = at.source;
            let children = at.nodes.unwrap_or_default();
            media_block(flatten_matching(children, params), params, source)
        }
        other => {
            let source = other.source().clone();
            media_block(vec![other], params, source)
        }
    }
}

/// Normalize a run of sibling nodes into one `@media <params>` block.
pub fn normalize_run(nodes: Vec<Node>, params: &str, source: Source) -> Node {
    media_block(flatten_matching(nodes, params), params, source)
}

/// Replace every container at-rule whose params equal `params` by its children.
pub fn flatten_matching(nodes: Vec<Node>, params: &str) -> Vec<Node> {
    let mut flattened = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::AtRule(at) if at.params == params && at.nodes.is_some() => {
                flattened.extend(at.nodes.unwrap_or_default());
            }
            other => flattened.push(other),
        }
    }
    flattened
}

fn media_block(nodes: Vec<Node>, params: &str, source: Source) -> Node {
    Node::AtRule(AtRule {
        name: "media".to_string(),
        params: params.to_string(),
        nodes: Some(nodes),
        source,
    })
}
