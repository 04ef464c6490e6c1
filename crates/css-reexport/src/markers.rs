//! Boundary marker insertion.
//!
//! Runs on each imported stylesheet before its own imports are inlined: the
//! leading `@import` statements are recorded in the [`ImportLedger`], a start
//! marker is placed before the first real node and an end marker after the
//! last one. Comments of the leading prelude are moved inside the markers. Once the importer has inlined the content, the markers tell
//! extraction exactly which nodes came from which file.

use std::path::Path;

use crate::imports::{ImportLedger, PendingImport};
use crate::tree::{MarkerKind, Node, Root, SpanId};
use crate::Result;

/// Where the leading scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Landing {
    /// Index of the first real node.
    At(usize),
    /// The first real node is a marker: the stylesheet is already marked.
    AlreadyMarked,
    /// Only imports, comments and `:root` rules.
    Exhausted,
}

struct LeadingScan {
    imports: Vec<PendingImport>,
    landing: Landing,
}

/// Walk the leading `@import` / `@charset` / `:root` / comment prelude.
fn scan_leading(nodes: &[Node], base_dir: &Path) -> LeadingScan {
    let mut imports = vec![];

    for (index, node) in nodes.iter().enumerate() {
        match node {
            Node::Marker(_) => {
                return LeadingScan {
                    imports,
                    landing: Landing::AlreadyMarked,
                };
            }
            Node::Comment(_) => {}
            Node::AtRule(at) if at.name.eq_ignore_ascii_case("import") => {
                if let Some(pending) = PendingImport::from_at_rule(at, base_dir) {
                    imports.push(pending);
                }
            }
            Node::AtRule(at) if at.name.eq_ignore_ascii_case("charset") => {}
            Node::Rule(rule) if rule.is_root_selector() => {}
            _ => {
                return LeadingScan {
                    imports,
                    landing: Landing::At(index),
                };
            }
        }
    }

    LeadingScan {
        imports,
        landing: Landing::Exhausted,
    }
}

/// Insert one start/end marker pair around the stylesheet's content.
///
/// Returns the id of the new span, or `None` when the stylesheet is already
/// marked or has nothing to round-trip (no content and no imports).
pub fn add_markers(root: &mut Root, ledger: &mut ImportLedger) -> Result<Option<SpanId>> {
    let base_dir = root.base_dir()?;
    let scan = scan_leading(&root.nodes, &base_dir);

    let landing = match scan.landing {
        Landing::At(index) => index,
        Landing::AlreadyMarked => {
            tracing::debug!("{} is already marked", root.source);
            return Ok(None);
        }
        Landing::Exhausted if !scan.imports.is_empty() => {
            // keep an anchor so the recorded imports have a block to live in
            root.nodes.push(Node::comment("").with_source(root.source.clone()));
            root.nodes.len() - 1
        }
        Landing::Exhausted => return Ok(None),
    };

    let span = ledger.allocate_span();
    let source = root
        .nodes
        .first()
        .map(|node| node.source().clone())
        .unwrap_or_else(|| root.source.clone());

    // prelude comments (license headers) belong to the block
    let content = root.nodes.split_off(landing);
    let (comments, prelude): (Vec<Node>, Vec<Node>) = std::mem::take(&mut root.nodes)
        .into_iter()
        .partition(Node::is_comment);
    root.nodes = prelude;
    root.nodes
        .push(Node::marker(MarkerKind::Start, span, source.clone()));
    root.nodes.extend(comments);
    root.nodes.extend(content);
    root.nodes.push(Node::marker(MarkerKind::End, span, source));

    tracing::debug!(
        "marked {} as span {} ({} pending imports)",
        root.source,
        span.0,
        scan.imports.len()
    );
    ledger.record_span(span, scan.imports);

    Ok(Some(span))
}

/// Record the entry stylesheet's leading imports without inserting markers.
///
/// Returns the number of imports recorded.
pub fn record_entry_imports(root: &Root, ledger: &mut ImportLedger) -> Result<usize> {
    let base_dir = root.base_dir()?;
    let scan = scan_leading(&root.nodes, &base_dir);
    let count = scan.imports.len();

    tracing::debug!("recorded {} entry imports for {}", count, root.source);
    ledger.record_entry(scan.imports);

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(css: &str) -> Root {
        Root::from_css(css, Some(Path::new("/p/src/b.css"))).unwrap()
    }

    #[test]
    fn wraps_content_in_markers() {
        let mut root = parse(".b { color: blue; }");
        let mut ledger = ImportLedger::new();

        let span = add_markers(&mut root, &mut ledger).unwrap().unwrap();

        assert_eq!(root.len(), 3);
        assert_eq!(root.nodes[0].as_marker().unwrap().span, span);
        assert!(root.nodes[0].is_start_marker());
        assert!(root.nodes[2].is_end_marker());
        assert_eq!(root.nodes[0].source(), root.nodes[2].source());
    }

    #[test]
    fn records_leading_imports_and_skips_root_rule() {
        let mut root = parse(
            "@import 'c.css';\n@import url('../d.css') print;\n:root { --x: 1; }\n.b { color: blue; }",
        );
        let mut ledger = ImportLedger::new();

        let span = add_markers(&mut root, &mut ledger).unwrap().unwrap();

        assert!(root.nodes[3].is_start_marker());
        let imports = ledger.span_imports(span).unwrap();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].target, PathBuf::from("/p/src/c.css"));
        assert_eq!(imports[1].target, PathBuf::from("/p/d.css"));
        assert_eq!(imports[1].media, "print");
    }

    #[test]
    fn prelude_comments_move_inside_the_block() {
        let mut root = parse("/* hdr */\n@import 'c.css';\n/* note */\n.b { color: blue; }");
        let mut ledger = ImportLedger::new();

        add_markers(&mut root, &mut ledger).unwrap().unwrap();

        assert!(root.nodes[0].is_at_rule_named("import"));
        assert!(root.nodes[1].is_start_marker());
        assert!(matches!(&root.nodes[2], Node::Comment(c) if c.text.trim() == "hdr"));
        assert!(matches!(&root.nodes[3], Node::Comment(c) if c.text.trim() == "note"));
        assert!(root.nodes[5].is_end_marker());
    }

    #[test]
    fn import_only_stylesheet_gets_placeholder() {
        let mut root = parse("@import 'c.css';");
        let mut ledger = ImportLedger::new();

        add_markers(&mut root, &mut ledger).unwrap().unwrap();

        assert_eq!(root.len(), 4);
        assert!(root.nodes[1].is_start_marker());
        assert!(matches!(&root.nodes[2], Node::Comment(c) if c.text.is_empty()));
        assert!(root.nodes[3].is_end_marker());
    }

    #[test]
    fn root_only_stylesheet_is_left_alone() {
        let mut root = parse(":root { --brand: red; }");
        let mut ledger = ImportLedger::new();

        assert!(add_markers(&mut root, &mut ledger).unwrap().is_none());
        assert_eq!(root.len(), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn empty_stylesheet_is_left_alone() {
        let mut root = parse("");
        let mut ledger = ImportLedger::new();

        assert!(add_markers(&mut root, &mut ledger).unwrap().is_none());
        assert!(root.is_empty());
    }

    #[test]
    fn marking_twice_does_not_duplicate() {
        let mut root = parse("@import 'c.css';\n.b { color: blue; }");
        let mut ledger = ImportLedger::new();

        add_markers(&mut root, &mut ledger).unwrap();
        assert!(add_markers(&mut root, &mut ledger).unwrap().is_none());

        assert_eq!(root.marker_count(), 2);
    }

    #[test]
    fn entry_imports_are_recorded_without_markers() {
        let root = parse("@import 'b.css';\n@import 'x.css' print;\n.a { color: red; }");
        let mut ledger = ImportLedger::new();

        assert_eq!(record_entry_imports(&root, &mut ledger).unwrap(), 2);
        assert_eq!(root.marker_count(), 0);

        let entry = ledger.entry_imports().unwrap();
        assert_eq!(entry[0].target, PathBuf::from("/p/src/b.css"));
        assert_eq!(entry[1].media, "print");
    }
}
