//! `@import` inlining with boundary markers.
//!
//! Produces the merged stylesheet that extraction later splits apart: every
//! leading local `@import` of the entry is replaced by the parsed content of
//! its target, recursively. Each imported stylesheet is marked before its own
//! imports are inlined, so nested blocks end up as complete spans in front of
//! the block of the stylesheet that imported them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::imports::{ImportLedger, PendingImport};
use crate::markers::{add_markers, record_entry_imports};
use crate::paths::absolute_path;
use crate::tree::{Node, Root};
use crate::{Error, Result};

/// Inlines a tree of stylesheets into one marked [`Root`].
///
/// A stylesheet is inlined at most once per build; later imports of the same
/// file are dropped. An import chain leading back to a stylesheet that is
/// still being inlined is an [`Error::ImportCycle`].
pub struct ImportInliner<'a> {
    ledger: &'a mut ImportLedger,
    visited: HashSet<PathBuf>,
    stack: Vec<PathBuf>,
}

impl<'a> ImportInliner<'a> {
    /// Create an inliner recording pending imports into `ledger`.
    pub fn new(ledger: &'a mut ImportLedger) -> Self {
        Self {
            ledger,
            visited: HashSet::new(),
            stack: Vec::new(),
        }
    }

    /// Read the entry stylesheet at `path` and inline its imports.
    pub fn inline_entry(&mut self, path: impl AsRef<Path>) -> Result<Root> {
        let path = absolute_path(path)?;
        let mut root = Root::from_file(&path)?;
        record_entry_imports(&root, self.ledger)?;

        self.visited.insert(path.clone());
        self.stack.push(path);
        self.inline_imports(&mut root)?;
        self.stack.pop();

        Ok(root)
    }

    /// Replace the leading local imports of `root` by their content.
    fn inline_imports(&mut self, root: &mut Root) -> Result<()> {
        let base_dir = root.base_dir()?;
        let nodes = std::mem::take(&mut root.nodes);
        let mut inlined = Vec::with_capacity(nodes.len());
        let mut leading = true;

        for node in nodes {
            if leading {
                match &node {
                    Node::AtRule(at) if at.name.eq_ignore_ascii_case("import") => {
                        if let Some(import) = PendingImport::from_at_rule(at, &base_dir) {
                            inlined.extend(self.load(&import)?);
                            continue;
                        }
                    }
                    Node::AtRule(at) if at.name.eq_ignore_ascii_case("charset") => {}
                    Node::Rule(rule) if rule.is_root_selector() => {}
                    Node::Comment(_) => {}
                    _ => leading = false,
                }
            }
            inlined.push(node);
        }

        root.nodes = inlined;
        Ok(())
    }

    /// Parse, mark and inline one imported stylesheet.
    fn load(&mut self, import: &PendingImport) -> Result<Vec<Node>> {
        let target = &import.target;
        if self.stack.contains(target) {
            return Err(Error::ImportCycle {
                path: target.clone(),
            });
        }
        if !self.visited.insert(target.clone()) {
            tracing::debug!("{} was already inlined", target.display());
            return Ok(vec![]);
        }

        let mut root = Root::from_file(target)?;
        add_markers(&mut root, self.ledger)?;

        self.stack.push(target.clone());
        self.inline_imports(&mut root)?;
        self.stack.pop();

        if import.media.is_empty() || root.is_empty() {
            return Ok(root.nodes);
        }
        let wrapper = Node::container("media", import.media.clone(), root.nodes)
            .with_source(import.source.clone());
        Ok(vec![wrapper])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::write_text;
    use tempfile::tempdir;

    #[test]
    fn inlines_nested_imports_in_front_of_their_importer() {
        let dir = tempdir().unwrap();
        write_text(dir.path().join("a.css"), "@import 'b.css';\n.a { color: red; }").unwrap();
        write_text(dir.path().join("b.css"), "@import 'c.css';\n.b { color: blue; }").unwrap();
        write_text(dir.path().join("c.css"), ".c { color: green; }").unwrap();

        let mut ledger = ImportLedger::new();
        let root = ImportInliner::new(&mut ledger)
            .inline_entry(dir.path().join("a.css"))
            .unwrap();

        let shape: Vec<String> = root
            .iter()
            .map(|node| match node {
                Node::Marker(m) => format!("{:?}", m.kind),
                Node::Rule(r) => r.selector.clone(),
                other => format!("{:?}", other),
            })
            .collect();
        assert_eq!(shape, ["Start", ".c", "End", "Start", ".b", "End", ".a"]);
        assert_eq!(ledger.entry_imports().map(<[_]>::len), Some(1));
    }

    #[test]
    fn media_import_is_wrapped() {
        let dir = tempdir().unwrap();
        write_text(dir.path().join("a.css"), "@import url('x.css') print;").unwrap();
        write_text(dir.path().join("x.css"), ".x { color: black; }").unwrap();

        let mut ledger = ImportLedger::new();
        let root = ImportInliner::new(&mut ledger)
            .inline_entry(dir.path().join("a.css"))
            .unwrap();

        assert_eq!(root.len(), 1);
        let media = root.nodes[0].as_at_rule().unwrap();
        assert_eq!(media.params, "print");
        assert!(media.opens_span() && media.closes_span());
    }

    #[test]
    fn duplicate_import_is_inlined_once() {
        let dir = tempdir().unwrap();
        write_text(dir.path().join("a.css"), "@import 'b.css';\n@import 'c.css';").unwrap();
        write_text(dir.path().join("b.css"), "@import 'c.css';\n.b { color: blue; }").unwrap();
        write_text(dir.path().join("c.css"), ".c { color: green; }").unwrap();

        let mut ledger = ImportLedger::new();
        let root = ImportInliner::new(&mut ledger)
            .inline_entry(dir.path().join("a.css"))
            .unwrap();

        assert_eq!(root.marker_count(), 4);
    }

    #[test]
    fn remote_imports_stay() {
        let dir = tempdir().unwrap();
        write_text(
            dir.path().join("a.css"),
            "@import url('https://fonts.example.com/inter.css');\n.a { color: red; }",
        )
        .unwrap();

        let mut ledger = ImportLedger::new();
        let root = ImportInliner::new(&mut ledger)
            .inline_entry(dir.path().join("a.css"))
            .unwrap();

        assert!(root.nodes[0].is_at_rule_named("import"));
        assert_eq!(root.marker_count(), 0);
    }

    #[test]
    fn detects_cycles() {
        let dir = tempdir().unwrap();
        write_text(dir.path().join("a.css"), "@import 'b.css';").unwrap();
        write_text(dir.path().join("b.css"), "@import 'a.css';\n.b { color: blue; }").unwrap();

        let mut ledger = ImportLedger::new();
        let err = ImportInliner::new(&mut ledger)
            .inline_entry(dir.path().join("a.css"))
            .unwrap_err();

        assert!(matches!(err, Error::ImportCycle { .. }));
    }

    #[test]
    fn missing_import_is_an_io_error() {
        let dir = tempdir().unwrap();
        write_text(dir.path().join("a.css"), "@import 'missing.css';").unwrap();

        let mut ledger = ImportLedger::new();
        let err = ImportInliner::new(&mut ledger)
            .inline_entry(dir.path().join("a.css"))
            .unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
    }
}
