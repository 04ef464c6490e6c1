//! Stylesheet root.

use std::fmt;
use std::path::{Path, PathBuf};

use super::{Node, Source};
use crate::paths::absolute_path;
use crate::printer::{RenderOptions, render};
use crate::Result;

/// A parsed stylesheet: ordered top-level nodes plus provenance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Root {
    /// Top-level nodes in document order.
    pub nodes: Vec<Node>,
    /// Originating file (for relative output paths).
    pub source: Source,
}

impl Root {
    /// Create an empty stylesheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stylesheet from nodes.
    pub fn from_nodes(nodes: Vec<Node>, source: Source) -> Self {
        Self { nodes, source }
    }

    /// Read and parse a stylesheet from disk.
    ///
    /// Every parsed node records `path` as its originating file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = crate::fs::read_text(path)?;
        Self::from_css(&content, Some(path))
    }

    /// Parse a stylesheet from CSS text.
    pub fn from_css(css: &str, file: Option<&Path>) -> Result<Self> {
        let nodes = crate::parser::parse_css(css, file)?;
        let source = match file {
            Some(path) => Source::file(path),
            None => Source::default(),
        };
        Ok(Self { nodes, source })
    }

    /// The originating file, if known.
    pub fn file(&self) -> Option<&Path> {
        self.source.file_path()
    }

    /// Set the originating file.
    pub fn set_file(&mut self, file: impl Into<PathBuf>) {
        self.source = Source::file(file);
    }

    /// Absolute directory that relative URLs in this stylesheet resolve against.
    ///
    /// Falls back to the current directory for stylesheets not read from disk.
    pub fn base_dir(&self) -> Result<PathBuf> {
        match self.file() {
            Some(file) => {
                let file = absolute_path(file)?;
                Ok(file.parent().map(Path::to_path_buf).unwrap_or(file))
            }
            None => absolute_path("."),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Count markers anywhere in the tree.
    pub fn marker_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|node| match node {
                    Node::Marker(_) => 1,
                    Node::AtRule(a) => count(a.children()),
                    Node::Rule(r) => count(&r.nodes),
                    Node::Declaration(_) | Node::Comment(_) => 0,
                })
                .sum()
        }
        count(&self.nodes)
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self, &RenderOptions::default()).css)
    }
}
