//! Rendering of stylesheet trees back to CSS text.
//!
//! The printer emits one node per line with 4-space indentation and can build
//! a v3 source map that points every printed node back at its [`Source`].

use std::path::{Path, PathBuf};

use sourcemap::{SourceMap, SourceMapBuilder};

use crate::paths::{relative_to, to_slash};
use crate::tree::{Node, Root, Source};
use crate::Result;

/// How boundary markers are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerOutput {
    /// Print markers as `display: none` sentinel rules.
    #[default]
    Sentinel,
    /// Omit markers from the output.
    Strip,
}

/// Options controlling [`render`].
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Marker handling.
    pub markers: MarkerOutput,
    /// Build a source map alongside the CSS.
    pub source_map: bool,
    /// Path of the file the CSS will be written to. Used as the map's `file`
    /// and as the base for relative `sources` entries.
    pub output: Option<PathBuf>,
}

/// Output of [`render`].
#[derive(Debug)]
pub struct Rendered {
    pub css: String,
    pub map: Option<SourceMap>,
}

impl Rendered {
    /// Serialize the source map as JSON, if one was built.
    pub fn map_json(&self) -> Result<Option<String>> {
        let Some(map) = &self.map else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        map.to_writer(&mut buf)?;
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Render a stylesheet to CSS text (and optionally a source map).
pub fn render(root: &Root, options: &RenderOptions) -> Rendered {
    let mut printer = Printer::new(options);
    printer.write_nodes(&root.nodes, 0);
    printer.finish()
}

/// Render a list of nodes with default options.
pub fn render_nodes(nodes: &[Node]) -> String {
    let options = RenderOptions::default();
    let mut printer = Printer::new(&options);
    printer.write_nodes(nodes, 0);
    printer.out
}

struct Printer<'a> {
    options: &'a RenderOptions,
    out: String,
    line: u32,
    column: u32,
    map: Option<SourceMapBuilder>,
    map_base: Option<PathBuf>,
}

impl<'a> Printer<'a> {
    fn new(options: &'a RenderOptions) -> Self {
        let map = options.source_map.then(|| {
            let file = options
                .output
                .as_deref()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned());
            SourceMapBuilder::new(file.as_deref())
        });
        let map_base = options
            .output
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);

        Self {
            options,
            out: String::new(),
            line: 0,
            column: 0,
            map,
            map_base,
        }
    }

    fn finish(self) -> Rendered {
        Rendered {
            css: self.out,
            map: self.map.map(SourceMapBuilder::into_sourcemap),
        }
    }

    fn push(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.out.push_str(text);
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.push("    ");
        }
    }

    /// Record a mapping from the current output position to `source`.
    fn mark(&mut self, source: &Source) {
        let Some(builder) = self.map.as_mut() else {
            return;
        };
        if !source.has_position() {
            return;
        }
        let file = source.file_path().map(|path| match &self.map_base {
            Some(base) => to_slash(&relative_to(base, path)),
            None => to_slash(path),
        });
        builder.add(
            self.line,
            self.column,
            source.line - 1,
            source.column.saturating_sub(1),
            file.as_deref(),
            None,
            false,
        );
    }

    fn write_nodes(&mut self, nodes: &[Node], depth: usize) {
        for node in nodes {
            self.write_node(node, depth);
        }
    }

    fn write_node(&mut self, node: &Node, depth: usize) {
        match node {
            Node::Rule(rule) => {
                self.indent(depth);
                self.mark(&rule.source);
                self.push(&rule.selector);
                self.write_block(&rule.nodes, depth);
            }
            Node::AtRule(at) => {
                self.indent(depth);
                self.mark(&at.source);
                self.push("@");
                self.push(&at.name);
                if !at.params.is_empty() {
                    self.push(" ");
                    self.push(&at.params);
                }
                match &at.nodes {
                    Some(children) => self.write_block(children, depth),
                    None => self.push(";\n"),
                }
            }
            Node::Declaration(decl) => {
                self.indent(depth);
                self.mark(&decl.source);
                self.push(&decl.prop);
                self.push(": ");
                self.push(&decl.value);
                if decl.important {
                    self.push(" !important");
                }
                self.push(";\n");
            }
            Node::Comment(comment) => {
                self.indent(depth);
                self.mark(&comment.source);
                self.push("/*");
                self.push(&comment.text);
                self.push("*/\n");
            }
            Node::Marker(marker) => {
                if self.options.markers == MarkerOutput::Strip {
                    return;
                }
                self.indent(depth);
                self.push(marker.kind.selector());
                self.push(" {\n");
                self.indent(depth + 1);
                self.push("display: none;\n");
                self.indent(depth);
                self.push("}\n");
            }
        }
    }

    fn write_block(&mut self, children: &[Node], depth: usize) {
        if children.is_empty() {
            self.push(" {}\n");
            return;
        }
        self.push(" {\n");
        self.write_nodes(children, depth + 1);
        self.indent(depth);
        self.push("}\n");
    }
}
