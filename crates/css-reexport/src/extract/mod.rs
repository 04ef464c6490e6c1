//! Block extraction: split marked import blocks back out into files.
//!
//! The extractor walks a marked stylesheet, writes the content of every
//! boundary span to `temp_path` (mirroring the span's source path relative to
//! `context`) and puts an `@import` of the written file in its place. Spans
//! nested inside a span are extracted first, into files of their own.
//!
//! Once a document (the entry stylesheet or an emitted file) has been
//! rebuilt, the leading imports recorded for it by marker insertion are
//! replayed at its top, so the emitted files import each other exactly like
//! the original sources did.

mod classify;

pub use classify::{SpanShape, classify_at, plan_spans};

use std::path::{Path, PathBuf};

use base64::Engine;

use crate::config::{BuildContext, MapMode, ReexportOptions, ResolvedPaths};
use crate::fs;
use crate::imports::{ImportLedger, PendingImport, import_node};
use crate::media::{normalize_media, normalize_run};
use crate::paths::{absolute_path, relative_to, strip_parent_components, to_import_url};
use crate::printer::{MarkerOutput, RenderOptions, render};
use crate::rebase::rebase_urls;
use crate::tree::{AtRule, Marker, Node, Root, Source};
use crate::{Error, Result};

/// One file written by [`Extractor::extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    /// Absolute path of the written stylesheet.
    pub path: PathBuf,
    /// Absolute path of the stylesheet its content came from.
    pub source: PathBuf,
    /// Path of the external source map, when one was written.
    pub map: Option<PathBuf>,
}

/// Everything one extraction pass wrote, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub emitted: Vec<EmittedFile>,
}

impl ExtractReport {
    /// Whether a file was written for the stylesheet at `source`.
    pub fn contains_source(&self, source: &Path) -> bool {
        self.emitted.iter().any(|file| file.source == source)
    }
}

/// An `@import` produced in place of an extracted span.
///
/// The URL is only computed once the containing document is known.
#[derive(Debug, Clone)]
struct GeneratedImport {
    target: PathBuf,
    media: String,
    source: Source,
}

/// A rebuilt child: kept node or generated import.
#[derive(Debug, Clone)]
enum Item {
    Node(Node),
    Import(GeneratedImport),
}

impl Item {
    fn into_node(self, doc_dir: &Path) -> Node {
        match self {
            Item::Node(node) => node,
            Item::Import(import) => import_node(
                &to_import_url(doc_dir, &import.target),
                &import.media,
                import.source,
            ),
        }
    }

    fn is_comment(&self) -> bool {
        matches!(self, Item::Node(Node::Comment(_)))
    }
}

/// The `@import` condition that stands in for a container at-rule.
///
/// `@media` conditions already travel in [`Scope::media`].
fn wrapper_condition(name: &str, params: &str) -> Option<String> {
    match name.to_ascii_lowercase().as_str() {
        "media" => None,
        "supports" => Some(format!("supports({})", params)),
        "layer" if params.is_empty() => Some("layer".to_string()),
        "layer" => Some(format!("layer({})", params)),
        other => {
            tracing::warn!(
                "@{} {} cannot be expressed on an @import; its condition is dropped",
                other,
                params
            );
            None
        }
    }
}

fn prefix_condition(condition: &str, media: &str) -> String {
    if media.is_empty() {
        condition.to_string()
    } else {
        format!("{} {}", condition, media)
    }
}

/// Where a child list lives.
#[derive(Debug, Clone, Copy)]
struct Scope<'s> {
    /// Directory of the document that will hold generated imports.
    doc_dir: &'s Path,
    /// Prevailing media condition, empty at document level.
    media: &'s str,
}

/// Mutable state of one extraction pass.
struct Pass<'p> {
    ledger: &'p mut ImportLedger,
    report: ExtractReport,
}

/// Splits marked stylesheets into files under the configured output directory.
#[derive(Debug, Clone)]
pub struct Extractor {
    paths: ResolvedPaths,
    build: BuildContext,
}

impl Extractor {
    /// Create an extractor for the given options and build settings.
    pub fn new(options: &ReexportOptions, build: BuildContext) -> Result<Self> {
        Ok(Self {
            paths: options.resolved()?,
            build,
        })
    }

    /// The resolved `context` and `temp_path`.
    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    /// Extract every span of `root`, replacing each with an `@import`.
    ///
    /// Pending imports recorded for the entry document and for each span are
    /// consumed from `ledger`. On error `root` is left untouched; files
    /// already written stay on disk.
    pub fn extract(&self, root: &mut Root, ledger: &mut ImportLedger) -> Result<ExtractReport> {
        let doc_dir = root.base_dir()?;
        let mut pass = Pass {
            ledger,
            report: ExtractReport::default(),
        };
        let scope = Scope {
            doc_dir: &doc_dir,
            media: "",
        };

        let items = self.process_children(root.nodes.clone(), scope, &mut pass)?;
        let pending = pass.ledger.take_entry();
        root.nodes = self.finish_document(items, pending, &doc_dir)?;

        tracing::debug!(
            "extracted {} import blocks from {}",
            pass.report.emitted.len(),
            root.source
        );
        Ok(pass.report)
    }

    /// Where the content of `source_file` is written.
    ///
    /// Mirrors the path relative to `context` under `temp_path`; components
    /// that would climb out of `temp_path` are dropped.
    pub fn output_path(&self, source_file: &Path) -> Result<PathBuf> {
        let source_file = absolute_path(source_file)?;
        let relative = relative_to(&self.paths.context, &source_file);
        let mirrored = strip_parent_components(&relative);
        if mirrored != relative {
            tracing::warn!(
                "{} is outside the context directory; writing it to {}",
                source_file.display(),
                mirrored.display()
            );
        }
        Ok(self.paths.temp_path.join(mirrored))
    }

    /// Rebuild one child list, extracting every span in it.
    fn process_children(
        &self,
        nodes: Vec<Node>,
        scope: Scope<'_>,
        pass: &mut Pass<'_>,
    ) -> Result<Vec<Item>> {
        let mut shapes = plan_spans(&nodes)?.into_iter().peekable();
        let mut items = Vec::with_capacity(nodes.len());
        let mut active: Option<SpanShape> = None;
        let mut run = vec![];

        for (index, node) in nodes.into_iter().enumerate() {
            if active.is_none() && shapes.peek().is_some_and(|s| s.first() == index) {
                active = shapes.next();
            }
            match active {
                Some(shape) => {
                    run.push(node);
                    if index == shape.last() {
                        items.extend(self.extract_run(shape, std::mem::take(&mut run), scope, pass)?);
                        active = None;
                    }
                }
                None => items.extend(self.process_node(node, scope, pass)?),
            }
        }

        Ok(items)
    }

    fn process_node(&self, node: Node, scope: Scope<'_>, pass: &mut Pass<'_>) -> Result<Vec<Item>> {
        match node {
            Node::AtRule(at) if at.contains_markers() => self.process_container(at, scope, pass),
            other => Ok(vec![Item::Node(other)]),
        }
    }

    /// Recurse into an at-rule holding spans deeper inside.
    ///
    /// Generated imports never stay nested: they are moved in front of the
    /// rebuilt at-rule and carry its condition. The at-rule itself is kept
    /// only while it still holds something other than comments.
    fn process_container(
        &self,
        at: AtRule,
        scope: Scope<'_>,
        pass: &mut Pass<'_>,
    ) -> Result<Vec<Item>> {
        let AtRule {
            name,
            params,
            nodes,
            source,
        } = at;
        let is_media = name.eq_ignore_ascii_case("media");
        let inner = Scope {
            doc_dir: scope.doc_dir,
            media: if is_media { params.as_str() } else { scope.media },
        };

        let items = self.process_children(nodes.unwrap_or_default(), inner, pass)?;
        let (imports, rest): (Vec<Item>, Vec<Item>) = items
            .into_iter()
            .partition(|item| matches!(item, Item::Import(_)));

        let mut hoisted = imports;
        if !hoisted.is_empty() {
            if let Some(condition) = wrapper_condition(&name, &params) {
                for item in &mut hoisted {
                    if let Item::Import(import) = item {
                        import.media = prefix_condition(&condition, &import.media);
                    }
                }
            }
        }

        if rest.iter().all(Item::is_comment) {
            hoisted.extend(rest);
            return Ok(hoisted);
        }

        let children = rest
            .into_iter()
            .map(|item| item.into_node(scope.doc_dir))
            .collect();
        hoisted.push(Item::Node(Node::AtRule(AtRule {
            name,
            params,
            nodes: Some(children),
            source,
        })));
        Ok(hoisted)
    }

    fn extract_run(
        &self,
        shape: SpanShape,
        run: Vec<Node>,
        scope: Scope<'_>,
        pass: &mut Pass<'_>,
    ) -> Result<Vec<Item>> {
        tracing::debug!("extracting {:?} span at {}", shape, run[0].source());

        match shape {
            SpanShape::Unwrapped { .. } => {
                let (start, content) = split_markers(run)?;
                let import = self.emit_span(start, content, scope, pass)?;
                Ok(vec![Item::Import(import)])
            }
            SpanShape::Wrapped { .. } => {
                let mut run = run;
                let node = run.remove(0);
                let node = match node {
                    Node::AtRule(at) if at.name.eq_ignore_ascii_case("media") => {
                        let params = at.params.clone();
                        normalize_media(Node::AtRule(at), &params)
                    }
                    other => other,
                };
                self.process_node(node, scope, pass)
            }
            SpanShape::SplitPair { .. } | SpanShape::SplitMixed { .. } => {
                let params = run
                    .iter()
                    .filter_map(Node::as_at_rule)
                    .find(|at| at.name.eq_ignore_ascii_case("media"))
                    .map(|at| at.params.clone())
                    .unwrap_or_default();
                let source = run[0].source().clone();
                let block = normalize_run(run, &params, source);
                self.process_node(block, scope, pass)
            }
        }
    }

    /// Write one span to its own file and return the import replacing it.
    fn emit_span(
        &self,
        start: Marker,
        mut content: Vec<Node>,
        scope: Scope<'_>,
        pass: &mut Pass<'_>,
    ) -> Result<GeneratedImport> {
        let source_file = content
            .iter()
            .find_map(|node| node.source().file_path())
            .or_else(|| start.source.file_path())
            .ok_or_else(|| Error::MissingSource {
                at: start.source.clone(),
            })?;
        let source_file = absolute_path(source_file)?;
        let out_path = self.output_path(&source_file)?;
        if let Some(earlier) = pass
            .report
            .emitted
            .iter()
            .find(|file| file.path == out_path && file.source != source_file)
        {
            return Err(Error::OutputCollision {
                path: out_path,
                first: earlier.source.clone(),
                second: source_file,
            });
        }
        let out_dir = out_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.paths.temp_path.clone());

        // placeholder anchoring an import-only stylesheet
        content.retain(|node| !matches!(node, Node::Comment(c) if c.text.is_empty()));

        let inner = Scope {
            doc_dir: &out_dir,
            media: "",
        };
        let items = self.process_children(content, inner, pass)?;
        let pending = pass.ledger.take_span(start.span);
        let mut nodes = self.finish_document(items, pending, &out_dir)?;
        rebase_urls(&mut nodes, &source_file, &out_path);

        let root = Root::from_nodes(nodes, Source::file(&out_path));
        let map = self.write_stylesheet(&root, &out_path)?;
        tracing::info!(
            "extracted {} to {}",
            source_file.display(),
            out_path.display()
        );

        pass.report.emitted.push(EmittedFile {
            path: out_path.clone(),
            source: source_file,
            map,
        });

        Ok(GeneratedImport {
            target: out_path,
            media: scope.media.to_string(),
            source: start.source,
        })
    }

    /// Turn the rebuilt items of a document into its final node list.
    ///
    /// With recorded pending imports, the generated in-place imports are
    /// replaced by the replay; otherwise they are kept where they are.
    fn finish_document(
        &self,
        items: Vec<Item>,
        pending: Option<Vec<PendingImport>>,
        doc_dir: &Path,
    ) -> Result<Vec<Node>> {
        match pending {
            Some(pending) if !pending.is_empty() => {
                let mut nodes = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Item::Node(node) => Some(node),
                        Item::Import(_) => None,
                    })
                    .collect();
                self.replay_imports(&mut nodes, &pending, doc_dir)?;
                Ok(nodes)
            }
            _ => Ok(items
                .into_iter()
                .map(|item| item.into_node(doc_dir))
                .collect()),
        }
    }

    /// Prepend `@import`s of the emitted files for `pending`, in original
    /// order. Imports whose emitted file does not exist are skipped.
    fn replay_imports(
        &self,
        nodes: &mut Vec<Node>,
        pending: &[PendingImport],
        doc_dir: &Path,
    ) -> Result<()> {
        let insert_at = nodes
            .iter()
            .take_while(|node| node.is_at_rule_named("charset"))
            .count();

        for import in pending.iter().rev() {
            let emitted = self.output_path(&import.target)?;
            if !fs::file_exists(&emitted) {
                tracing::debug!(
                    "skipping import of {}: nothing was extracted to {}",
                    import.target.display(),
                    emitted.display()
                );
                continue;
            }
            let url = to_import_url(doc_dir, &emitted);
            nodes.insert(
                insert_at,
                import_node(&url, &import.media, import.source.clone()),
            );
        }
        Ok(())
    }

    /// Render and write one emitted stylesheet, with its map if requested.
    fn write_stylesheet(&self, root: &Root, out_path: &Path) -> Result<Option<PathBuf>> {
        let rendered = render(
            root,
            &RenderOptions {
                markers: MarkerOutput::Strip,
                source_map: self.build.map != MapMode::Disabled,
                output: Some(out_path.to_path_buf()),
            },
        );
        let json = rendered.map_json()?;
        let mut css = rendered.css;
        let mut map_path = None;

        match (self.build.map, json) {
            (MapMode::External, Some(json)) => {
                let path = with_map_extension(out_path);
                fs::write_text(&path, json)?;
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                css.push_str(&format!("/*# sourceMappingURL={} */\n", name));
                map_path = Some(path);
            }
            (MapMode::Inline, Some(json)) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(json.as_bytes());
                css.push_str(&format!(
                    "/*# sourceMappingURL=data:application/json;base64,{} */\n",
                    encoded
                ));
            }
            _ => {}
        }

        fs::write_text(out_path, css)?;
        Ok(map_path)
    }
}

/// Separate the start marker and the content of an unwrapped run.
fn split_markers(run: Vec<Node>) -> Result<(Marker, Vec<Node>)> {
    let mut nodes = run.into_iter();
    let start = match nodes.next() {
        Some(Node::Marker(marker)) => marker,
        Some(other) => {
            return Err(Error::unexpected_marker(
                other.source(),
                "import block does not begin with a start marker",
            ));
        }
        None => {
            return Err(Error::unexpected_marker(
                &Source::default(),
                "empty import block",
            ));
        }
    };
    let mut content: Vec<Node> = nodes.collect();
    content.pop();
    Ok((start, content))
}

fn with_map_extension(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}
