//! `@import` bookkeeping shared by marker insertion and extraction.
//!
//! Imports that precede the first real node of a stylesheet are consumed when
//! the stylesheet is inlined, so they are recorded as [`PendingImport`]s in an
//! [`ImportLedger`] and replayed once the blocks have been split back out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cssparser::{ParseError as CssParseError, Parser, ParserInput, Token};
use url::Url;

use crate::paths::normalize_path;
use crate::tree::{AtRule, Node, Source, SpanId};

/// An `@import` statement recorded before its content was inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    /// Absolute path of the imported stylesheet.
    pub target: PathBuf,
    /// Source reference of the original `@import`.
    pub source: Source,
    /// Media condition after the URL, verbatim (empty when absent).
    pub media: String,
}

impl PendingImport {
    /// Build a pending import from an `@import` at-rule.
    ///
    /// `base_dir` is the absolute directory of the importing stylesheet.
    /// Returns `None` for remote or unparseable imports.
    pub fn from_at_rule(at: &AtRule, base_dir: &Path) -> Option<Self> {
        let params = parse_import_params(&at.params)?;
        if !is_local_url(&params.url) {
            return None;
        }
        Some(Self {
            target: normalize_path(base_dir.join(strip_query(&params.url))),
            source: at.source.clone(),
            media: params.media,
        })
    }
}

/// The URL and media condition of an `@import`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportParams {
    pub url: String,
    pub media: String,
}

/// Split `@import` parameters into URL and trailing media text.
///
/// Accepts `'x.css'`, `"x.css"`, `url(x.css)` and `url('x.css')`.
pub fn parse_import_params(params: &str) -> Option<ImportParams> {
    let mut input = ParserInput::new(params);
    let mut parser = Parser::new(&mut input);

    let url = match parser.next() {
        Ok(Token::QuotedString(s)) | Ok(Token::UnquotedUrl(s)) => s.to_string(),
        Ok(Token::Function(name)) if name.eq_ignore_ascii_case("url") => parser
            .parse_nested_block(|p| {
                let url = p.expect_string()?.to_string();
                Ok::<_, CssParseError<'_, ()>>(url)
            })
            .ok()?,
        _ => return None,
    };

    let start = parser.position();
    while parser.next_including_whitespace_and_comments().is_ok() {}
    let media = parser.slice_from(start).trim().to_string();

    Some(ImportParams { url, media })
}

/// Whether an import URL refers to a local file.
pub fn is_local_url(url: &str) -> bool {
    !url.is_empty() && !url.starts_with("//") && Url::parse(url).is_err()
}

/// Remove `?query` and `#fragment` suffixes from a URL.
pub fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Create an `@import '<url>'[ media];` node.
pub fn import_node(url: &str, media: &str, source: Source) -> Node {
    let params = if media.is_empty() {
        format!("'{}'", url)
    } else {
        format!("'{}' {}", url, media)
    };
    Node::at_rule("import", params).with_source(source)
}

/// Pending imports for one build pass, keyed by document or span.
///
/// Entries are consumed by extraction: each list is replayed once and then
/// discarded.
#[derive(Debug, Default)]
pub struct ImportLedger {
    next_span: u32,
    entry: Option<Vec<PendingImport>>,
    spans: HashMap<SpanId, Vec<PendingImport>>,
}

impl ImportLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh span id.
    pub fn allocate_span(&mut self) -> SpanId {
        self.next_span += 1;
        SpanId(self.next_span)
    }

    /// Record the imports of the stylesheet wrapped by `span`.
    pub fn record_span(&mut self, span: SpanId, imports: Vec<PendingImport>) {
        if !imports.is_empty() {
            self.spans.insert(span, imports);
        }
    }

    /// Record the imports of the entry document.
    pub fn record_entry(&mut self, imports: Vec<PendingImport>) {
        self.entry = Some(imports);
    }

    /// Imports recorded for `span`.
    pub fn span_imports(&self, span: SpanId) -> Option<&[PendingImport]> {
        self.spans.get(&span).map(Vec::as_slice)
    }

    /// Imports recorded for the entry document.
    pub fn entry_imports(&self) -> Option<&[PendingImport]> {
        self.entry.as_deref()
    }

    /// Remove and return the imports recorded for `span`.
    pub fn take_span(&mut self, span: SpanId) -> Option<Vec<PendingImport>> {
        self.spans.remove(&span)
    }

    /// Remove and return the entry document's imports.
    pub fn take_entry(&mut self) -> Option<Vec<PendingImport>> {
        self.entry.take()
    }

    /// Whether nothing is left to replay.
    pub fn is_empty(&self) -> bool {
        self.entry.is_none() && self.spans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quoted_import() {
        let params = parse_import_params("'b.css'").unwrap();
        assert_eq!(params.url, "b.css");
        assert_eq!(params.media, "");
    }

    #[test]
    fn parse_url_import_with_media() {
        let params = parse_import_params("url('../components/gallery.css') print").unwrap();
        assert_eq!(params.url, "../components/gallery.css");
        assert_eq!(params.media, "print");

        let params = parse_import_params("url(x.css) screen and (max-width: 100px)").unwrap();
        assert_eq!(params.url, "x.css");
        assert_eq!(params.media, "screen and (max-width: 100px)");
    }

    #[test]
    fn reject_non_url_params() {
        assert!(parse_import_params("screen").is_none());
        assert!(parse_import_params("").is_none());
    }

    #[test]
    fn local_urls() {
        assert!(is_local_url("b.css"));
        assert!(is_local_url("../b.css"));
        assert!(!is_local_url("https://example.com/b.css"));
        assert!(!is_local_url("//cdn.example.com/b.css"));
        assert!(!is_local_url(""));
    }

    #[test]
    fn pending_import_resolves_target() {
        let node = Node::at_rule("import", "'../lib/b.css?v=2' print");
        let at = node.as_at_rule().unwrap();

        let pending = PendingImport::from_at_rule(at, Path::new("/p/src")).unwrap();
        assert_eq!(pending.target, PathBuf::from("/p/lib/b.css"));
        assert_eq!(pending.media, "print");
    }

    #[test]
    fn remote_import_is_not_pending() {
        let node = Node::at_rule("import", "url('https://fonts.example.com/a.css')");
        assert!(PendingImport::from_at_rule(node.as_at_rule().unwrap(), Path::new("/p")).is_none());
    }

    #[test]
    fn import_node_params() {
        let node = import_node("./out/b.css", "print", Source::default());
        assert_eq!(node.as_at_rule().unwrap().params, "'./out/b.css' print");

        let node = import_node("./out/b.css", "", Source::default());
        assert_eq!(node.as_at_rule().unwrap().params, "'./out/b.css'");
    }

    #[test]
    fn ledger_consumes_entries() {
        let mut ledger = ImportLedger::new();
        let span = ledger.allocate_span();
        assert_ne!(span, SpanId::UNTRACKED);

        ledger.record_span(
            span,
            vec![PendingImport {
                target: PathBuf::from("/p/c.css"),
                source: Source::default(),
                media: String::new(),
            }],
        );
        ledger.record_entry(vec![]);

        assert_eq!(ledger.span_imports(span).map(<[_]>::len), Some(1));
        assert!(ledger.take_span(span).is_some());
        assert!(ledger.take_entry().is_some());
        assert!(ledger.is_empty());
    }
}
