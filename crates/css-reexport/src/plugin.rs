//! The re-export plugin: one entry point dispatching on the configured mode.

use std::path::Path;

use crate::config::{BuildContext, Mode, ReexportOptions};
use crate::extract::{ExtractReport, Extractor};
use crate::imports::ImportLedger;
use crate::inline::ImportInliner;
use crate::markers::{add_markers, record_entry_imports};
use crate::printer::{MarkerOutput, RenderOptions, render};
use crate::tree::{Root, SpanId};
use crate::Result;

/// What one [`Reexport::process`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Markers were inserted (`Some`) or the stylesheet needed none.
    Marked(Option<SpanId>),
    /// Number of entry imports recorded.
    Recorded(usize),
    /// Files written by extraction.
    Extracted(ExtractReport),
}

/// Result of a full [`Reexport::export_entry`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exported {
    /// The rebuilt entry stylesheet.
    pub css: String,
    pub report: ExtractReport,
}

/// The CSS import re-export transform.
///
/// # Example
///
/// ```ignore
/// use css_reexport::prelude::*;
///
/// let plugin = Reexport::new(
///     ReexportOptions::new().context("./src").temp_path("./build/css"),
/// );
/// let exported = plugin.export_entry("src/main.css", &BuildContext::default())?;
/// std::fs::write("build/main.css", exported.css)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Reexport {
    options: ReexportOptions,
}

impl Reexport {
    pub fn new(options: ReexportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReexportOptions {
        &self.options
    }

    /// Run the mode selected by the options on one stylesheet.
    pub fn process(
        &self,
        root: &mut Root,
        ledger: &mut ImportLedger,
        build: &BuildContext,
    ) -> Result<Outcome> {
        match self.options.mode() {
            Mode::Mark => Ok(Outcome::Marked(add_markers(root, ledger)?)),
            Mode::RecordEntry => Ok(Outcome::Recorded(record_entry_imports(root, ledger)?)),
            Mode::Extract => {
                let extractor = Extractor::new(&self.options, *build)?;
                Ok(Outcome::Extracted(extractor.extract(root, ledger)?))
            }
        }
    }

    /// Inline the imports of the entry stylesheet at `path`, marking every
    /// imported block and recording pending imports into `ledger`.
    pub fn inline_entry(&self, path: impl AsRef<Path>, ledger: &mut ImportLedger) -> Result<Root> {
        ImportInliner::new(ledger).inline_entry(path)
    }

    /// Inline the entry at `path`, extract every imported block to
    /// `temp_path` and return the rebuilt entry stylesheet.
    pub fn export_entry(&self, path: impl AsRef<Path>, build: &BuildContext) -> Result<Exported> {
        let mut ledger = ImportLedger::new();
        let mut root = self.inline_entry(path, &mut ledger)?;

        let report = Extractor::new(&self.options, *build)?.extract(&mut root, &mut ledger)?;
        let css = render(
            &root,
            &RenderOptions {
                markers: MarkerOutput::Strip,
                ..Default::default()
            },
        )
        .css;

        Ok(Exported { css, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapMode;

    #[test]
    fn mark_mode_inserts_markers() {
        let mut root = Root::from_css(".b { color: blue; }", Some(Path::new("/p/b.css"))).unwrap();
        let mut ledger = ImportLedger::new();

        let outcome = Reexport::default()
            .process(&mut root, &mut ledger, &BuildContext::default())
            .unwrap();

        assert!(matches!(outcome, Outcome::Marked(Some(_))));
        assert_eq!(root.marker_count(), 2);
    }

    #[test]
    fn initial_mode_only_records() {
        let mut root = Root::from_css(
            "@import 'b.css';\n.a { color: red; }",
            Some(Path::new("/p/a.css")),
        )
        .unwrap();
        let mut ledger = ImportLedger::new();

        let outcome = Reexport::new(ReexportOptions::new().initial(true))
            .process(&mut root, &mut ledger, &BuildContext::default())
            .unwrap();

        assert_eq!(outcome, Outcome::Recorded(1));
        assert_eq!(root.marker_count(), 0);
    }

    #[test]
    fn export_mode_without_markers_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("a.css");
        let mut root = Root::from_css(".a { color: red; }", Some(entry.as_path())).unwrap();
        let before = root.clone();
        let options = ReexportOptions::new()
            .context(dir.path())
            .temp_path(dir.path().join("out"))
            .export(true);

        let outcome = Reexport::new(options)
            .process(
                &mut root,
                &mut ImportLedger::new(),
                &BuildContext::with_map(MapMode::External),
            )
            .unwrap();

        assert_eq!(outcome, Outcome::Extracted(ExtractReport::default()));
        assert_eq!(root, before);
        assert!(!dir.path().join("out").exists());
    }
}
