//! Re-export inlined CSS `@import` trees as separate stylesheet files.
//!
//! Build pipelines usually merge a tree of stylesheets linked by `@import`
//! into one file. This crate makes that step reversible:
//!
//! - **Marker insertion**: while imports are inlined, the content of every
//!   imported stylesheet is fenced by a pair of boundary markers and its own
//!   leading `@import`s are recorded
//! - **Block extraction**: the merged stylesheet is split back along the
//!   markers, one file per imported stylesheet under an output directory,
//!   with relative URLs rebased and optional source maps
//! - **Import replay**: each rebuilt document gets its original `@import`s
//!   back, pointing at the extracted files
//!
//! Media-wrapped imports (`@import 'x.css' print;`) are handled whether the
//! media block survived as one wrapper or was split into several siblings.
//!
//! # Example
//!
//! ```ignore
//! use css_reexport::prelude::*;
//!
//! let options = ReexportOptions::new().context("./src").temp_path("./build/css");
//! let exported = Reexport::new(options).export_entry("src/main.css", &BuildContext::default())?;
//!
//! for file in &exported.report.emitted {
//!     println!("{} -> {}", file.source.display(), file.path.display());
//! }
//! ```

pub mod config;
pub mod extract;
pub mod fs;
pub mod imports;
pub mod inline;
pub mod markers;
pub mod media;
pub mod parser;
pub mod paths;
pub mod printer;
pub mod rebase;
pub mod tree;

mod error;
mod plugin;

pub use error::{Error, Result};
pub use plugin::{Exported, Outcome, Reexport};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::config::{BuildContext, MapMode, Mode, ReexportOptions};
    pub use crate::extract::{EmittedFile, ExtractReport, Extractor};
    pub use crate::imports::{ImportLedger, PendingImport};
    pub use crate::inline::ImportInliner;
    pub use crate::markers::{add_markers, record_entry_imports};
    pub use crate::printer::{MarkerOutput, RenderOptions, Rendered, render};
    pub use crate::tree::{Marker, MarkerKind, Node, Root, Source, SpanId};
    pub use crate::{Error, Exported, Outcome, Reexport, Result};
}
