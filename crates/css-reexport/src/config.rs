//! Plugin options and build settings.
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```toml
//! context = "./src"
//! tempPath = "./build/css"
//! export = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::paths::absolute_path;
use crate::{Error, Result};

/// Which behavior a [`crate::Reexport`] invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Insert boundary markers into an imported stylesheet.
    Mark,
    /// Record the entry stylesheet's leading imports.
    RecordEntry,
    /// Split marked blocks out into separate files.
    Extract,
}

/// Recognized plugin options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReexportOptions {
    /// Root used to compute each output file's mirrored relative path.
    pub context: PathBuf,
    /// Output directory root for extracted stylesheets.
    pub temp_path: PathBuf,
    /// Run extraction.
    #[serde(alias = "isExport")]
    pub export: bool,
    /// The stylesheet being processed is the build's entry point.
    pub initial: bool,
}

impl Default for ReexportOptions {
    fn default() -> Self {
        Self {
            context: PathBuf::from("./"),
            temp_path: PathBuf::from("./postcss-temp"),
            export: false,
            initial: false,
        }
    }
}

impl ReexportOptions {
    /// Create options with the defaults (`./` and `./postcss-temp`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context directory.
    pub fn context(mut self, context: impl Into<PathBuf>) -> Self {
        self.context = context.into();
        self
    }

    /// Set the output directory.
    pub fn temp_path(mut self, temp_path: impl Into<PathBuf>) -> Self {
        self.temp_path = temp_path.into();
        self
    }

    /// Enable or disable extraction.
    pub fn export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    /// Mark the processed stylesheet as the entry point.
    pub fn initial(mut self, initial: bool) -> Self {
        self.initial = initial;
        self
    }

    /// The behavior selected by the `export` / `initial` flags.
    ///
    /// `export` takes precedence over `initial`.
    pub fn mode(&self) -> Mode {
        if self.export {
            Mode::Extract
        } else if self.initial {
            Mode::RecordEntry
        } else {
            Mode::Mark
        }
    }

    /// Parse options from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = crate::fs::read_text(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve `context` and `temp_path` to absolute, normalized paths.
    pub fn resolved(&self) -> Result<ResolvedPaths> {
        Ok(ResolvedPaths {
            context: absolute_path(&self.context)?,
            temp_path: absolute_path(&self.temp_path)?,
        })
    }
}

/// Absolute forms of the configured directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub context: PathBuf,
    pub temp_path: PathBuf,
}

/// Source-map mode inherited from the outer build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    /// No source maps.
    #[default]
    Disabled,
    /// Write `<file>.map` next to each emitted file.
    External,
    /// Embed the map as a base64 data URL comment.
    Inline,
}

/// Settings owned by the outer build rather than by this plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildContext {
    pub map: MapMode,
}

impl BuildContext {
    /// Build settings with the given map mode.
    pub fn with_map(map: MapMode) -> Self {
        Self { map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ReexportOptions::default();
        assert_eq!(options.context, PathBuf::from("./"));
        assert_eq!(options.temp_path, PathBuf::from("./postcss-temp"));
        assert_eq!(options.mode(), Mode::Mark);
    }

    #[test]
    fn mode_selection() {
        assert_eq!(ReexportOptions::new().initial(true).mode(), Mode::RecordEntry);
        assert_eq!(ReexportOptions::new().export(true).mode(), Mode::Extract);
        assert_eq!(
            ReexportOptions::new().export(true).initial(true).mode(),
            Mode::Extract
        );
    }

    #[test]
    fn parse_toml_options() {
        let options = ReexportOptions::from_toml_str(
            r#"
            context = "./src"
            tempPath = "./build/css"
            isExport = true
            "#,
        )
        .unwrap();

        assert_eq!(options.context, PathBuf::from("./src"));
        assert_eq!(options.temp_path, PathBuf::from("./build/css"));
        assert_eq!(options.mode(), Mode::Extract);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let options = ReexportOptions::from_toml_str("initial = true").unwrap();
        assert_eq!(options.temp_path, PathBuf::from("./postcss-temp"));
        assert_eq!(options.mode(), Mode::RecordEntry);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = ReexportOptions::from_toml_str("context = 5").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn resolved_paths_are_absolute() {
        let resolved = ReexportOptions::new().resolved().unwrap();
        assert!(resolved.context.is_absolute());
        assert!(resolved.temp_path.ends_with("postcss-temp"));
    }
}
