//! Source references attached to every node.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a node came from: originating file plus position.
///
/// Lines and columns are 1-indexed; `0:0` means the position is unknown
/// (synthesized nodes without a parsed origin).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Source {
    /// Originating stylesheet file, if the CSS was read from disk.
    pub file: Option<PathBuf>,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl Source {
    /// Create a source reference.
    pub fn new(file: Option<PathBuf>, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// A reference to the start of `file`.
    pub fn file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            line: 1,
            column: 1,
        }
    }

    /// The originating file, if known.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Whether the position points at a real location.
    pub fn has_position(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<input>".to_string());
        if self.has_position() {
            write!(f, "{}:{}:{}", file, self.line, self.column)
        } else {
            write!(f, "{}", file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_position() {
        let source = Source::new(Some(PathBuf::from("styles/a.css")), 3, 7);
        assert_eq!(source.to_string(), "styles/a.css:3:7");
    }

    #[test]
    fn display_unknown() {
        assert_eq!(Source::default().to_string(), "<input>");
    }
}
