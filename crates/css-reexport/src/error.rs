//! Error types for the re-export transform.

use std::path::PathBuf;

use crate::tree::Source;

/// Result type alias for re-export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while marking or extracting stylesheets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// CSS parse error.
    #[error("CSS parse error at line {line}, column {column}: {message}")]
    Parse {
        message: String,
        line: u32,
        column: u32,
    },

    /// File I/O error.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A start marker whose end marker is never reached.
    #[error("unclosed import boundary starting at {at}")]
    UnclosedMarker { at: Source },

    /// An end marker without a start, or a start inside an open span.
    #[error("unexpected import boundary at {at}: {message}")]
    UnexpectedMarker { at: Source, message: String },

    /// Extracted content with no originating file to mirror.
    #[error("cannot determine the source file of the import block at {at}")]
    MissingSource { at: Source },

    /// Two stylesheets mirrored onto the same output file.
    #[error("'{first}' and '{second}' would both be written to '{path}'")]
    OutputCollision {
        path: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    /// `@import` chain that leads back to itself.
    #[error("recursive import detected: {path}")]
    ImportCycle { path: PathBuf },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Source map serialization failure.
    #[error("invalid source map: {0}")]
    SourceMap(#[from] sourcemap::Error),
}

impl Error {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::Parse {
            message: message.into(),
            line,
            column,
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an unexpected-marker error.
    pub fn unexpected_marker(at: &Source, message: impl Into<String>) -> Self {
        Self::UnexpectedMarker {
            at: at.clone(),
            message: message.into(),
        }
    }

    /// Create an unclosed-marker error.
    pub fn unclosed_marker(at: &Source) -> Self {
        Self::UnclosedMarker { at: at.clone() }
    }
}
