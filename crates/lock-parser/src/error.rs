//! Error types for lock-parser.

use thiserror::Error;

use crate::span::{LineIndex, Position, Span};

/// Errors that can occur while reading or parsing a lock file.
///
/// Any error fails the whole file; no partially parsed [`LockFile`](crate::LockFile)
/// is ever handed out.
#[derive(Debug, Error)]
pub enum LockFileError {
    /// The input contains no blocks or attributes (empty, whitespace or comments only).
    #[error("lock file is empty")]
    Empty,

    /// The input does not conform to the grammar.
    #[error("syntax error at {position}: {message}")]
    Syntax { position: Position, message: String },

    /// A `provider` block is syntactically valid but has the wrong shape,
    /// e.g. a missing label or a non-literal value where a literal is required.
    #[error("invalid provider block{} at {position}: {message}", provider_suffix(.provider.as_deref()))]
    Structure {
        provider: Option<String>,
        position: Position,
        message: String,
    },

    /// A required attribute is absent from a `provider` block.
    #[error("provider \"{provider}\" has no `{field}` attribute")]
    MissingField {
        provider: String,
        field: &'static str,
    },

    /// Two `provider` blocks share a name.
    #[error("provider \"{name}\" is declared more than once (lines {first_line} and {line})")]
    DuplicateProvider {
        name: String,
        first_line: usize,
        line: usize,
    },

    /// The file could not be read.
    #[error("failed to read lock file: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`LockFileError`], for callers that report
/// categories rather than messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    MissingField,
    DuplicateName,
    Io,
}

impl LockFileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LockFileError::Empty | LockFileError::Syntax { .. } | LockFileError::Structure { .. } => {
                ErrorKind::Structural
            }
            LockFileError::MissingField { .. } => ErrorKind::MissingField,
            LockFileError::DuplicateProvider { .. } => ErrorKind::DuplicateName,
            LockFileError::Io(_) => ErrorKind::Io,
        }
    }
}

fn provider_suffix(provider: Option<&str>) -> String {
    provider.map(|name| format!(" \"{name}\"")).unwrap_or_default()
}

/// A grammar violation located by byte span. Converted into
/// [`LockFileError::Syntax`] once a line index is at hand.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SyntaxError {
    pub(crate) span: Span,
    pub(crate) message: String,
}

impl SyntaxError {
    pub(crate) fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }

    pub(crate) fn locate(self, index: &LineIndex<'_>) -> LockFileError {
        LockFileError::Syntax {
            position: index.position(self.span.start),
            message: self.message,
        }
    }
}
