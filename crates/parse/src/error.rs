//! Parser Error Types

use derive_more::{Display, Error};

/// A parse error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for parse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Manifests never fail to parse (unknown lines are skipped), so every kind
/// here comes from the metadata or document parsers.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The text is not well-formed at the given (1-based) line.
    #[display("syntax error on line {line}: {message}")]
    Syntax {
        line: usize,
        #[error(not(source))]
        message: String,
    },
    /// Input ended while a construct was still open.
    #[display("unexpected end of input: {_0}")]
    UnexpectedEof(#[error(not(source))] String),
    /// The document does not contain a root object.
    #[display("missing root object")]
    MissingRootObject,
    /// The QML grammar could not be loaded into the tree-sitter runtime.
    #[display("QML grammar unavailable")]
    Grammar,
}

impl ErrorKind {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax { line, message: message.into() }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Parsing is a pure function of the text; the same input fails again.
        false
    }
}
