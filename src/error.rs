// Error types
//
// Parse anomalies (malformed quoting, ragged rows) are NOT errors: they go to
// a ValidationSink and iteration continues. Only unsupported calls, bad
// construction arguments and I/O failures surface here.

use std::fmt;
use thiserror::Error;

/// Which kind of data source an operation was attempted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Owned in-memory text.
    Text,
    /// Borrowed text slice.
    Slice,
    /// Buffered, decoded byte stream.
    Stream,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Text => "text",
            SourceKind::Slice => "slice",
            SourceKind::Stream => "stream",
        };
        f.write_str(name)
    }
}

/// Errors raised by the tokenization engine.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The source cannot provide this operation (buffer access on a stream,
    /// rewinding a non-seekable stream). Reader state is left untouched.
    #[error("unsupported operation `{operation}` on {kind} source")]
    UnsupportedOperation {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Kind of source that rejected it.
        kind: SourceKind,
    },

    /// Options failed validation at construction time.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Failure of the underlying reader, passed through as-is.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CsvError {
    pub(crate) fn unsupported(operation: &'static str, kind: SourceKind) -> Self {
        CsvError::UnsupportedOperation { operation, kind }
    }

    /// True for `UnsupportedOperation`.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, CsvError::UnsupportedOperation { .. })
    }
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, CsvError>;
