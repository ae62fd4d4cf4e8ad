//! Error types for the DOM layer.
//!
//! Four error kinds cover every failure mode of the public API: malformed
//! input ([`ParseError`]), a malformed name or wrong node kind
//! ([`XmlError::InvalidArgument`]), a bad child or attribute index
//! ([`XmlError::IndexOutOfBounds`]), and a malformed or unevaluable path
//! expression ([`QueryError`]). All of them are reported to the immediate
//! caller as explicit `Result`s; no operation leaves the tree partially
//! mutated on failure.

use std::fmt;

use thiserror::Error;

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error type returned when XML parsing fails.
///
/// Carries the position of the fatal error so callers can point at the
/// offending input.
#[derive(Debug, Clone, Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the source the fatal error occurred.
    pub location: SourceLocation,
}

impl ParseError {
    /// Creates a `ParseError` with the given message and location.
    #[must_use]
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// The error type returned when a path query is malformed or cannot be
/// evaluated. Wraps the underlying query engine's diagnostic.
#[derive(Debug, Clone, Error)]
#[error("xpath error: {message}")]
pub struct QueryError {
    /// The engine's diagnostic message.
    pub message: String,
}

impl QueryError {
    /// Creates a `QueryError` with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Umbrella error type for all DOM-level operations.
#[derive(Debug, Clone, Error)]
pub enum XmlError {
    /// The input was not well-formed XML.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A malformed name, or a node of the wrong kind for the requested
    /// operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A child or attribute index outside the valid range.
    #[error("index {index} out of bounds (length {len})")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The length of the sequence that was indexed.
        len: usize,
    },

    /// A malformed or unevaluable path expression.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Convenience result alias for DOM operations.
pub type Result<T> = std::result::Result<T, XmlError>;
