//! Error types for steward-lang

use thiserror::Error;

/// A syntax error in manifest text.
///
/// Carries the source name and the line/column of the offending token so
/// callers can point at the exact spot in the manifest.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{source_name}:{line}:{column}: {message}")]
pub struct ParseError {
    /// Name of the manifest (file name or a label for inline text)
    pub source_name: String,
    /// 1-based line of the offending token
    pub line: u32,
    /// 1-based column of the offending token
    pub column: u32,
    /// What went wrong, usually naming the offending token
    pub message: String,
}

impl ParseError {
    /// Create a parse error at the given position.
    pub fn new(
        source_name: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            line,
            column,
            message: message.into(),
        }
    }
}
