//! Error types for TagTrace.
//!
//! Library crates use [`TagTraceError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only whole-document failures travel as `Err`. Per-item conditions (a page
//! that could not be read, a tag that was not found, a wire whose endpoint is
//! not placed) are reported inside result values instead.

use std::path::PathBuf;

/// Top-level error type for all TagTrace operations.
#[derive(Debug, thiserror::Error)]
pub enum TagTraceError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed input data (text-run dump, component list, report).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Text for a single page could not be extracted.
    #[error("page {page}: text extraction failed: {message}")]
    PageRead { page: u32, message: String },

    /// The document could not be opened at all.
    #[error("cannot open document {path:?}: {message}")]
    DocumentOpen { path: PathBuf, message: String },

    /// The scan was cancelled because another document was loaded.
    #[error("scan cancelled")]
    Cancelled,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TagTraceError>;

impl TagTraceError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a page read error for a single page.
    pub fn page_read(page: u32, msg: impl Into<String>) -> Self {
        Self::PageRead {
            page,
            message: msg.into(),
        }
    }

    /// Create a fatal document-open error.
    pub fn document_open(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::DocumentOpen {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts a whole document rather than a single page.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::PageRead { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TagTraceError::config("threshold must be positive");
        assert_eq!(err.to_string(), "config error: threshold must be positive");

        let err = TagTraceError::page_read(7, "broken content stream");
        assert_eq!(
            err.to_string(),
            "page 7: text extraction failed: broken content stream"
        );
    }

    #[test]
    fn only_page_errors_are_recoverable() {
        assert!(!TagTraceError::page_read(1, "x").is_fatal());
        assert!(TagTraceError::document_open("a.pdf", "no such file").is_fatal());
        assert!(TagTraceError::Cancelled.is_fatal());
    }
}
