//! Text-extraction sources.
//!
//! A [`TextSource`] yields, per page, the text runs printed on it with their
//! bounding boxes in page-space points. Glyph extraction itself is somebody
//! else's job; sources only adapt an extractor's output to [`PageText`].

mod json;
#[cfg(feature = "pdf")]
mod pdf;

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tagtrace_shared::{PageText, Result, TagTraceError};

pub use json::JsonTextSource;
#[cfg(feature = "pdf")]
pub use pdf::PdfTextSource;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Per-page access to extracted text.
///
/// Pages are numbered from 1. `text_runs` failing for one page must not
/// affect any other page.
pub trait TextSource: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Text runs of one page.
    fn text_runs(&self, page: u32) -> Result<PageText>;

    /// Human-readable source name for tracing.
    fn name(&self) -> &str;
}

/// A source opened from a file, with the fingerprint of that file.
pub struct OpenedSource {
    pub source: Arc<dyn TextSource>,
    /// Hex SHA-256 of the file contents.
    pub document_id: String,
}

impl std::fmt::Debug for OpenedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedSource")
            .field("source", &self.source.name())
            .field("document_id", &self.document_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Opening
// ---------------------------------------------------------------------------

/// Open a document by file extension: `.json` text-run dumps always, `.pdf`
/// when built with the `pdf` feature.
///
/// Failing here is the one fatal error of a scan.
pub fn open_source(path: &Path) -> Result<OpenedSource> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let source: Arc<dyn TextSource> = match ext.as_str() {
        "json" => Arc::new(JsonTextSource::open(path)?),
        #[cfg(feature = "pdf")]
        "pdf" => Arc::new(PdfTextSource::open(path)?),
        #[cfg(not(feature = "pdf"))]
        "pdf" => {
            return Err(TagTraceError::document_open(
                path,
                "PDF input needs the `pdf` feature; pass a text-run dump (.json) instead",
            ));
        }
        other => {
            return Err(TagTraceError::document_open(
                path,
                format!("unsupported input type {other:?}"),
            ));
        }
    };

    Ok(OpenedSource {
        source,
        document_id: fingerprint_file(path)?,
    })
}

/// Hex SHA-256 of a file, streamed.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| TagTraceError::io(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| TagTraceError::io(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}
