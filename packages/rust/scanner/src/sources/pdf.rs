//! Vector-PDF source backed by `pdf_oxide`.

use std::path::Path;
use std::sync::Mutex;

use pdf_oxide::PdfDocument;
use tagtrace_shared::{BBox, PageText, Result, TagTraceError, TextRun};

use super::TextSource;

/// Text runs read from a PDF's text spans.
///
/// The parser needs exclusive access, so pages are extracted one at a time
/// per document; the handle is closed when the source is dropped.
pub struct PdfTextSource {
    doc: Mutex<PdfDocument>,
    page_count: u32,
}

impl PdfTextSource {
    pub fn open(path: &Path) -> Result<Self> {
        let mut doc =
            PdfDocument::open(path).map_err(|e| TagTraceError::document_open(path, e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| TagTraceError::document_open(path, e.to_string()))?;
        let page_count = u32::try_from(page_count)
            .map_err(|_| TagTraceError::document_open(path, "too many pages"))?;

        Ok(Self {
            doc: Mutex::new(doc),
            page_count,
        })
    }
}

impl TextSource for PdfTextSource {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn text_runs(&self, page: u32) -> Result<PageText> {
        if page == 0 || page > self.page_count {
            return Err(TagTraceError::page_read(page, "page out of range"));
        }
        let mut doc = self
            .doc
            .lock()
            .map_err(|_| TagTraceError::page_read(page, "document handle poisoned"))?;
        let spans = doc
            .extract_spans((page - 1) as usize)
            .map_err(|e| TagTraceError::page_read(page, e.to_string()))?;

        let runs = spans
            .into_iter()
            .map(|span| {
                let r = span.bbox;
                let bbox = BBox::new(
                    f64::from(r.x),
                    f64::from(r.y),
                    f64::from(r.x + r.width),
                    f64::from(r.y + r.height),
                );
                TextRun::new(span.text, bbox)
            })
            .collect();

        Ok(PageText {
            page,
            width: 0.0,
            height: 0.0,
            runs,
        })
    }

    fn name(&self) -> &str {
        "pdf"
    }
}
