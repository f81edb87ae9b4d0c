//! Pre-extracted text-run dumps.
//!
//! ```json
//! { "pages": [
//!     { "page": 1, "width": 1190, "height": 842,
//!       "runs": [ { "text": "-K1", "bbox": [100, 500, 118, 508] } ] },
//!     { "page": 2, "error": "damaged content stream" }
//! ] }
//! ```
//!
//! A page entry with `error` (or a page number missing from the dump) reads
//! as a failed page.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tagtrace_shared::{PageText, Result, TagTraceError, TextRun};

use super::TextSource;

#[derive(Debug, Deserialize)]
struct TextDump {
    pages: Vec<DumpPage>,
}

#[derive(Debug, Deserialize)]
struct DumpPage {
    page: u32,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
    #[serde(default)]
    runs: Vec<TextRun>,
    #[serde(default)]
    error: Option<String>,
}

/// Text runs loaded from a JSON dump. The file is read once and closed
/// before `open` returns.
#[derive(Debug)]
pub struct JsonTextSource {
    pages: BTreeMap<u32, DumpPage>,
    page_count: u32,
}

impl JsonTextSource {
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TagTraceError::document_open(path, e.to_string()))?;
        Self::from_json(&content).map_err(|e| TagTraceError::document_open(path, e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let dump: TextDump = serde_json::from_str(content)
            .map_err(|e| TagTraceError::parse(format!("invalid text-run dump: {e}")))?;

        let mut pages = BTreeMap::new();
        for page in dump.pages {
            if page.page == 0 {
                return Err(TagTraceError::parse("page numbers start at 1"));
            }
            if pages.contains_key(&page.page) {
                return Err(TagTraceError::parse(format!(
                    "page {} appears twice",
                    page.page
                )));
            }
            pages.insert(page.page, page);
        }
        let page_count = pages.keys().next_back().copied().unwrap_or(0);

        Ok(Self { pages, page_count })
    }
}

impl TextSource for JsonTextSource {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn text_runs(&self, page: u32) -> Result<PageText> {
        let entry = self
            .pages
            .get(&page)
            .ok_or_else(|| TagTraceError::page_read(page, "page missing from dump"))?;

        if let Some(message) = &entry.error {
            return Err(TagTraceError::page_read(page, message.clone()));
        }

        Ok(PageText {
            page,
            width: entry.width,
            height: entry.height,
            runs: entry.runs.clone(),
        })
    }

    fn name(&self) -> &str {
        "json"
    }
}
