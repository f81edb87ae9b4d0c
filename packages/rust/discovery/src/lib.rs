//! Page classification and device-tag discovery.
//!
//! Before any matching happens, every page of a schematic document is
//! classified (schematic, cover, TOC, cable diagram, parts list) and its text
//! runs are checked against the device-tag grammar. Each run that is a tag
//! becomes one [`TagOccurrence`] carrying the run's bounding box unchanged.

pub mod classifier;
pub mod grammar;

use tagtrace_shared::{PageKind, PageText, TagOccurrence};
use tracing::{debug, instrument};

pub use classifier::{
    ClassifierChain, KeywordSet, PageClassifier, TableLayoutClassifier, TagDensityClassifier,
    TitleBlockClassifier, title_block_text,
};
pub use grammar::{
    ParsedTag, TagForm, is_boundary_prefix, is_tag, parse_requested_tag, parse_tag,
};

// ---------------------------------------------------------------------------
// TagDiscoverer
// ---------------------------------------------------------------------------

/// Turns the text runs of a page into tag occurrences.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagDiscoverer {
    /// Scan every page kind, not only schematics.
    pub scan_all_pages: bool,
}

impl TagDiscoverer {
    pub fn new(scan_all_pages: bool) -> Self {
        Self { scan_all_pages }
    }

    /// Discover tags on one page.
    ///
    /// Pages that are not searchable under the current mode yield nothing.
    /// Bare tags, terminal references and contact-suffixed tags each become
    /// their own occurrence; runs are never merged.
    #[instrument(skip_all, fields(page = page.page, kind = %kind))]
    pub fn discover(&self, page: &PageText, kind: PageKind) -> Vec<TagOccurrence> {
        if !kind.is_searchable(self.scan_all_pages) {
            return Vec::new();
        }

        let occurrences: Vec<TagOccurrence> = page
            .runs
            .iter()
            .filter(|run| run.bbox.is_finite())
            .filter_map(|run| {
                parse_tag(&run.text).map(|tag| TagOccurrence::new(tag.text, page.page, run.bbox))
            })
            .collect();

        debug!(count = occurrences.len(), "tags discovered");
        occurrences
    }
}
