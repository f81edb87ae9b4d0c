//! Page classification strategies.
//!
//! Classifiers look at a page's extracted text and decide whether it is a
//! schematic, a cover sheet, a table of contents, a cable diagram, or a parts
//! list. They are tried in priority order; the first one that recognizes the
//! page wins and a page nobody recognizes is `UNKNOWN`.

mod density;
mod keywords;
mod table;
mod title_block;

use tagtrace_shared::{ClassifierConfig, PageKind, PageText};
use tracing::{debug, warn};

pub use density::TagDensityClassifier;
pub use keywords::KeywordSet;
pub use table::TableLayoutClassifier;
pub use title_block::{TitleBlockClassifier, title_block_text};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A pluggable page-classification heuristic.
///
/// Implementations must be total: malformed or empty pages yield `None`,
/// never a panic.
pub trait PageClassifier: Send + Sync {
    /// Classify the page, or `None` if this heuristic has no opinion.
    fn classify(&self, page: &PageText) -> Option<PageKind>;

    /// Human-readable classifier name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Holds classifiers in priority order.
pub struct ClassifierChain {
    classifiers: Vec<Box<dyn PageClassifier>>,
}

impl ClassifierChain {
    /// Built-in chain: title-block keywords first, then cable-table layout,
    /// then tag density.
    pub fn new(config: &ClassifierConfig) -> Self {
        let keyword_sets: Vec<KeywordSet> = config
            .locales
            .iter()
            .filter_map(|locale| {
                let set = KeywordSet::for_locale(locale);
                if set.is_none() {
                    warn!(%locale, "no keyword set for locale, ignoring");
                }
                set
            })
            .collect();

        Self {
            classifiers: vec![
                Box::new(TitleBlockClassifier::new(
                    keyword_sets,
                    config.title_block_height_ratio,
                    config.title_block_width_ratio,
                )),
                Box::new(TableLayoutClassifier::new(config.min_cable_rows)),
                Box::new(TagDensityClassifier::new(
                    config.min_tag_density,
                    config.min_tag_runs,
                )),
            ],
        }
    }

    /// A chain made of caller-supplied strategies (e.g. another locale's
    /// keyword rules).
    pub fn with_classifiers(classifiers: Vec<Box<dyn PageClassifier>>) -> Self {
        Self { classifiers }
    }

    /// Classify a page. Always returns a kind; `UNKNOWN` when no strategy
    /// recognizes the page.
    pub fn classify(&self, page: &PageText) -> PageKind {
        if page.runs.is_empty() {
            return PageKind::Unknown;
        }
        for classifier in &self.classifiers {
            if let Some(kind) = classifier.classify(page) {
                debug!(page = page.page, %kind, classifier = classifier.name(), "page classified");
                return kind;
            }
        }
        debug!(page = page.page, "no classifier matched");
        PageKind::Unknown
    }
}

impl Default for ClassifierChain {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

/// Lowercase `text`, turn punctuation into spaces, and pad with a space on
/// each side so whole-word keywords can be found with `contains`.
pub(crate) fn normalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}
