//! Tag-density classifier.

use tagtrace_shared::{PageKind, PageText};

use super::PageClassifier;
use crate::grammar::is_tag;

/// Falls back on how much of the page is device tags: enough tags make a
/// schematic, and a tag-free first page is taken for the cover sheet.
pub struct TagDensityClassifier {
    min_density: f64,
    min_runs: usize,
}

impl TagDensityClassifier {
    pub fn new(min_density: f64, min_runs: usize) -> Self {
        Self {
            min_density,
            min_runs: min_runs.max(1),
        }
    }
}

impl PageClassifier for TagDensityClassifier {
    fn classify(&self, page: &PageText) -> Option<PageKind> {
        let total = page.runs.len();
        if total == 0 {
            return None;
        }
        let tags = page.runs.iter().filter(|r| is_tag(&r.text)).count();

        if tags == 0 {
            return (page.page == 1).then_some(PageKind::Cover);
        }

        let density = tags as f64 / total as f64;
        (tags >= self.min_runs && density >= self.min_density).then_some(PageKind::Schematic)
    }

    fn name(&self) -> &str {
        "tag-density"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::page;
    use super::*;

    #[test]
    fn tag_free_first_page_is_cover() {
        let c = TagDensityClassifier::new(0.05, 3);
        let p = page(1, &[("ACME Packaging Line 3", 400.0, 500.0)]);
        assert_eq!(c.classify(&p), Some(PageKind::Cover));
        let p = page(2, &[("Notes", 400.0, 500.0)]);
        assert_eq!(c.classify(&p), None);
    }

    #[test]
    fn sparse_tags_are_not_enough() {
        let c = TagDensityClassifier::new(0.5, 2);
        let p = page(
            6,
            &[("-K1", 0.0, 0.0), ("-K2", 0.0, 0.0), ("a", 0.0, 0.0), ("b", 0.0, 0.0), ("c", 0.0, 0.0)],
        );
        assert_eq!(c.classify(&p), None);
    }
}
