//! Title-block keyword classifier.

use tagtrace_shared::{BBox, PageKind, PageText};

use super::keywords::KeywordSet;
use super::{PageClassifier, normalize_words};

/// Kinds in the order their keywords are checked. More specific sheet types
/// come first so "cable diagram" is not taken for a schematic.
const KIND_PRIORITY: [PageKind; 5] = [
    PageKind::PartsList,
    PageKind::CableDiagram,
    PageKind::Toc,
    PageKind::Cover,
    PageKind::Schematic,
];

/// Classifies a page from keywords printed in its title block, the band at
/// the bottom centre of the sheet.
pub struct TitleBlockClassifier {
    keyword_sets: Vec<KeywordSet>,
    height_ratio: f64,
    width_ratio: f64,
}

impl TitleBlockClassifier {
    pub fn new(keyword_sets: Vec<KeywordSet>, height_ratio: f64, width_ratio: f64) -> Self {
        Self {
            keyword_sets,
            height_ratio,
            width_ratio,
        }
    }
}

impl PageClassifier for TitleBlockClassifier {
    fn classify(&self, page: &PageText) -> Option<PageKind> {
        let text = title_block_text(page, self.height_ratio, self.width_ratio);
        if text.trim().is_empty() {
            return None;
        }
        let words = normalize_words(&text);

        KIND_PRIORITY.into_iter().find(|kind| {
            self.keyword_sets.iter().any(|set| {
                set.keywords(*kind)
                    .iter()
                    .any(|kw| words.contains(&normalize_words(kw)))
            })
        })
    }

    fn name(&self) -> &str {
        "title-block"
    }
}

/// Text of all runs whose centre lies in the title-block band, joined by
/// spaces in extraction order.
pub fn title_block_text(page: &PageText, height_ratio: f64, width_ratio: f64) -> String {
    let (width, height) = page.extent();
    if width <= 0.0 || height <= 0.0 {
        return String::new();
    }
    let margin = width * (1.0 - width_ratio) / 2.0;
    let band = BBox::new(margin, 0.0, width - margin, height * height_ratio);

    page.runs
        .iter()
        .filter(|r| r.bbox.is_finite() && band.contains(&r.bbox.center()))
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::super::test_support::page;
    use super::*;

    fn classifier() -> TitleBlockClassifier {
        TitleBlockClassifier::new(
            vec![
                KeywordSet::for_locale("en").unwrap(),
                KeywordSet::for_locale("de").unwrap(),
            ],
            0.15,
            0.6,
        )
    }

    #[test]
    fn reads_only_the_title_block() {
        let p = page(
            4,
            &[("Schaltplan", 590.0, 50.0), ("Parts list", 590.0, 700.0)],
        );
        assert_eq!(title_block_text(&p, 0.15, 0.6), "Schaltplan");
        assert_eq!(classifier().classify(&p), Some(PageKind::Schematic));
    }

    #[test]
    fn corner_text_is_outside_the_band() {
        let p = page(4, &[("Stückliste", 5.0, 5.0)]);
        assert_eq!(classifier().classify(&p), None);
    }

    #[test]
    fn specific_kinds_beat_schematic() {
        let p = page(
            12,
            &[("Schematic", 500.0, 40.0), ("Cable diagram", 600.0, 40.0)],
        );
        assert_eq!(classifier().classify(&p), Some(PageKind::CableDiagram));
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let p = page(2, &[("Bombardier", 590.0, 40.0)]);
        assert_eq!(classifier().classify(&p), None);
    }

    #[test]
    fn german_sheet_types() {
        let p = page(1, &[("Deckblatt", 590.0, 40.0)]);
        assert_eq!(classifier().classify(&p), Some(PageKind::Cover));
        let p = page(2, &[("Inhaltsverzeichnis", 590.0, 40.0)]);
        assert_eq!(classifier().classify(&p), Some(PageKind::Toc));
    }
}
