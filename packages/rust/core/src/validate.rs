//! Compare a fresh match against a ground-truth report.

use serde::Serialize;
use tracing::{info, instrument};

use crate::matcher::MatchResult;
use crate::report::GroundTruthReport;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountMismatch {
    pub tag: String,
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMismatch {
    pub tag: String,
    pub expected: Vec<u32>,
    pub found: Vec<u32>,
}

/// How well a match reproduces a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationSummary {
    /// Distinct tags in the report.
    pub expected: usize,
    /// Report tags the match resolved at least once.
    pub found: usize,
    pub missing: Vec<String>,
    pub count_mismatches: Vec<CountMismatch>,
    pub page_mismatches: Vec<PageMismatch>,
    /// `found / expected`; 1.0 for an empty report.
    pub recall: f64,
}

impl ValidationSummary {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.count_mismatches.is_empty() && self.page_mismatches.is_empty()
    }
}

/// Check every report tag against `matched`: was it found, as often, on the
/// same pages.
#[instrument(skip_all, fields(expected = report.tags_with_counts.len()))]
pub fn validate_against(report: &GroundTruthReport, matched: &MatchResult) -> ValidationSummary {
    let mut summary = ValidationSummary {
        expected: report.tags_with_counts.len(),
        ..ValidationSummary::default()
    };

    for (tag, expected) in &report.tags_with_counts {
        let positions: Vec<_> = matched.positions_for(tag).collect();
        if positions.is_empty() {
            summary.missing.push(tag.clone());
            continue;
        }
        summary.found += 1;

        if positions.len() != expected.count {
            summary.count_mismatches.push(CountMismatch {
                tag: tag.clone(),
                expected: expected.count,
                found: positions.len(),
            });
        }

        let mut found_pages: Vec<u32> = positions.iter().map(|p| p.page).collect();
        found_pages.sort_unstable();
        found_pages.dedup();
        let mut expected_pages = expected.pages.clone();
        expected_pages.sort_unstable();
        if found_pages != expected_pages {
            summary.page_mismatches.push(PageMismatch {
                tag: tag.clone(),
                expected: expected_pages,
                found: found_pages,
            });
        }
    }

    summary.recall = if summary.expected == 0 {
        1.0
    } else {
        summary.found as f64 / summary.expected as f64
    };

    info!(
        found = summary.found,
        missing = summary.missing.len(),
        count_mismatches = summary.count_mismatches.len(),
        page_mismatches = summary.page_mismatches.len(),
        recall = summary.recall,
        "validation completed"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::PositionDeduplicator;
    use crate::matcher::TagMatcher;
    use tagtrace_shared::{BBox, ComponentPosition, TagOccurrence};

    fn positions(spec: &[(&str, u32, f64)]) -> Vec<ComponentPosition> {
        let occ: Vec<TagOccurrence> = spec
            .iter()
            .map(|(t, p, x)| TagOccurrence::new(*t, *p, BBox::new(*x, 100.0, x + 18.0, 108.0)))
            .collect();
        PositionDeduplicator::default().deduplicate(&occ)
    }

    fn report() -> GroundTruthReport {
        let pos = positions(&[("-K1", 3, 10.0), ("-K1", 5, 10.0), ("-Q1", 3, 200.0), ("-M1", 4, 10.0)]);
        GroundTruthReport::build(vec![3, 4, 5], &pos, Vec::new())
    }

    fn run(current: &[(&str, u32, f64)]) -> ValidationSummary {
        let report = report();
        let matched = TagMatcher::new(&positions(current)).match_tags(report.tags().as_slice());
        validate_against(&report, &matched)
    }

    #[test]
    fn identical_document_is_clean() {
        let summary = run(&[("-K1", 3, 10.0), ("-K1", 5, 10.0), ("-Q1", 3, 200.0), ("-M1", 4, 10.0)]);
        assert!(summary.is_clean());
        assert_eq!(summary.expected, 3);
        assert_eq!(summary.found, 3);
        assert_eq!(summary.recall, 1.0);
    }

    #[test]
    fn reports_missing_count_and_page_drift() {
        let summary = run(&[("-K1", 3, 10.0), ("-Q1", 3, 200.0), ("-Q1", 3, 600.0)]);

        assert_eq!(summary.missing, vec!["-M1"]);
        assert_eq!(summary.found, 2);
        assert!((summary.recall - 2.0 / 3.0).abs() < 1e-9);

        let tags: Vec<&str> = summary.count_mismatches.iter().map(|m| m.tag.as_str()).collect();
        assert_eq!(tags, vec!["-K1", "-Q1"]);
        assert_eq!(summary.page_mismatches.len(), 1);
        assert_eq!(summary.page_mismatches[0].expected, vec![3, 5]);
        assert_eq!(summary.page_mismatches[0].found, vec![3]);
    }

    #[test]
    fn empty_report_has_full_recall() {
        let report = GroundTruthReport::build(Vec::new(), &[], Vec::new());
        let summary = validate_against(&report, &MatchResult::default());
        assert_eq!(summary.recall, 1.0);
        assert!(summary.is_clean());
    }
}
