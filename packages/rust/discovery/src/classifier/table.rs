//! Cable-table layout classifier.

use regex::Regex;
use std::sync::LazyLock;
use tagtrace_shared::{PageKind, PageText};

use super::PageClassifier;

/// Cable designations (`W12`, `-W3`).
static CABLE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?W[0-9]+$").expect("cable number regex"));

/// Left edges closer than this (points) belong to the same table column.
const COLUMN_TOLERANCE_PT: f64 = 3.0;

/// Recognizes cable diagrams by their tabular layout: a column of cable
/// numbers stacked on distinct rows.
pub struct TableLayoutClassifier {
    min_rows: usize,
}

impl TableLayoutClassifier {
    pub fn new(min_rows: usize) -> Self {
        Self {
            min_rows: min_rows.max(2),
        }
    }
}

impl PageClassifier for TableLayoutClassifier {
    fn classify(&self, page: &PageText) -> Option<PageKind> {
        (longest_cable_column(page) >= self.min_rows).then_some(PageKind::CableDiagram)
    }

    fn name(&self) -> &str {
        "table-layout"
    }
}

/// Number of distinct rows in the tallest column of cable numbers.
pub(crate) fn longest_cable_column(page: &PageText) -> usize {
    let mut cells: Vec<(f64, f64)> = page
        .runs
        .iter()
        .filter(|r| r.bbox.is_finite() && CABLE_NUMBER_RE.is_match(r.text.trim()))
        .map(|r| (r.bbox.x0, r.bbox.y0))
        .collect();
    if cells.is_empty() {
        return 0;
    }
    cells.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut best = 0;
    let mut start = 0;
    for i in 1..=cells.len() {
        let column_ends = i == cells.len() || cells[i].0 - cells[start].0 > COLUMN_TOLERANCE_PT;
        if column_ends {
            best = best.max(distinct_rows(&cells[start..i]));
            start = i;
        }
    }
    best
}

fn distinct_rows(column: &[(f64, f64)]) -> usize {
    let mut ys: Vec<f64> = column.iter().map(|c| c.1).collect();
    ys.sort_by(f64::total_cmp);
    ys.dedup_by(|a, b| (*a - *b).abs() < 1.0);
    ys.len()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::page;
    use super::*;

    #[test]
    fn stacked_cable_numbers_are_a_table() {
        let p = page(
            20,
            &[
                ("W1", 50.0, 700.0),
                ("W2", 51.0, 680.0),
                ("W3", 50.5, 660.0),
                ("-W4", 50.0, 640.0),
                ("5x1.5", 120.0, 700.0),
            ],
        );
        assert_eq!(longest_cable_column(&p), 4);
        assert_eq!(
            TableLayoutClassifier::new(4).classify(&p),
            Some(PageKind::CableDiagram)
        );
    }

    #[test]
    fn scattered_cables_on_a_schematic_are_not() {
        let p = page(
            3,
            &[
                ("-W1", 50.0, 700.0),
                ("-W2", 400.0, 300.0),
                ("-W3", 800.0, 500.0),
                ("-W4", 1000.0, 100.0),
            ],
        );
        assert_eq!(longest_cable_column(&p), 1);
        assert_eq!(TableLayoutClassifier::new(4).classify(&p), None);
    }

    #[test]
    fn same_row_duplicates_count_once() {
        let p = page(
            7,
            &[("W1", 50.0, 700.0), ("W1", 50.0, 700.2), ("W2", 50.0, 680.0)],
        );
        assert_eq!(longest_cable_column(&p), 2);
    }
}
