//! Document session: scan once, then answer queries.
//!
//! Opening a session runs the page scan (classification + discovery). The
//! resulting occurrence set never changes; every query rebuilds positions,
//! groups and contact maps from it, so re-querying never sees stale state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use tagtrace_scanner::{ScanOutput, ScanProgress, Scanner};
use tagtrace_shared::{
    ComponentPosition, MultiPageGroup, PageKind, Result, ScanConfig, TagOccurrence,
};

use crate::aggregate::aggregate;
use crate::contacts::contact_positions;
use crate::dedup::PositionDeduplicator;
use crate::matcher::{MatchResult, TagMatcher};
use crate::report::GroundTruthReport;
use crate::validate::{ValidationSummary, validate_against};

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Short description of an opened document.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub document_id: String,
    pub page_count: u32,
    pub pages_by_kind: BTreeMap<PageKind, Vec<u32>>,
    pub occurrences: usize,
    pub failed_pages: Vec<u32>,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Progress callback for reporting session status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a page has been classified and searched.
    fn page_scanned(&self, page: u32, total: u32, kind: PageKind);
    /// Called once the document is ready for queries.
    fn done(&self, summary: &SessionSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_scanned(&self, _page: u32, _total: u32, _kind: PageKind) {}
    fn done(&self, _summary: &SessionSummary) {}
}

/// Adapts a `ProgressReporter` to the scanner's `ScanProgress` interface.
struct SessionScanProgress {
    inner: Arc<dyn ProgressReporter>,
}

impl ScanProgress for SessionScanProgress {
    fn page_done(&self, page: u32, total: u32, kind: PageKind) {
        self.inner.page_scanned(page, total, kind);
    }
}

// ---------------------------------------------------------------------------
// DocumentSession
// ---------------------------------------------------------------------------

/// A scanned document and the queries over it.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    path: PathBuf,
    config: ScanConfig,
    scan: ScanOutput,
}

impl DocumentSession {
    /// Scan `path` with a fresh scanner.
    ///
    /// Each call gets its own scanner, so concurrent opens of one path are
    /// not serialized. Share a [`Scanner`] through [`Self::open_with`] for
    /// per-path exclusion and cancellation of the previous document.
    pub async fn open(
        path: &Path,
        config: &ScanConfig,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<Self> {
        let scanner = Scanner::new(config.clone());
        Self::open_with(&scanner, path, progress).await
    }

    /// Scan `path` with a long-lived scanner; any scan it is still running
    /// for another document is cancelled.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn open_with(
        scanner: &Scanner,
        path: &Path,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<Self> {
        progress.phase("Scanning pages");
        let adapter = Arc::new(SessionScanProgress {
            inner: progress.clone(),
        });
        let scan = scanner.scan_path(path, adapter).await?;

        let session = Self::from_scan(path, scanner.config().clone(), scan);
        let summary = session.summary();
        info!(
            document_id = %summary.document_id,
            pages = summary.page_count,
            occurrences = summary.occurrences,
            failed = summary.failed_pages.len(),
            elapsed_ms = summary.elapsed.as_millis(),
            "document ready"
        );
        progress.done(&summary);
        Ok(session)
    }

    /// Wrap an existing scan result.
    pub fn from_scan(path: impl Into<PathBuf>, config: ScanConfig, scan: ScanOutput) -> Self {
        Self {
            path: path.into(),
            config,
            scan,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scan(&self) -> &ScanOutput {
        &self.scan
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn summary(&self) -> SessionSummary {
        let mut pages_by_kind: BTreeMap<PageKind, Vec<u32>> = BTreeMap::new();
        for page in &self.scan.pages {
            pages_by_kind.entry(page.kind).or_default().push(page.page);
        }
        SessionSummary {
            document_id: self.scan.document_id.clone(),
            page_count: self.scan.page_count,
            pages_by_kind,
            occurrences: self.scan.occurrence_count(),
            failed_pages: self.scan.warnings.iter().map(|w| w.page).collect(),
            elapsed: self.scan.elapsed,
        }
    }

    /// Pages whose tags take part in matching: every scanned page with
    /// `search_all_pages`, otherwise the schematic pages only.
    pub fn searchable_pages(&self, search_all_pages: bool) -> Vec<u32> {
        if search_all_pages {
            return self.scan.pages.iter().map(|p| p.page).collect();
        }
        let schematic = self.scan.pages_of_kind(PageKind::Schematic);
        if schematic.is_empty() && !self.scan.pages.is_empty() {
            warn!(
                unknown = self.scan.pages_of_kind(PageKind::Unknown).len(),
                "no schematic pages recognized; use search_all_pages to include other pages"
            );
        }
        schematic
    }

    fn occurrences_on(&self, pages: &[u32]) -> Vec<TagOccurrence> {
        self.scan
            .pages
            .iter()
            .filter(|p| pages.contains(&p.page))
            .flat_map(|p| p.occurrences.iter().cloned())
            .collect()
    }

    fn deduplicator(&self) -> PositionDeduplicator {
        PositionDeduplicator::new(self.config.matching.dedup_threshold_pt)
    }

    /// Every raw tag occurrence on the searchable pages, no tag list needed.
    pub fn discover_all_tags(&self) -> Vec<TagOccurrence> {
        self.occurrences_on(&self.searchable_pages(self.config.matching.search_all_pages))
    }

    /// Deduplicated positions on the searchable pages.
    pub fn positions(&self, search_all_pages: bool) -> Vec<ComponentPosition> {
        let occurrences = self.occurrences_on(&self.searchable_pages(search_all_pages));
        self.deduplicator().deduplicate(&occurrences)
    }

    /// Page spread of every tag.
    pub fn multi_page_groups(&self, search_all_pages: bool) -> BTreeMap<String, MultiPageGroup> {
        aggregate(&self.positions(search_all_pages))
    }

    /// Resolve a tag list against the document.
    #[instrument(skip_all, fields(requested = tags.len(), search_all_pages = search_all_pages))]
    pub fn find_positions<S: AsRef<str>>(&self, tags: &[S], search_all_pages: bool) -> MatchResult {
        let positions = self.positions(search_all_pages);
        let result = TagMatcher::new(&positions).match_tags(tags);
        info!(
            found = result.positions.len(),
            missing = result.missing.len(),
            ambiguous = result.ambiguous.len(),
            "match completed"
        );
        result
    }

    /// Positions of a relay's auxiliary contacts, keyed by suffix.
    pub fn find_contact_positions(&self, base_tag: &str) -> BTreeMap<String, Vec<ComponentPosition>> {
        let positions = self.positions(self.config.matching.search_all_pages);
        contact_positions(base_tag, &positions, &self.config.contacts)
    }

    /// Tags printed on parts-list pages, in order of first appearance.
    pub fn parts_list(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        let pages = self.scan.pages_of_kind(PageKind::PartsList);
        for occ in self.occurrences_on(&pages) {
            if !tags.contains(&occ.tag) {
                tags.push(occ.tag);
            }
        }
        tags
    }

    /// Ground-truth report over the schematic pages.
    pub fn ground_truth_report(&self) -> GroundTruthReport {
        let pages = self.searchable_pages(false);
        let positions = self.deduplicator().deduplicate(&self.occurrences_on(&pages));
        GroundTruthReport::build(pages, &positions, self.parts_list())
    }

    /// Match the report's tags against this document and compare.
    pub fn validate(&self, report: &GroundTruthReport) -> ValidationSummary {
        let matched = self.find_positions(report.tags().as_slice(), false);
        validate_against(report, &matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tagtrace_scanner::PageScan;
    use tagtrace_shared::{BBox, MatchType, ScanId};

    const FIXTURE: &str = "../../../fixtures/json/plant_schematic.json";

    async fn open_fixture() -> DocumentSession {
        DocumentSession::open(Path::new(FIXTURE), &ScanConfig::default(), Arc::new(SilentProgress))
            .await
            .expect("open fixture")
    }

    #[derive(Default)]
    struct Recorder {
        phases: Mutex<Vec<String>>,
        pages: Mutex<Vec<u32>>,
        done: Mutex<Option<SessionSummary>>,
    }

    impl ProgressReporter for Recorder {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn page_scanned(&self, page: u32, _total: u32, _kind: PageKind) {
            self.pages.lock().unwrap().push(page);
        }
        fn done(&self, summary: &SessionSummary) {
            *self.done.lock().unwrap() = Some(summary.clone());
        }
    }

    #[tokio::test]
    async fn reports_progress_and_summary() {
        let recorder = Arc::new(Recorder::default());
        let session = DocumentSession::open(Path::new(FIXTURE), &ScanConfig::default(), recorder.clone())
            .await
            .unwrap();

        assert_eq!(recorder.phases.lock().unwrap().as_slice(), ["Scanning pages"]);
        assert_eq!(recorder.pages.lock().unwrap().len(), 7);

        let summary = recorder.done.lock().unwrap().clone().unwrap();
        assert_eq!(summary.page_count, 8);
        assert_eq!(summary.failed_pages, vec![8]);
        assert_eq!(summary.pages_by_kind[&PageKind::Schematic], vec![3, 4, 5]);
        assert_eq!(session.summary().occurrences, summary.occurrences);
    }

    #[tokio::test]
    async fn discovers_schematic_tags_only_by_default() {
        let session = open_fixture().await;
        let tags = session.discover_all_tags();
        assert_eq!(tags.len(), 15);
        assert!(tags.iter().all(|t| (3..=5).contains(&t.page)));
    }

    #[tokio::test]
    async fn finds_positions_with_confidence() {
        let session = open_fixture().await;
        let result = session.find_positions(&["-K1", "-NOPE", "-A1", "DG-M1"], false);

        assert_eq!(result.missing, vec!["-NOPE"]);
        let k1: Vec<u32> = result.positions_for("-K1").map(|p| p.page).collect();
        assert_eq!(k1, vec![3, 4, 5, 5]);
        assert_eq!(result.ambiguous["-K1"].len(), 4);

        let a1: Vec<&ComponentPosition> = result.positions_for("-A1").collect();
        assert_eq!(a1.len(), 1);
        assert_eq!(a1[0].match_type, MatchType::Partial);
        assert_eq!(a1[0].matched_tag, "-A1-X5:3");

        let dg: Vec<&ComponentPosition> = result.positions_for("DG-M1").collect();
        assert_eq!(dg[0].match_type, MatchType::Variant);
        assert_eq!(dg[0].confidence, 0.8);
    }

    #[tokio::test]
    async fn near_duplicate_detections_collapse() {
        let session = open_fixture().await;
        let result = session.find_positions(&["-K1"], false);
        let on_page_3: Vec<&ComponentPosition> =
            result.positions.iter().filter(|p| p.page == 3).collect();
        assert_eq!(on_page_3.len(), 1);
        assert_eq!(on_page_3[0].merged, 2);
    }

    #[tokio::test]
    async fn search_all_pages_widens_the_net() {
        let session = open_fixture().await;
        let result = session.find_positions(&["-K1"], true);
        let pages: Vec<u32> = result.positions.iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![2, 3, 4, 5, 5, 7]);
    }

    #[tokio::test]
    async fn repeated_queries_are_identical() {
        let session = open_fixture().await;
        let tags = ["-K1", "-Q1", "-M1", "-K1.2", "-A1"];
        assert_eq!(session.find_positions(&tags, false), session.find_positions(&tags, false));
    }

    #[tokio::test]
    async fn contact_lookup_on_fixture() {
        let session = open_fixture().await;
        let contacts = session.find_contact_positions("-K1");
        assert_eq!(contacts[".1"][0].page, 4);
        assert_eq!(contacts[".2"][0].page, 4);
        assert_eq!(contacts[".3"][0].page, 5);
        assert!(contacts[".4"].is_empty());
    }

    #[tokio::test]
    async fn ground_truth_report_of_fixture() {
        let session = open_fixture().await;
        let report = session.ground_truth_report();

        assert_eq!(report.schematic_pages, vec![3, 4, 5]);
        assert_eq!(report.total_tag_occurrences, 14);
        assert_eq!(report.parts_list_count, 8);
        assert_eq!(report.parts_list[7], "-S9");

        let k1 = &report.tags_with_counts["-K1"];
        assert_eq!(k1.count, 4);
        assert_eq!(k1.pages, vec![3, 4, 5]);
        assert_eq!(report.multi_page_tags.keys().collect::<Vec<_>>(), vec!["-K1"]);
        assert_eq!(report.tags_by_page[&4], vec!["-B1", "-K1", "-K1.1", "-K1.2", "-K2"]);

        let summary = session.validate(&report);
        assert!(summary.is_clean(), "{summary:?}");
        assert_eq!(summary.recall, 1.0);
    }

    #[tokio::test]
    async fn missing_document_is_fatal() {
        let err = DocumentSession::open(
            Path::new("../../../fixtures/json/does_not_exist.json"),
            &ScanConfig::default(),
            Arc::new(SilentProgress),
        )
        .await
        .unwrap_err();
        assert!(err.is_fatal());
    }

    fn unclassified_scan() -> ScanOutput {
        let occ = |tag: &str, x: f64| TagOccurrence::new(tag, 1, BBox::new(x, 100.0, x + 18.0, 108.0));
        ScanOutput {
            scan_id: ScanId::new(),
            document_id: String::new(),
            source: "memory".into(),
            page_count: 2,
            pages: vec![
                PageScan {
                    page: 1,
                    kind: PageKind::Unknown,
                    occurrences: vec![occ("-K1", 10.0), occ("-K2", 300.0)],
                    run_count: 2,
                    width: 1190.0,
                    height: 842.0,
                },
                PageScan {
                    page: 2,
                    kind: PageKind::Cover,
                    occurrences: Vec::new(),
                    run_count: 1,
                    width: 1190.0,
                    height: 842.0,
                },
            ],
            warnings: Vec::new(),
            started_at: chrono::Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn unclassified_pages_need_search_all() {
        let session = DocumentSession::from_scan("mem", ScanConfig::default(), unclassified_scan());
        assert!(session.searchable_pages(false).is_empty());

        let result = session.find_positions(&["-K2"], false);
        assert!(result.positions.is_empty());
        assert_eq!(result.missing, vec!["-K2"]);

        let report = session.ground_truth_report();
        assert!(report.schematic_pages.is_empty());
        assert_eq!(report.total_tag_occurrences, 0);

        let result = session.find_positions(&["-K2"], true);
        assert_eq!(result.positions.len(), 1);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn empty_request_on_session() {
        let session = DocumentSession::from_scan("mem", ScanConfig::default(), unclassified_scan());
        let result = session.find_positions::<&str>(&[], false);
        assert!(result.positions.is_empty());
        assert!(result.missing.is_empty());
        assert!(result.ambiguous.is_empty());
    }
}
