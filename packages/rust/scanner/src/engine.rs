//! Concurrent, page-parallel document scanner.
//!
//! A scan reads every page of a document on a bounded pool of blocking
//! workers, classifies it and discovers its device tags. Pages are
//! independent: a page that fails to read becomes a warning and the rest of
//! the document is still scanned. Only failing to open the document, or being
//! superseded by a newer document, aborts a scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{OwnedMutexGuard, Semaphore};
use tracing::{debug, info, instrument, warn};

use tagtrace_discovery::{ClassifierChain, TagDiscoverer};
use tagtrace_shared::{
    PageKind, PageWarning, Result, ScanConfig, ScanId, TagOccurrence, TagTraceError,
};

use crate::sources::{TextSource, open_source};

// ---------------------------------------------------------------------------
// Progress + cancellation
// ---------------------------------------------------------------------------

/// Receives per-page progress from a running scan.
///
/// Called from worker tasks, in completion order rather than page order.
pub trait ScanProgress: Send + Sync {
    fn page_done(&self, page: u32, total: u32, kind: PageKind);
}

/// A [`ScanProgress`] that ignores everything.
pub struct NoProgress;

impl ScanProgress for NoProgress {
    fn page_done(&self, _page: u32, _total: u32, _kind: PageKind) {}
}

/// Shared flag telling the workers of one scan to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One async lock per document path, so the same file is never scanned by
/// two tasks at once while different files proceed in parallel.
///
/// Exclusion only holds between scans sharing one `PathLocks`, i.e. one
/// [`Scanner`]. Entries nobody holds or waits on are pruned on the next
/// `acquire`.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: std::sync::Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`. Released when the guard drops.
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Only the map's own reference left: not held, not awaited.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Paths currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

// ---------------------------------------------------------------------------
// ScanOutput
// ---------------------------------------------------------------------------

/// Classification and raw tag occurrences of one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageScan {
    /// 1-based page number.
    pub page: u32,
    pub kind: PageKind,
    /// Every tag-shaped run on the page, whatever its kind.
    pub occurrences: Vec<TagOccurrence>,
    /// Number of text runs the page had.
    pub run_count: usize,
    /// Page size in points (falls back to the extent of the runs).
    pub width: f64,
    pub height: f64,
}

/// Result of scanning one document.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutput {
    pub scan_id: ScanId,
    /// Hex SHA-256 of the document file (empty for in-memory sources).
    pub document_id: String,
    pub source: String,
    pub page_count: u32,
    /// Successfully read pages, in page order.
    pub pages: Vec<PageScan>,
    /// Pages that could not be read.
    pub warnings: Vec<PageWarning>,
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ScanOutput {
    pub fn page(&self, page: u32) -> Option<&PageScan> {
        self.pages.iter().find(|p| p.page == page)
    }

    /// Page numbers of the given kind, ascending.
    pub fn pages_of_kind(&self, kind: PageKind) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.page)
            .collect()
    }

    pub fn occurrence_count(&self) -> usize {
        self.pages.iter().map(|p| p.occurrences.len()).sum()
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Scans documents page by page on a bounded worker pool.
///
/// Loading a new document through [`Scanner::scan_path`] cancels whatever
/// scan this scanner was running before.
pub struct Scanner {
    config: ScanConfig,
    chain: Arc<ClassifierChain>,
    locks: PathLocks,
    current: std::sync::Mutex<Option<CancelToken>>,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        let chain = Arc::new(ClassifierChain::new(&config.classifier));
        Self::with_classifier(config, chain)
    }

    /// Use a caller-built classifier chain instead of the configured one.
    pub fn with_classifier(config: ScanConfig, chain: Arc<ClassifierChain>) -> Self {
        Self {
            config,
            chain,
            locks: PathLocks::new(),
            current: std::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Cancel the running scan, if any, and hand out the token for the next.
    pub fn begin_document(&self) -> CancelToken {
        let token = CancelToken::new();
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(token.clone()) {
            if !previous.is_cancelled() {
                debug!("cancelling previous scan");
            }
            previous.cancel();
        }
        token
    }

    /// Open and scan a document file.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn scan_path(
        &self,
        path: &Path,
        progress: Arc<dyn ScanProgress>,
    ) -> Result<ScanOutput> {
        let cancel = self.begin_document();
        let _guard = self.locks.acquire(path).await;

        let owned = path.to_path_buf();
        let opened = tokio::task::spawn_blocking(move || open_source(&owned))
            .await
            .map_err(|e| TagTraceError::document_open(path, format!("open task failed: {e}")))??;

        self.scan_source(opened.source, opened.document_id, cancel, progress)
            .await
    }

    /// Scan an already opened source.
    #[instrument(skip_all, fields(source = source.name(), pages = source.page_count()))]
    pub async fn scan_source(
        &self,
        source: Arc<dyn TextSource>,
        document_id: String,
        cancel: CancelToken,
        progress: Arc<dyn ScanProgress>,
    ) -> Result<ScanOutput> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let total = source.page_count();
        let workers = self.config.effective_workers();
        let semaphore = Arc::new(Semaphore::new(workers));

        info!(pages = total, workers, "starting scan");

        let mut handles = Vec::with_capacity(total as usize);
        for page in 1..=total {
            let sem = semaphore.clone();
            let source = source.clone();
            let chain = self.chain.clone();
            let cancel = cancel.clone();
            let progress = progress.clone();

            handles.push(tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|_| TagTraceError::Cancelled)?;
                if cancel.is_cancelled() {
                    return Err(TagTraceError::Cancelled);
                }

                let scanned =
                    tokio::task::spawn_blocking(move || scan_page(source.as_ref(), &chain, page))
                        .await
                        .map_err(|e| TagTraceError::page_read(page, format!("worker failed: {e}")))?;

                if let Ok(scan) = &scanned {
                    progress.page_done(page, total, scan.kind);
                }
                scanned
            }));
        }

        let mut pages = Vec::with_capacity(handles.len());
        let mut warnings = Vec::new();

        // Handles are in page order, so results come back sorted.
        for (page, handle) in (1..=total).zip(handles) {
            match handle.await {
                Ok(Ok(scan)) => pages.push(scan),
                Ok(Err(TagTraceError::Cancelled)) => {
                    semaphore.close();
                    info!(page, "scan cancelled");
                    return Err(TagTraceError::Cancelled);
                }
                Ok(Err(e)) => {
                    warn!(page, error = %e, "page skipped");
                    warnings.push(PageWarning {
                        page,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(page, error = %e, "page task failed");
                    warnings.push(PageWarning {
                        page,
                        message: format!("page task failed: {e}"),
                    });
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(TagTraceError::Cancelled);
        }

        let output = ScanOutput {
            scan_id: ScanId::new(),
            document_id,
            source: source.name().to_string(),
            page_count: total,
            pages,
            warnings,
            started_at,
            elapsed: start_time.elapsed(),
        };

        info!(
            pages_read = output.pages.len(),
            pages_failed = output.warnings.len(),
            occurrences = output.occurrence_count(),
            elapsed_ms = output.elapsed.as_millis(),
            "scan completed"
        );

        Ok(output)
    }
}

/// Read, classify and tag one page. Runs on a blocking worker.
fn scan_page(source: &dyn TextSource, chain: &ClassifierChain, page: u32) -> Result<PageScan> {
    let text = source.text_runs(page)?;
    let kind = chain.classify(&text);
    let occurrences = TagDiscoverer::new(true).discover(&text, kind);
    let (width, height) = text.extent();

    Ok(PageScan {
        page,
        kind,
        occurrences,
        run_count: text.runs.len(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;

    use tagtrace_shared::{BBox, PageText, TextRun};

    /// In-memory source; pages listed in `broken` fail to read.
    struct MemorySource {
        pages: Vec<PageText>,
        broken: Vec<u32>,
    }

    impl TextSource for MemorySource {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn text_runs(&self, page: u32) -> Result<PageText> {
            if self.broken.contains(&page) {
                return Err(TagTraceError::page_read(page, "corrupt content stream"));
            }
            self.pages
                .get(page as usize - 1)
                .cloned()
                .ok_or_else(|| TagTraceError::page_read(page, "no such page"))
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    fn schematic(page: u32, tags: &[&str]) -> PageText {
        let mut runs: Vec<TextRun> = tags
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let x = 100.0 + 120.0 * i as f64;
                TextRun::new(*t, BBox::new(x, 400.0, x + 20.0, 408.0))
            })
            .collect();
        runs.push(TextRun::new("Schematic", BBox::new(600.0, 20.0, 660.0, 28.0)));
        PageText {
            page,
            width: 1190.0,
            height: 842.0,
            runs,
        }
    }

    fn source(broken: Vec<u32>) -> Arc<dyn TextSource> {
        Arc::new(MemorySource {
            pages: (1..=6).map(|p| schematic(p, &["-K1", "-Q1", "-M1"])).collect(),
            broken,
        })
    }

    fn scanner(workers: usize) -> Scanner {
        Scanner::new(ScanConfig {
            workers,
            ..ScanConfig::default()
        })
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u32>>,
        total: AtomicU32,
    }

    impl ScanProgress for Recorder {
        fn page_done(&self, page: u32, total: u32, _kind: PageKind) {
            self.seen.lock().unwrap().push(page);
            self.total.store(total, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn scans_every_page_in_order() {
        let s = scanner(3);
        let recorder = Arc::new(Recorder::default());
        let out = s
            .scan_source(source(vec![]), "doc".into(), s.begin_document(), recorder.clone())
            .await
            .unwrap();

        assert_eq!(out.page_count, 6);
        let pages: Vec<u32> = out.pages.iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![1, 2, 3, 4, 5, 6]);
        assert!(out.pages.iter().all(|p| p.kind == PageKind::Schematic));
        assert_eq!(out.occurrence_count(), 18);
        assert!(out.warnings.is_empty());

        let mut seen = recorder.seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, pages);
        assert_eq!(recorder.total.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn failed_pages_become_warnings() {
        let s = scanner(2);
        let out = s
            .scan_source(source(vec![2, 5]), String::new(), s.begin_document(), Arc::new(NoProgress))
            .await
            .unwrap();

        assert_eq!(out.pages.len(), 4);
        assert!(out.page(2).is_none());
        let failed: Vec<u32> = out.warnings.iter().map(|w| w.page).collect();
        assert_eq!(failed, vec![2, 5]);
        assert!(out.warnings[0].message.contains("corrupt content stream"));
    }

    #[tokio::test]
    async fn cancelled_scan_returns_cancelled() {
        let s = scanner(1);
        let token = s.begin_document();
        token.cancel();
        let err = s
            .scan_source(source(vec![]), String::new(), token, Arc::new(NoProgress))
            .await
            .unwrap_err();
        assert!(matches!(err, TagTraceError::Cancelled));
    }

    #[test]
    fn new_document_cancels_previous() {
        let s = scanner(1);
        let first = s.begin_document();
        let second = s.begin_document();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[tokio::test]
    async fn path_lock_is_exclusive_per_path() {
        let locks = PathLocks::new();
        let guard = locks.acquire(Path::new("a.json")).await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(Path::new("a.json"))).await;
        assert!(blocked.is_err());

        let other =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(Path::new("b.json"))).await;
        assert!(other.is_ok());

        drop(guard);
        let again =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(Path::new("a.json"))).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn idle_path_locks_are_pruned() {
        let locks = PathLocks::new();
        for i in 0..20 {
            let _guard = locks.acquire(Path::new(&format!("doc-{i}.json"))).await;
        }
        // Each acquire prunes the previous, released entry.
        assert_eq!(locks.tracked(), 1);

        let held = locks.acquire(Path::new("held.json")).await;
        let _other = locks.acquire(Path::new("other.json")).await;
        assert_eq!(locks.tracked(), 2);

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(Path::new("held.json"))).await;
        assert!(blocked.is_err());
        drop(held);
    }

    #[tokio::test]
    async fn scans_fixture_document() {
        let s = scanner(4);
        let out = s
            .scan_path(
                Path::new("../../../fixtures/json/plant_schematic.json"),
                Arc::new(NoProgress),
            )
            .await
            .unwrap();

        assert_eq!(out.page_count, 8);
        assert_eq!(out.document_id.len(), 64);
        assert_eq!(out.pages_of_kind(PageKind::Schematic), vec![3, 4, 5]);
        assert_eq!(out.pages_of_kind(PageKind::Cover), vec![1]);
        assert_eq!(out.pages_of_kind(PageKind::Toc), vec![2]);
        assert_eq!(out.pages_of_kind(PageKind::CableDiagram), vec![6]);
        assert_eq!(out.pages_of_kind(PageKind::PartsList), vec![7]);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].page, 8);
    }

    #[tokio::test]
    async fn unopenable_document_is_fatal() {
        let s = scanner(1);
        let err = s
            .scan_path(Path::new("/nonexistent/doc.json"), Arc::new(NoProgress))
            .await
            .unwrap_err();
        assert!(matches!(err, TagTraceError::DocumentOpen { .. }));
    }
}
