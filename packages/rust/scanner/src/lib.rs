//! Document scanning: text sources and the concurrent page scanner.
//!
//! This crate provides:
//! - [`sources`]: the [`TextSource`] trait and its JSON / PDF implementations
//! - [`engine`]: the [`Scanner`], which classifies and tags every page of a
//!   document on a bounded worker pool

pub mod engine;
pub mod sources;

pub use engine::{CancelToken, NoProgress, PageScan, PathLocks, ScanOutput, ScanProgress, Scanner};
#[cfg(feature = "pdf")]
pub use sources::PdfTextSource;
pub use sources::{JsonTextSource, OpenedSource, TextSource, fingerprint_file, open_source};
