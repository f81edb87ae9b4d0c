//! Core matching, routing and reporting for TagTrace.
//!
//! This crate turns scanned pages into answers:
//! - [`dedup`] and [`aggregate`]: raw occurrences to positions and page spreads
//! - [`matcher`]: caller tag lists to scored positions
//! - [`contacts`]: relay contact lookup
//! - [`routing`]: terminal anchors and orthogonal wire paths
//! - [`report`] and [`validate`]: ground-truth reports and checks against them
//! - [`pipeline`]: the [`DocumentSession`] tying it together

pub mod aggregate;
pub mod contacts;
pub mod dedup;
pub mod matcher;
pub mod pipeline;
pub mod report;
pub mod routing;
pub mod validate;

pub use aggregate::{aggregate, multi_page_groups};
pub use contacts::{ContactMapping, ContactPair, contact_mappings, contact_positions};
pub use dedup::PositionDeduplicator;
pub use matcher::{MatchResult, TagMatcher};
pub use pipeline::{DocumentSession, ProgressReporter, SessionSummary, SilentProgress};
pub use report::{GroundTruthReport, MultiPageEntry, ReportPosition, TagCount};
pub use routing::{WireRouting, generate_wire_paths, route, route_points, terminal_anchors};
pub use validate::{CountMismatch, PageMismatch, ValidationSummary, validate_against};
