//! Shared types, error model, geometry, and configuration for TagTrace.
//!
//! This crate is the foundation depended on by all other TagTrace crates.
//! It provides:
//! - [`TagTraceError`]: the unified error type
//! - Domain types ([`TagOccurrence`], [`ComponentPosition`], [`MultiPageGroup`], [`WirePath`], ...)
//! - Geometry ([`Point`], [`BBox`]) and the single page/device [`PageTransform`]
//! - Configuration ([`AppConfig`], runtime configs, config loading)

pub mod config;
pub mod error;
pub mod geometry;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClassifierConfig, ContactConfig, DEFAULT_DEDUP_THRESHOLD_PT, MAX_CONTACT_INDEX,
    MatchConfig, RoutingConfig, ScanConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_config,
};
pub use error::{Result, TagTraceError};
pub use geometry::{BBox, POINTS_PER_INCH, PageTransform, Point};
pub use types::{
    Component, ComponentPosition, ComponentType, MatchType, MultiPageGroup, PageKind, PageText,
    PageWarning, ScanId, TagOccurrence, TerminalAnchor, TerminalRef, TextRun, VoltageClass,
    WirePath, WireSpec,
};
