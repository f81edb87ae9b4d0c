//! Core domain types for TagTrace.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BBox, PageTransform, Point};

// ---------------------------------------------------------------------------
// ScanId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one scan of one document (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(pub Uuid);

impl ScanId {
    /// Generate a new time-sortable scan identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Extracted page text
// ---------------------------------------------------------------------------

/// One run of text as produced by the PDF text extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub bbox: BBox,
}

impl TextRun {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// All text runs of a single page, plus the page size in points.
///
/// `width`/`height` may be zero when the extractor does not know the media
/// box; [`PageText::extent`] then falls back to the extent of the runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number.
    pub page: u32,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub runs: Vec<TextRun>,
}

impl PageText {
    /// Page size, derived from the runs when the media box is unknown.
    pub fn extent(&self) -> (f64, f64) {
        if self.width > 0.0 && self.height > 0.0 {
            return (self.width, self.height);
        }
        let (w, h) = self
            .runs
            .iter()
            .filter(|r| r.bbox.is_finite())
            .fold((0.0_f64, 0.0_f64), |(w, h), r| (w.max(r.bbox.x1), h.max(r.bbox.y1)));
        (w, h)
    }
}

// ---------------------------------------------------------------------------
// PageKind
// ---------------------------------------------------------------------------

/// What a page of a schematic document is, judged from its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageKind {
    Schematic,
    Cover,
    Toc,
    CableDiagram,
    PartsList,
    Unknown,
}

impl PageKind {
    /// Whether tags on a page of this kind take part in matching.
    ///
    /// Schematic pages always do; everything else only when the caller asked
    /// to search all pages.
    pub fn is_searchable(self, search_all_pages: bool) -> bool {
        self == PageKind::Schematic || search_all_pages
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PageKind::Schematic => "SCHEMATIC",
            PageKind::Cover => "COVER",
            PageKind::Toc => "TOC",
            PageKind::CableDiagram => "CABLE_DIAGRAM",
            PageKind::PartsList => "PARTS_LIST",
            PageKind::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A page that could not be read; the scan skipped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageWarning {
    pub page: u32,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Tag occurrences and positions
// ---------------------------------------------------------------------------

/// One text run that matched the device-tag grammar. Raw and immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagOccurrence {
    pub tag: String,
    pub page: u32,
    pub bbox: BBox,
    pub center: Point,
}

impl TagOccurrence {
    pub fn new(tag: impl Into<String>, page: u32, bbox: BBox) -> Self {
        Self {
            tag: tag.into(),
            page,
            center: bbox.center(),
            bbox,
        }
    }
}

/// How a requested tag was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Variant,
    Partial,
    None,
}

impl MatchType {
    /// Confidence attached to positions resolved this way.
    pub fn confidence(self) -> f64 {
        match self {
            MatchType::Exact => 1.0,
            MatchType::Variant => 0.8,
            MatchType::Partial => 0.6,
            MatchType::None => 0.0,
        }
    }
}

/// A deduplicated on-page location of a tag; the unit returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPosition {
    /// The tag this position answers for (the requested tag after matching).
    pub tag: String,
    /// The tag text actually printed on the page.
    pub matched_tag: String,
    pub page: u32,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    /// Bounding box of the anchor occurrence of the cluster.
    pub bbox: BBox,
    pub confidence: f64,
    pub match_type: MatchType,
    /// Number of raw occurrences collapsed into this position.
    pub merged: usize,
}

impl ComponentPosition {
    /// Re-label a discovered position as the answer for `requested`.
    pub fn resolved_as(&self, requested: &str, match_type: MatchType) -> Self {
        Self {
            tag: requested.to_string(),
            match_type,
            confidence: match_type.confidence(),
            ..self.clone()
        }
    }
}

/// Per-tag page spread. Always rebuilt from positions, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPageGroup {
    pub tag: String,
    /// Distinct pages in order of first appearance.
    pub pages: Vec<u32>,
    pub total_count: usize,
}

impl MultiPageGroup {
    pub fn is_multi_page(&self) -> bool {
        self.pages.len() > 1
    }
}

// ---------------------------------------------------------------------------
// Placed components and wires
// ---------------------------------------------------------------------------

/// Device family of a placed component; decides its terminal layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Contactor,
    Relay,
    ProximitySensor,
    PhotoelectricSensor,
    LimitSwitch,
    PressureSensor,
    TemperatureSensor,
    PowerSupply,
    Motor,
    PlcIo,
    #[serde(other)]
    Other,
}

impl ComponentType {
    pub fn is_sensor(self) -> bool {
        matches!(
            self,
            ComponentType::ProximitySensor
                | ComponentType::PhotoelectricSensor
                | ComponentType::LimitSwitch
                | ComponentType::PressureSensor
                | ComponentType::TemperatureSensor
        )
    }
}

/// A component placed by the editing layer. Read-only input to routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub page: u32,
    pub bbox: BBox,
    /// Channel count for PLC I/O modules; ignored for other types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_count: Option<u32>,
}

/// A terminal position computed from a component's type and bbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalAnchor {
    pub component_id: String,
    pub index: usize,
    pub position: Point,
}

/// Reference to one terminal of one component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalRef {
    pub component_id: String,
    pub index: usize,
}

/// Electrical class of a wire, used by the renderer for colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoltageClass {
    AcPower,
    Dc24,
    Dc0,
    ProtectiveEarth,
    Signal,
    #[default]
    Unclassified,
}

impl VoltageClass {
    /// Guess the class from a printed wire/potential label.
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_ascii_uppercase();
        let l = l.trim_start_matches('+');
        match l {
            "L1" | "L2" | "L3" | "N" | "L" => VoltageClass::AcPower,
            "24V" | "24VDC" | "24 V" | "L+" => VoltageClass::Dc24,
            "0V" | "0 V" | "M" | "L-" => VoltageClass::Dc0,
            "PE" | "GND" | "PEN" => VoltageClass::ProtectiveEarth,
            "" => VoltageClass::Unclassified,
            _ if l.starts_with("24V") => VoltageClass::Dc24,
            _ if l.starts_with("0V") => VoltageClass::Dc0,
            _ if l.starts_with("L1") || l.starts_with("L2") || l.starts_with("L3") => {
                VoltageClass::AcPower
            }
            _ => VoltageClass::Signal,
        }
    }
}

/// A requested connection between two terminals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from: TerminalRef,
    pub to: TerminalRef,
    #[serde(default)]
    pub voltage_class: Option<VoltageClass>,
    /// Printed potential label, used when `voltage_class` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl WireSpec {
    pub fn voltage_class(&self) -> VoltageClass {
        self.voltage_class.unwrap_or_else(|| {
            self.label
                .as_deref()
                .map(VoltageClass::from_label)
                .unwrap_or_default()
        })
    }
}

/// An orthogonal wire path in page space.
///
/// `resolved == false` means an endpoint could not be anchored; such a path
/// has no waypoints and is reported rather than drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from_anchor: TerminalRef,
    pub to_anchor: TerminalRef,
    pub waypoints: Vec<Point>,
    pub voltage_class: VoltageClass,
    pub resolved: bool,
}

impl WirePath {
    /// Waypoints mapped into device space for rendering.
    pub fn to_device(&self, transform: &PageTransform) -> Vec<Point> {
        self.waypoints
            .iter()
            .map(|p| transform.page_to_device(*p))
            .collect()
    }
}
