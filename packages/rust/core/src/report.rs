//! Ground-truth report: every tag found on a document's schematic pages.
//!
//! The JSON layout is consumed by external validation tooling, so field names
//! are fixed. Coordinates are page points with a bottom-left origin, exactly
//! as extracted.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tagtrace_shared::{ComponentPosition, MultiPageGroup, Result, TagTraceError};

use crate::aggregate::aggregate;

/// One position in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPosition {
    pub page: u32,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl From<&ComponentPosition> for ReportPosition {
    fn from(p: &ComponentPosition) -> Self {
        Self {
            page: p.page,
            x0: p.bbox.x0,
            y0: p.bbox.y0,
            x1: p.bbox.x1,
            y1: p.bbox.y1,
            center_x: p.center.x,
            center_y: p.center.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCount {
    pub count: usize,
    pub pages: Vec<u32>,
    pub page_count: usize,
    pub positions: Vec<ReportPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPageEntry {
    pub pages: Vec<u32>,
    pub total_count: usize,
}

impl From<&MultiPageGroup> for MultiPageEntry {
    fn from(g: &MultiPageGroup) -> Self {
        Self {
            pages: g.pages.clone(),
            total_count: g.total_count,
        }
    }
}

/// Ground-truth discovery result for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthReport {
    pub parts_list_count: usize,
    pub parts_list: Vec<String>,
    pub schematic_pages: Vec<u32>,
    pub total_tag_occurrences: usize,
    pub tags_by_page: BTreeMap<u32, Vec<String>>,
    pub tags_with_counts: BTreeMap<String, TagCount>,
    pub multi_page_tags: BTreeMap<String, MultiPageEntry>,
}

impl GroundTruthReport {
    /// Build from deduplicated schematic positions and the tags printed on
    /// parts-list pages.
    pub fn build(
        schematic_pages: Vec<u32>,
        positions: &[ComponentPosition],
        parts_list: Vec<String>,
    ) -> Self {
        let mut tags_by_page: BTreeMap<u32, Vec<String>> =
            schematic_pages.iter().map(|p| (*p, Vec::new())).collect();
        for pos in positions {
            let tags = tags_by_page.entry(pos.page).or_default();
            if !tags.contains(&pos.matched_tag) {
                tags.push(pos.matched_tag.clone());
            }
        }
        for tags in tags_by_page.values_mut() {
            tags.sort();
        }

        let groups = aggregate(positions);

        let tags_with_counts = groups
            .values()
            .map(|g| {
                let tag_positions: Vec<ReportPosition> = positions
                    .iter()
                    .filter(|p| p.matched_tag == g.tag)
                    .map(ReportPosition::from)
                    .collect();
                (
                    g.tag.clone(),
                    TagCount {
                        count: g.total_count,
                        pages: g.pages.clone(),
                        page_count: g.pages.len(),
                        positions: tag_positions,
                    },
                )
            })
            .collect();

        let multi_page_tags = groups
            .values()
            .filter(|g| g.is_multi_page())
            .map(|g| (g.tag.clone(), MultiPageEntry::from(g)))
            .collect();

        Self {
            parts_list_count: parts_list.len(),
            parts_list,
            schematic_pages,
            total_tag_occurrences: positions.len(),
            tags_by_page,
            tags_with_counts,
            multi_page_tags,
        }
    }

    /// Distinct tags in the report, sorted.
    pub fn tags(&self) -> Vec<&str> {
        self.tags_with_counts.keys().map(String::as_str).collect()
    }

    /// Write as pretty JSON: temp file first, then rename over the target.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            TagTraceError::validation(format!("JSON serialization failed: {e}"))
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TagTraceError::io(parent, e))?;
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("report.json");
        let temp = path.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&temp, json).map_err(|e| TagTraceError::io(&temp, e))?;
        std::fs::rename(&temp, path).map_err(|e| TagTraceError::io(path, e))?;

        info!(
            path = %path.display(),
            tags = self.tags_with_counts.len(),
            occurrences = self.total_tag_occurrences,
            "ground-truth report written"
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TagTraceError::io(path, e))?;
        let report: Self = serde_json::from_str(&content).map_err(|e| {
            TagTraceError::parse(format!("invalid ground-truth report {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), tags = report.tags_with_counts.len(), "report loaded");
        Ok(report)
    }
}
