//! Collapse near-identical tag detections into positions.
//!
//! The same tag printed twice within a few points on one page is one device
//! (overlapping text objects, a tag repeated by a cross-reference). Further
//! apart it is a genuine repeat, e.g. one contact of a relay drawn at another
//! spot, and must survive.

use std::collections::BTreeMap;

use tracing::debug;

use tagtrace_shared::{ComponentPosition, DEFAULT_DEDUP_THRESHOLD_PT, MatchType, TagOccurrence};

/// Single-link, first-seen-anchor clustering of occurrences per (page, tag).
#[derive(Debug, Clone, Copy)]
pub struct PositionDeduplicator {
    threshold_pt: f64,
}

impl Default for PositionDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_THRESHOLD_PT)
    }
}

impl PositionDeduplicator {
    /// Occurrences whose centres are strictly closer than `threshold_pt` to
    /// a cluster anchor join that cluster.
    pub fn new(threshold_pt: f64) -> Self {
        Self { threshold_pt }
    }

    pub fn threshold_pt(&self) -> f64 {
        self.threshold_pt
    }

    /// One position per cluster, ordered by page, tag, then the anchor's x
    /// and y. The output does not depend on input order.
    pub fn deduplicate(&self, occurrences: &[TagOccurrence]) -> Vec<ComponentPosition> {
        let mut groups: BTreeMap<(u32, &str), Vec<&TagOccurrence>> = BTreeMap::new();
        for occ in occurrences {
            groups.entry((occ.page, occ.tag.as_str())).or_default().push(occ);
        }

        let mut positions = Vec::with_capacity(occurrences.len());
        for ((page, tag), mut group) in groups {
            group.sort_by(|a, b| {
                a.center
                    .x
                    .total_cmp(&b.center.x)
                    .then(a.center.y.total_cmp(&b.center.y))
            });

            let mut clustered = vec![false; group.len()];
            for i in 0..group.len() {
                if clustered[i] {
                    continue;
                }
                let anchor = group[i];
                clustered[i] = true;
                let mut merged = 1;

                for j in (i + 1)..group.len() {
                    if !clustered[j] && anchor.center.distance(&group[j].center) < self.threshold_pt {
                        clustered[j] = true;
                        merged += 1;
                    }
                }

                if merged > 1 {
                    debug!(page, tag, merged, "collapsed duplicate detections");
                }
                positions.push(position_from(anchor, merged));
            }
        }

        positions
    }
}

fn position_from(anchor: &TagOccurrence, merged: usize) -> ComponentPosition {
    ComponentPosition {
        tag: anchor.tag.clone(),
        matched_tag: anchor.tag.clone(),
        page: anchor.page,
        center: anchor.center,
        width: anchor.bbox.width(),
        height: anchor.bbox.height(),
        bbox: anchor.bbox,
        confidence: MatchType::Exact.confidence(),
        match_type: MatchType::Exact,
        merged,
    }
}
