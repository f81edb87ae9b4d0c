//! Per-tag page spread.

use std::collections::BTreeMap;

use tagtrace_shared::{ComponentPosition, MultiPageGroup};

/// Group positions by tag. Pages keep the order in which the tag first
/// appears in `positions`; the result is rebuilt from scratch on every call.
pub fn aggregate(positions: &[ComponentPosition]) -> BTreeMap<String, MultiPageGroup> {
    let mut groups: BTreeMap<String, MultiPageGroup> = BTreeMap::new();
    for pos in positions {
        let group = groups
            .entry(pos.matched_tag.clone())
            .or_insert_with(|| MultiPageGroup {
                tag: pos.matched_tag.clone(),
                pages: Vec::new(),
                total_count: 0,
            });
        if !group.pages.contains(&pos.page) {
            group.pages.push(pos.page);
        }
        group.total_count += 1;
    }
    groups
}

/// Only the groups spanning more than one page.
pub fn multi_page_groups(
    groups: &BTreeMap<String, MultiPageGroup>,
) -> impl Iterator<Item = &MultiPageGroup> {
    groups.values().filter(|g| g.is_multi_page())
}
