//! Auxiliary-contact lookup for relays and contactors.
//!
//! A relay `-K1` drawn with its contacts elsewhere prints them as `-K1.1`,
//! `-K1.2`, ... Each suffix maps to an IEC 60947 terminal pair: `.n` is the
//! normally open pair `n3-n4` unless configured as normally closed, then
//! `n1-n2`. The mapping is a configurable assumption, not a derived rule.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use tagtrace_discovery::{parse_requested_tag, parse_tag};
use tagtrace_shared::{ComponentPosition, ContactConfig, MatchType};

/// Terminal numbers of one contact, e.g. 13-14.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContactPair {
    pub first: u32,
    pub second: u32,
}

impl std::fmt::Display for ContactPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

/// What a contact suffix stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMapping {
    pub suffix: String,
    pub index: u32,
    pub normally_closed: bool,
    pub pair: ContactPair,
}

impl ContactMapping {
    /// Mapping of `suffix` (`.1`, `.2`, ...), or `None` if it is not a
    /// contact suffix.
    pub fn for_suffix(suffix: &str, config: &ContactConfig) -> Option<Self> {
        let index: u32 = suffix.strip_prefix('.')?.parse().ok()?;
        if index == 0 {
            return None;
        }
        let normally_closed = config.normally_closed.iter().any(|s| s == suffix);
        let (first, second) = if normally_closed { (1, 2) } else { (3, 4) };

        let base = index.checked_mul(10)?;
        Some(Self {
            suffix: suffix.to_string(),
            index,
            normally_closed,
            pair: ContactPair {
                first: base.checked_add(first)?,
                second: base.checked_add(second)?,
            },
        })
    }
}

/// Mappings for every configured suffix, in configured order.
pub fn contact_mappings(config: &ContactConfig) -> Vec<ContactMapping> {
    config
        .suffixes
        .iter()
        .filter_map(|s| {
            let mapping = ContactMapping::for_suffix(s, config);
            if mapping.is_none() {
                warn!(suffix = %s, "ignoring malformed contact suffix");
            }
            mapping
        })
        .collect()
}

/// Positions of `base_tag`'s contacts, keyed by suffix.
///
/// Every configured suffix has a key, empty when that contact is not drawn.
/// A contact counts when its device part equals the base tag's; it is exact
/// when the signs agree and a variant otherwise. The map is built fresh
/// from `positions` on each call.
pub fn contact_positions(
    base_tag: &str,
    positions: &[ComponentPosition],
    config: &ContactConfig,
) -> BTreeMap<String, Vec<ComponentPosition>> {
    let mut out: BTreeMap<String, Vec<ComponentPosition>> = config
        .suffixes
        .iter()
        .map(|s| (s.clone(), Vec::new()))
        .collect();

    let Some(base) = parse_requested_tag(base_tag) else {
        warn!(base_tag, "contact lookup for invalid tag");
        return out;
    };

    for pos in positions {
        let Some(printed) = parse_tag(&pos.matched_tag) else {
            continue;
        };
        let Some(contact) = printed.contact.as_deref() else {
            continue;
        };
        if printed.device_key() != base.device_key() {
            continue;
        }
        let Some(slot) = out.get_mut(contact) else {
            continue;
        };
        let match_type = if printed.device == base.device {
            MatchType::Exact
        } else {
            MatchType::Variant
        };
        slot.push(pos.resolved_as(&format!("{}{contact}", base.device), match_type));
    }

    for list in out.values_mut() {
        list.sort_by(|a, b| {
            a.page
                .cmp(&b.page)
                .then(a.center.x.total_cmp(&b.center.x))
                .then(a.center.y.total_cmp(&b.center.y))
        });
    }

    debug!(
        base_tag,
        found = out.values().map(Vec::len).sum::<usize>(),
        "contact lookup"
    );
    out
}
