//! Resolve caller-supplied tags against discovered positions.
//!
//! Each requested tag is tried, in order, as:
//! 1. an exact printed tag (confidence 1.0)
//! 2. a variant: same tag with the sign added/dropped or a `:terminal`
//!    reference ignored (0.8)
//! 3. a partial: prefix of a printed terminal-reference or contact tag (0.6)
//!
//! The first rule that finds anything wins. A tag nothing resolves is
//! reported missing; no position is ever made up for it.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, instrument};

use tagtrace_discovery::{ParsedTag, TagForm, is_boundary_prefix, parse_requested_tag, parse_tag};
use tagtrace_shared::{ComponentPosition, MatchType};

/// Outcome of matching a tag list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    /// Every resolved position, grouped by requested tag in request order.
    pub positions: Vec<ComponentPosition>,
    /// Requested tags with no match, including those with invalid syntax.
    pub missing: Vec<String>,
    /// The subset of `missing` that is not a tag at all.
    pub invalid_syntax: Vec<String>,
    /// Requested tags resolving to more than one position.
    pub ambiguous: BTreeMap<String, Vec<ComponentPosition>>,
}

impl MatchResult {
    /// Positions that answer for one requested tag.
    pub fn positions_for<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ComponentPosition> {
        self.positions.iter().filter(move |p| p.tag == tag)
    }

    pub fn found_tags(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.positions
            .iter()
            .map(|p| p.tag.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TagMatcher
// ---------------------------------------------------------------------------

struct Discovered {
    parsed: ParsedTag,
    positions: Vec<ComponentPosition>,
}

/// Index of deduplicated positions by printed tag.
pub struct TagMatcher {
    by_tag: BTreeMap<String, Discovered>,
}

impl TagMatcher {
    pub fn new(positions: &[ComponentPosition]) -> Self {
        let mut by_tag: BTreeMap<String, Discovered> = BTreeMap::new();
        for pos in positions {
            if let Some(entry) = by_tag.get_mut(&pos.matched_tag) {
                entry.positions.push(pos.clone());
                continue;
            }
            // Positions come from discovery, so their tags always parse.
            let Some(parsed) = parse_tag(&pos.matched_tag) else {
                continue;
            };
            by_tag.insert(
                pos.matched_tag.clone(),
                Discovered {
                    parsed,
                    positions: vec![pos.clone()],
                },
            );
        }
        Self { by_tag }
    }

    /// Number of distinct printed tags indexed.
    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    #[instrument(skip_all, fields(requested = desired.len()))]
    pub fn match_tags<S: AsRef<str>>(&self, desired: &[S]) -> MatchResult {
        let mut result = MatchResult::default();
        let mut seen = HashSet::new();

        for raw in desired {
            let tag = raw.as_ref().trim();
            if !seen.insert(tag) {
                continue;
            }

            let Some(requested) = parse_requested_tag(tag) else {
                debug!(tag, "requested tag has invalid syntax");
                result.missing.push(tag.to_string());
                result.invalid_syntax.push(tag.to_string());
                continue;
            };

            let resolved = self.resolve(tag, &requested);
            match resolved.len() {
                0 => {
                    debug!(tag, "tag not found");
                    result.missing.push(tag.to_string());
                }
                1 => result.positions.extend(resolved),
                n => {
                    debug!(tag, positions = n, "tag has several positions");
                    result.ambiguous.insert(tag.to_string(), resolved.clone());
                    result.positions.extend(resolved);
                }
            }
        }

        result
    }

    fn resolve(&self, tag: &str, requested: &ParsedTag) -> Vec<ComponentPosition> {
        if let Some(found) = self.by_tag.get(tag) {
            return collect(tag, MatchType::Exact, [found]);
        }

        let key = requested.variant_key();
        let variants = self
            .by_tag
            .values()
            .filter(|d| d.parsed.variant_key() == key);
        let resolved = collect(tag, MatchType::Variant, variants);
        if !resolved.is_empty() {
            return resolved;
        }

        let prefix = sign_free(&requested.text);
        let partials = self.by_tag.values().filter(|d| {
            d.parsed.form() != TagForm::Bare && is_boundary_prefix(prefix, sign_free(&d.parsed.text))
        });
        collect(tag, MatchType::Partial, partials)
    }
}

fn sign_free(tag: &str) -> &str {
    tag.trim_start_matches(['+', '-'])
}

fn collect<'a>(
    requested: &str,
    match_type: MatchType,
    found: impl IntoIterator<Item = &'a Discovered>,
) -> Vec<ComponentPosition> {
    let mut out: Vec<ComponentPosition> = found
        .into_iter()
        .flat_map(|d| d.positions.iter().map(|p| p.resolved_as(requested, match_type)))
        .collect();
    out.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(a.center.x.total_cmp(&b.center.x))
            .then(a.center.y.total_cmp(&b.center.y))
            .then_with(|| a.matched_tag.cmp(&b.matched_tag))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::PositionDeduplicator;
    use tagtrace_shared::{BBox, TagOccurrence};

    fn matcher(spec: &[(&str, u32, f64, f64)]) -> TagMatcher {
        let occurrences: Vec<TagOccurrence> = spec
            .iter()
            .map(|(tag, page, x, y)| TagOccurrence::new(*tag, *page, BBox::new(*x, *y, x + 18.0, y + 8.0)))
            .collect();
        TagMatcher::new(&PositionDeduplicator::default().deduplicate(&occurrences))
    }

    fn sample() -> TagMatcher {
        matcher(&[
            ("-K1", 3, 200.0, 600.0),
            ("-K1", 5, 100.0, 500.0),
            ("-K1.1", 4, 300.0, 600.0),
            ("-A1-X5:3", 3, 700.0, 300.0),
            ("+DG-M1", 3, 800.0, 500.0),
            ("-Q1", 3, 100.0, 600.0),
        ])
    }

    #[test]
    fn empty_request_is_empty_result() {
        let result = sample().match_tags::<&str>(&[]);
        assert_eq!(result, MatchResult::default());
    }

    #[test]
    fn unknown_tag_is_missing() {
        let result = sample().match_tags(&["-NOPE"]);
        assert!(result.positions.is_empty());
        assert_eq!(result.missing, vec!["-NOPE"]);
        assert!(result.invalid_syntax.is_empty());
        assert!(result.ambiguous.is_empty());
    }

    #[test]
    fn invalid_syntax_is_flagged_missing() {
        let result = sample().match_tags(&["not a tag", "-Q1"]);
        assert_eq!(result.missing, vec!["not a tag"]);
        assert_eq!(result.invalid_syntax, vec!["not a tag"]);
        assert_eq!(result.positions.len(), 1);
    }

    #[test]
    fn exact_match_wins() {
        let result = sample().match_tags(&["-Q1"]);
        assert_eq!(result.positions.len(), 1);
        let p = &result.positions[0];
        assert_eq!(p.match_type, MatchType::Exact);
        assert_eq!(p.confidence, 1.0);
        assert_eq!(p.page, 3);
    }

    #[test]
    fn sign_variant_matches_at_point_eight() {
        let result = sample().match_tags(&["DG-M1", "-DG-M1", "Q1"]);
        assert!(result.missing.is_empty());
        for p in &result.positions {
            assert_eq!(p.match_type, MatchType::Variant);
            assert_eq!(p.confidence, 0.8);
        }
        assert_eq!(result.positions[0].tag, "DG-M1");
        assert_eq!(result.positions[0].matched_tag, "+DG-M1");
    }

    #[test]
    fn terminal_reference_is_ignored_for_variants() {
        let result = sample().match_tags(&["-A1-X5"]);
        assert_eq!(result.positions.len(), 1);
        assert_eq!(result.positions[0].match_type, MatchType::Variant);
        assert_eq!(result.positions[0].matched_tag, "-A1-X5:3");
    }

    #[test]
    fn prefix_of_terminal_or_contact_is_partial() {
        let result = sample().match_tags(&["-A1"]);
        assert_eq!(result.positions.len(), 1);
        assert_eq!(result.positions[0].match_type, MatchType::Partial);
        assert_eq!(result.positions[0].confidence, 0.6);

        let m = matcher(&[("-K3.1", 2, 10.0, 10.0), ("-K30", 2, 300.0, 10.0)]);
        let result = m.match_tags(&["-K3"]);
        let matched: Vec<&str> = result.positions.iter().map(|p| p.matched_tag.as_str()).collect();
        assert_eq!(matched, vec!["-K3.1"]);
    }

    #[test]
    fn repeated_tag_is_ambiguous_not_an_error() {
        let result = sample().match_tags(&["-K1"]);
        assert_eq!(result.positions.len(), 2);
        assert!(result.missing.is_empty());
        let amb = &result.ambiguous["-K1"];
        assert_eq!(amb.iter().map(|p| p.page).collect::<Vec<_>>(), vec![3, 5]);
    }

    #[test]
    fn confidence_ordering_and_no_none_positions() {
        let result = sample().match_tags(&["-Q1", "Q1", "-A1", "-NOPE"]);
        let conf: Vec<f64> = result.positions.iter().map(|p| p.confidence).collect();
        assert_eq!(conf, vec![1.0, 0.8, 0.6]);
        assert!(result.positions.iter().all(|p| p.match_type != MatchType::None));
    }

    #[test]
    fn matching_is_idempotent() {
        let m = sample();
        let tags = ["-K1", "-A1", "DG-M1", "-NOPE"];
        assert_eq!(m.match_tags(&tags), m.match_tags(&tags));
    }

    #[test]
    fn duplicate_requests_are_answered_once() {
        let result = sample().match_tags(&["-Q1", "-Q1"]);
        assert_eq!(result.positions.len(), 1);
        assert_eq!(result.found_tags(), vec!["-Q1"]);
    }
}
