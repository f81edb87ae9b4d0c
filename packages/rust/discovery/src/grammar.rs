//! Device-tag grammar.
//!
//! A device tag is printed as
//! `[+-]NAME(-NAME)?(:TERMINAL)?(.CONTACT)?` where `NAME` and `TERMINAL` are
//! `[A-Z0-9]+` and `CONTACT` is a number:
//! - `-K1`: bare device tag (e.g. a relay coil)
//! - `+DG-M1`: location-prefixed device tag
//! - `-A1-X5:3`: terminal reference (connection point 3 of `-A1-X5`)
//! - `-K1.2`: contact instance 2 of relay `-K1`

use regex::Regex;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Full printed tag, sign required.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<device>[+-][A-Z0-9]+(?:-[A-Z0-9]+)?)(?::(?P<terminal>[A-Z0-9]+))?(?:\.(?P<contact>[0-9]+))?$",
    )
    .expect("tag regex")
});

/// Caller-supplied tag; the leading sign may be omitted.
static LENIENT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<device>[+-]?[A-Z0-9]+(?:-[A-Z0-9]+)?)(?::(?P<terminal>[A-Z0-9]+))?(?:\.(?P<contact>[0-9]+))?$",
    )
    .expect("lenient tag regex")
});

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which form of tag a string is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagForm {
    /// `-K1`
    Bare,
    /// `-A1-X5:3`
    TerminalRef,
    /// `-K1.1`, possibly also carrying a terminal reference
    Contact,
}

/// A tag split into its grammar parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    /// The whole tag as printed.
    pub text: String,
    /// Device part including its sign, e.g. `-A1-X5`.
    pub device: String,
    /// Terminal reference without the colon.
    pub terminal: Option<String>,
    /// Contact suffix including the dot, e.g. `.1`.
    pub contact: Option<String>,
}

impl ParsedTag {
    pub fn form(&self) -> TagForm {
        if self.contact.is_some() {
            TagForm::Contact
        } else if self.terminal.is_some() {
            TagForm::TerminalRef
        } else {
            TagForm::Bare
        }
    }

    /// Sign-free key used for variant matching: the leading `+`/`-` is
    /// dropped and any `:terminal` reference ignored.
    pub fn variant_key(&self) -> String {
        let device = self.device.trim_start_matches(['+', '-']);
        match &self.contact {
            Some(contact) => format!("{device}{contact}"),
            None => device.to_string(),
        }
    }

    /// Sign-free device part, the identity of the physical device.
    pub fn device_key(&self) -> &str {
        self.device.trim_start_matches(['+', '-'])
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse printed text as a tag. Surrounding whitespace is ignored; anything
/// that does not match the grammar is not a tag.
pub fn parse_tag(text: &str) -> Option<ParsedTag> {
    parse_with(&TAG_RE, text)
}

/// Parse a caller-supplied tag, which may omit the leading sign.
pub fn parse_requested_tag(text: &str) -> Option<ParsedTag> {
    parse_with(&LENIENT_TAG_RE, text)
}

/// Whether `text` is a tag.
pub fn is_tag(text: &str) -> bool {
    TAG_RE.is_match(text.trim())
}

fn parse_with(re: &Regex, text: &str) -> Option<ParsedTag> {
    let trimmed = text.trim();
    let caps = re.captures(trimmed)?;
    Some(ParsedTag {
        text: trimmed.to_string(),
        device: caps["device"].to_string(),
        terminal: caps.name("terminal").map(|m| m.as_str().to_string()),
        contact: caps.name("contact").map(|m| format!(".{}", m.as_str())),
    })
}

/// Whether `prefix` is a proper prefix of `tag` ending on a grammar boundary
/// (`-`, `:` or `.`), so `-K1` is a prefix of `-K1.1` and `-K1-X2:4` but not
/// of `-K10`.
pub fn is_boundary_prefix(prefix: &str, tag: &str) -> bool {
    match tag.strip_prefix(prefix) {
        Some(rest) => matches!(rest.chars().next(), Some('-' | ':' | '.')),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_tag_forms() {
        let bare = parse_tag("-K1").unwrap();
        assert_eq!(bare.form(), TagForm::Bare);
        assert_eq!(bare.device, "-K1");

        let located = parse_tag("+DG-M1").unwrap();
        assert_eq!(located.form(), TagForm::Bare);
        assert_eq!(located.device, "+DG-M1");

        let terminal = parse_tag("-A1-X5:3").unwrap();
        assert_eq!(terminal.form(), TagForm::TerminalRef);
        assert_eq!(terminal.device, "-A1-X5");
        assert_eq!(terminal.terminal.as_deref(), Some("3"));

        let contact = parse_tag("-K1.2").unwrap();
        assert_eq!(contact.form(), TagForm::Contact);
        assert_eq!(contact.device, "-K1");
        assert_eq!(contact.contact.as_deref(), Some(".2"));
    }

    #[test]
    fn rejects_non_tags() {
        for text in ["K1", "-k1", "--K1", "-K1-", "-K1 -K2", "", "-", "24V", "-K1.A", "-A-B-C"] {
            assert!(parse_tag(text).is_none(), "{text:?} should not be a tag");
        }
    }

    #[test]
    fn trims_whitespace() {
        assert!(is_tag("  -Q3 "));
        assert_eq!(parse_tag(" -Q3\n").unwrap().text, "-Q3");
    }

    #[test]
    fn requested_tags_may_omit_sign() {
        assert!(parse_tag("K1").is_none());
        let parsed = parse_requested_tag("K1").unwrap();
        assert_eq!(parsed.variant_key(), "K1");
        assert!(parse_requested_tag("not a tag").is_none());
    }

    #[test]
    fn variant_key_drops_sign_and_terminal() {
        assert_eq!(parse_tag("+K1").unwrap().variant_key(), "K1");
        assert_eq!(parse_tag("-A1-X5:3").unwrap().variant_key(), "A1-X5");
        assert_eq!(parse_tag("-K1:13.1").unwrap().variant_key(), "K1.1");
    }

    #[test]
    fn boundary_prefix() {
        assert!(is_boundary_prefix("-K1", "-K1.1"));
        assert!(is_boundary_prefix("-A1", "-A1-X5:3"));
        assert!(is_boundary_prefix("-A1-X5", "-A1-X5:3"));
        assert!(!is_boundary_prefix("-K1", "-K10"));
        assert!(!is_boundary_prefix("-K1", "-K1"));
    }
}
