//! Title-block keyword sets per locale.

use tagtrace_shared::PageKind;

/// Keywords that identify a page kind when they appear in the title block.
///
/// Keywords are matched as whole words against lowercased text.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    pub locale: &'static str,
    pub parts_list: &'static [&'static str],
    pub cable_diagram: &'static [&'static str],
    pub toc: &'static [&'static str],
    pub cover: &'static [&'static str],
    pub schematic: &'static [&'static str],
}

const EN: KeywordSet = KeywordSet {
    locale: "en",
    parts_list: &["parts list", "bill of materials", "device list", "bom"],
    cable_diagram: &["cable diagram", "cable overview", "cable list", "cable plan"],
    toc: &["table of contents", "contents"],
    cover: &["cover sheet", "cover page", "title page"],
    schematic: &["schematic", "circuit diagram", "wiring diagram", "control circuit"],
};

const DE: KeywordSet = KeywordSet {
    locale: "de",
    parts_list: &["stückliste", "artikelstückliste", "betriebsmittelliste"],
    cable_diagram: &["kabelplan", "kabelübersicht", "kabelliste"],
    toc: &["inhaltsverzeichnis", "inhalt"],
    cover: &["deckblatt", "titelblatt"],
    schematic: &["schaltplan", "stromlaufplan", "hauptstromkreis", "steuerstromkreis"],
};

impl KeywordSet {
    /// Built-in keyword set for a locale code (`en`, `de`).
    pub fn for_locale(locale: &str) -> Option<Self> {
        match locale.to_ascii_lowercase().as_str() {
            "en" => Some(EN),
            "de" => Some(DE),
            _ => None,
        }
    }

    /// Keywords for a page kind, in the order they are tried.
    pub fn keywords(&self, kind: PageKind) -> &'static [&'static str] {
        match kind {
            PageKind::PartsList => self.parts_list,
            PageKind::CableDiagram => self.cable_diagram,
            PageKind::Toc => self.toc,
            PageKind::Cover => self.cover,
            PageKind::Schematic => self.schematic,
            PageKind::Unknown => &[],
        }
    }
}
