//! Citation data model shared by the store, the engine protocol and the DOM layer.
//!
//! Field names follow the engine's JSON (`citationID`, `citationItems`,
//! `properties.noteIndex`). Fields this crate does not interpret are kept in
//! `extra` maps so a citation survives a storage round-trip unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;

/// Style class reported by the engine as `xclass`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CitationMode {
    /// Citations are rendered as numbered notes.
    #[default]
    Note,
    /// Citations are rendered inline in the running text.
    InText,
}

impl CitationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::InText => "in-text",
        }
    }

    /// Position number for the citation at `index` in document order.
    ///
    /// Note styles number citations from 1; in-text styles always use 0.
    pub fn note_number(&self, index: usize) -> u32 {
        match self {
            Self::Note => index as u32 + 1,
            Self::InText => 0,
        }
    }
}

impl std::fmt::Display for CitationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reference cited by a citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationItem {
    /// Reference item ID (the menu checkbox value).
    pub id: SmolStr,
    /// Locators, prefixes and anything else the engine attached.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CitationItem {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}

/// Position properties of a citation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationProperties {
    #[serde(default)]
    pub note_index: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A logical citation occurrence in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Assigned by the engine on first registration.
    #[serde(rename = "citationID", default, skip_serializing_if = "Option::is_none")]
    pub citation_id: Option<SmolStr>,
    #[serde(default)]
    pub citation_items: Vec<CitationItem>,
    #[serde(default)]
    pub properties: CitationProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Citation {
    /// Create an unregistered citation for the given reference items.
    pub fn from_items<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            citation_items: ids.into_iter().map(CitationItem::new).collect(),
            ..Default::default()
        }
    }

    /// The citation ID, treating an empty string as absent.
    pub fn id(&self) -> Option<&SmolStr> {
        self.citation_id.as_ref().filter(|id| !id.is_empty())
    }

    /// IDs of the cited reference items, in order.
    pub fn item_ids(&self) -> impl Iterator<Item = &SmolStr> {
        self.citation_items.iter().map(|item| &item.id)
    }

    /// Replace the cited items with `ids`.
    ///
    /// Items that stay selected keep whatever extra data they carried.
    pub fn set_items(&mut self, ids: &[SmolStr]) {
        let mut previous = std::mem::take(&mut self.citation_items);
        self.citation_items = ids
            .iter()
            .map(|id| match previous.iter().position(|item| &item.id == id) {
                Some(idx) => previous.swap_remove(idx),
                None => CitationItem::new(id.clone()),
            })
            .collect();
    }
}

/// `[citationID, noteNumber]` pair describing a neighbouring citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationPosition(pub SmolStr, pub u32);

impl CitationPosition {
    pub fn new(citation_id: impl Into<SmolStr>, note_number: u32) -> Self {
        Self(citation_id.into(), note_number)
    }

    pub fn citation_id(&self) -> &SmolStr {
        &self.0
    }

    pub fn note_number(&self) -> u32 {
        self.1
    }
}

/// A reference item offered in the citation menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: SmolStr,
    pub title: String,
}

impl MenuItem {
    pub fn new(id: impl Into<SmolStr>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A menu row as rendered: item plus checkbox state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub id: SmolStr,
    pub title: String,
    pub checked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_preserves_unknown_fields() {
        let json = r#"{
            "citationID": "c1",
            "citationItems": [{"id": "item-1", "locator": "12", "label": "page"}],
            "properties": {"noteIndex": 3, "unsorted": true},
            "sortedItems": [["x"]]
        }"#;
        let citation: Citation = serde_json::from_str(json).unwrap();
        assert_eq!(citation.id().map(SmolStr::as_str), Some("c1"));
        assert_eq!(citation.properties.note_index, 3);
        assert_eq!(citation.citation_items[0].extra["locator"], "12");
        assert!(citation.extra.contains_key("sortedItems"));

        let back: Citation =
            serde_json::from_str(&serde_json::to_string(&citation).unwrap()).unwrap();
        assert_eq!(back, citation);
    }

    #[test]
    fn test_empty_citation_id_is_absent() {
        let citation: Citation = serde_json::from_str(r#"{"citationID": ""}"#).unwrap();
        assert!(citation.id().is_none());

        let unregistered = Citation::from_items(["a"]);
        let json = serde_json::to_value(&unregistered).unwrap();
        assert!(json.get("citationID").is_none());
    }

    #[test]
    fn test_set_items_keeps_existing_item_data() {
        let mut citation: Citation = serde_json::from_str(
            r#"{"citationItems": [{"id": "a", "locator": "5"}, {"id": "b"}]}"#,
        )
        .unwrap();
        citation.set_items(&["c".into(), "a".into()]);

        let ids: Vec<&str> = citation.item_ids().map(SmolStr::as_str).collect();
        assert_eq!(ids, ["c", "a"]);
        assert_eq!(citation.citation_items[1].extra["locator"], "5");
    }

    #[test]
    fn test_note_numbers_by_mode() {
        assert_eq!(CitationMode::Note.note_number(0), 1);
        assert_eq!(CitationMode::Note.note_number(4), 5);
        assert_eq!(CitationMode::InText.note_number(4), 0);
    }

    #[test]
    fn test_mode_wire_names() {
        let mode: CitationMode = serde_json::from_str(r#""in-text""#).unwrap();
        assert_eq!(mode, CitationMode::InText);
        assert_eq!(serde_json::to_string(&CitationMode::Note).unwrap(), r#""note""#);
    }

    #[test]
    fn test_position_is_a_pair() {
        let pos = CitationPosition::new("c2", 4);
        assert_eq!(serde_json::to_string(&pos).unwrap(), r#"["c2",4]"#);
    }
}
