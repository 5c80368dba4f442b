//! Persistent store for widget state.
//!
//! Values are JSON-encoded strings in a flat key/value store (`localStorage`
//! in the browser). Reads never fail: a missing or unparseable value falls
//! back to the key's default and the fallback is logged.
//!
//! ## Keys
//!
//! - `defaultLocale`: locale name, default `en-US`
//! - `defaultStyle`: style ID, default `jm-indigobook-law-review`
//! - `citationByIndex`: citation array in document order, default `[]`
//! - `citationIDs`: object mapping each citation ID to `true`, default `{}`

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde::de::DeserializeOwned;
use smol_str::SmolStr;

use crate::config::{DEFAULT_LOCALE, DEFAULT_STYLE};
use crate::error::CiteError;
use crate::types::Citation;

pub const DEFAULT_LOCALE_KEY: &str = "defaultLocale";
pub const DEFAULT_STYLE_KEY: &str = "defaultStyle";
pub const CITATION_BY_INDEX_KEY: &str = "citationByIndex";
pub const CITATION_IDS_KEY: &str = "citationIDs";

/// String key/value storage backend.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), CiteError>;

    fn remove_item(&mut self, key: &str);
}

/// In-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), CiteError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}

/// Typed access to the persisted widget state.
#[derive(Debug, Clone, Default)]
pub struct PersistentStore<S> {
    storage: S,
}

impl<S: KeyValueStore> PersistentStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    fn safe_get<T: DeserializeOwned>(&self, key: &str, fallback: impl FnOnce() -> T) -> T {
        let Some(raw) = self.storage.get_item(key).filter(|raw| !raw.is_empty()) else {
            tracing::debug!(key, "no value in storage, using default");
            return fallback();
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, value = %raw, error = %e, "JSON parse error in storage, using default");
                fallback()
            }
        }
    }

    fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), CiteError> {
        let json = serde_json::to_string(value)?;
        self.storage.set_item(key, &json)
    }

    pub fn default_locale(&self) -> SmolStr {
        self.default_locale_or(DEFAULT_LOCALE)
    }

    /// Stored locale, or `fallback` when none is stored.
    pub fn default_locale_or(&self, fallback: &str) -> SmolStr {
        self.safe_get(DEFAULT_LOCALE_KEY, || SmolStr::new(fallback))
    }

    pub fn set_default_locale(&mut self, locale: &str) -> Result<(), CiteError> {
        self.put(DEFAULT_LOCALE_KEY, locale)
    }

    pub fn default_style(&self) -> SmolStr {
        self.default_style_or(DEFAULT_STYLE)
    }

    /// Stored style, or `fallback` when none is stored.
    pub fn default_style_or(&self, fallback: &str) -> SmolStr {
        self.safe_get(DEFAULT_STYLE_KEY, || SmolStr::new(fallback))
    }

    pub fn set_default_style(&mut self, style: &str) -> Result<(), CiteError> {
        self.put(DEFAULT_STYLE_KEY, style)
    }

    pub fn citation_by_index(&self) -> Vec<Citation> {
        self.safe_get(CITATION_BY_INDEX_KEY, Vec::new)
    }

    pub fn set_citation_by_index(&mut self, citations: &[Citation]) -> Result<(), CiteError> {
        self.put(CITATION_BY_INDEX_KEY, citations)
    }

    pub fn citation_ids(&self) -> BTreeSet<SmolStr> {
        let ids: BTreeMap<SmolStr, bool> = self.safe_get(CITATION_IDS_KEY, BTreeMap::new);
        ids.into_iter()
            .filter_map(|(id, known)| known.then_some(id))
            .collect()
    }

    pub fn set_citation_ids<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a SmolStr>,
    ) -> Result<(), CiteError> {
        let ids: BTreeMap<&SmolStr, bool> = ids.into_iter().map(|id| (id, true)).collect();
        self.put(CITATION_IDS_KEY, &ids)
    }

    /// Persist the citation list and its ID set together.
    pub fn save(
        &mut self,
        citations: &[Citation],
        ids: &BTreeSet<SmolStr>,
    ) -> Result<(), CiteError> {
        self.set_citation_by_index(citations)?;
        self.set_citation_ids(ids)
    }

    /// Reset both citation keys to their empty values.
    pub fn clear_citations(&mut self) -> Result<(), CiteError> {
        self.save(&[], &BTreeSet::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CitationItem;

    fn citation(id: &str, items: &[&str]) -> Citation {
        Citation {
            citation_id: Some(id.into()),
            citation_items: items.iter().map(|i| CitationItem::new(*i)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_when_empty() {
        let store = PersistentStore::new(MemoryStore::new());
        assert_eq!(store.default_locale(), "en-US");
        assert_eq!(store.default_style(), "jm-indigobook-law-review");
        assert!(store.citation_by_index().is_empty());
        assert!(store.citation_ids().is_empty());
    }

    #[test]
    fn test_malformed_json_falls_back() {
        let mut backend = MemoryStore::new();
        backend.set_item(CITATION_BY_INDEX_KEY, "[{not json").unwrap();
        backend.set_item(DEFAULT_LOCALE_KEY, "fr-FR").unwrap();
        let store = PersistentStore::new(backend);

        assert!(store.citation_by_index().is_empty());
        // Unquoted strings are not JSON.
        assert_eq!(store.default_locale(), DEFAULT_LOCALE);
    }

    #[test]
    fn test_citation_round_trip() {
        let mut store = PersistentStore::new(MemoryStore::new());
        let mut second = citation("c2", &["b", "c"]);
        second.properties.note_index = 2;
        second
            .extra
            .insert("sortedItems".into(), serde_json::json!([["b"], ["c"]]));
        let citations = vec![citation("c1", &["a"]), second];

        store.set_citation_by_index(&citations).unwrap();

        let reloaded = PersistentStore::new(store.storage().clone());
        assert_eq!(reloaded.citation_by_index(), citations);
    }

    #[test]
    fn test_citation_ids_stored_as_object() {
        let mut store = PersistentStore::new(MemoryStore::new());
        let ids: BTreeSet<SmolStr> = ["c1".into(), "c2".into()].into();
        store.set_citation_ids(&ids).unwrap();

        assert_eq!(
            store.storage().get_item(CITATION_IDS_KEY).as_deref(),
            Some(r#"{"c1":true,"c2":true}"#)
        );
        assert_eq!(store.citation_ids(), ids);
    }

    #[test]
    fn test_false_ids_are_not_known() {
        let mut backend = MemoryStore::new();
        backend
            .set_item(CITATION_IDS_KEY, r#"{"c1":true,"c2":false}"#)
            .unwrap();
        let store = PersistentStore::new(backend);
        assert_eq!(store.citation_ids(), BTreeSet::from([SmolStr::new("c1")]));
    }

    #[test]
    fn test_clear_citations() {
        let mut store = PersistentStore::new(MemoryStore::new());
        let citations = vec![citation("c1", &["a"])];
        let ids = BTreeSet::from([SmolStr::new("c1")]);
        store.save(&citations, &ids).unwrap();

        store.clear_citations().unwrap();
        assert!(store.citation_by_index().is_empty());
        assert!(store.citation_ids().is_empty());
    }

    #[test]
    fn test_style_and_locale_setters() {
        let mut store = PersistentStore::new(MemoryStore::new());
        store.set_default_locale("de-DE").unwrap();
        store.set_default_style("chicago-fullnote-bibliography").unwrap();
        assert_eq!(store.default_locale(), "de-DE");
        assert_eq!(store.default_style(), "chicago-fullnote-bibliography");
        assert_eq!(store.default_style_or("apa"), "chicago-fullnote-bibliography");
        assert_eq!(
            PersistentStore::new(MemoryStore::new()).default_style_or("apa"),
            "apa"
        );
    }
}
