//! In-memory citation state owned by a `CiteSupport` instance.
//!
//! Holds the registered citations in document order, the derived ID set and
//! the explicit citation ID → trigger position map. The ID set is recomputed
//! whenever the list is replaced, so it always equals the IDs in the list.

use std::collections::{BTreeSet, HashMap};

use smol_str::SmolStr;

use crate::platform::CitationDom;
use crate::types::{Citation, CitationMode, CitationPosition};

#[derive(Debug, Clone, Default)]
pub struct CitationState {
    mode: CitationMode,
    citation_by_index: Vec<Citation>,
    citation_ids: BTreeSet<SmolStr>,
    id_to_pos: HashMap<SmolStr, usize>,
}

impl CitationState {
    pub fn new(mode: CitationMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> CitationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CitationMode) {
        self.mode = mode;
    }

    pub fn citation_by_index(&self) -> &[Citation] {
        &self.citation_by_index
    }

    pub fn citation_ids(&self) -> &BTreeSet<SmolStr> {
        &self.citation_ids
    }

    pub fn contains(&self, citation_id: &str) -> bool {
        self.citation_ids.contains(citation_id)
    }

    pub fn citation(&self, citation_id: &str) -> Option<&Citation> {
        self.citation_by_index
            .iter()
            .find(|c| c.id().is_some_and(|id| id == citation_id))
    }

    pub fn is_empty(&self) -> bool {
        self.citation_by_index.is_empty()
    }

    pub fn len(&self) -> usize {
        self.citation_by_index.len()
    }

    /// Replace the citation list, returning the tracked IDs (with their
    /// positions) that are no longer registered.
    ///
    /// Dropped IDs are untracked.
    pub fn replace_citations(&mut self, citations: Vec<Citation>) -> Vec<(SmolStr, usize)> {
        self.citation_ids = citations.iter().filter_map(|c| c.id().cloned()).collect();
        self.citation_by_index = citations;

        let mut dropped: Vec<(SmolStr, usize)> = self
            .id_to_pos
            .iter()
            .filter(|(id, _)| !self.citation_ids.contains(*id))
            .map(|(id, pos)| (id.clone(), *pos))
            .collect();
        dropped.sort_by_key(|(_, pos)| *pos);
        for (id, _) in &dropped {
            self.id_to_pos.remove(id);
        }
        dropped
    }

    /// Forget every citation and position.
    pub fn clear(&mut self) {
        self.citation_by_index.clear();
        self.citation_ids.clear();
        self.id_to_pos.clear();
    }

    pub fn position_of(&self, citation_id: &str) -> Option<usize> {
        self.id_to_pos.get(citation_id).copied()
    }

    pub fn id_at(&self, pos: usize) -> Option<&SmolStr> {
        self.id_to_pos
            .iter()
            .find_map(|(id, p)| (*p == pos).then_some(id))
    }

    pub fn track(&mut self, citation_id: SmolStr, pos: usize) {
        self.id_to_pos.insert(citation_id, pos);
    }

    pub fn untrack(&mut self, citation_id: &str) -> Option<usize> {
        self.id_to_pos.remove(citation_id)
    }

    pub fn is_tracked(&self, citation_id: &str) -> bool {
        self.id_to_pos.contains_key(citation_id)
    }

    /// Registered IDs that have no document position yet.
    pub fn untracked_ids(&self) -> Vec<SmolStr> {
        self.citation_by_index
            .iter()
            .filter_map(Citation::id)
            .filter(|id| !self.id_to_pos.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Rebuild the position map from the `citation` elements in the document.
    ///
    /// When an ID appears after more than one trigger, the first wins.
    pub fn index_document<D: CitationDom>(&mut self, dom: &D) {
        self.id_to_pos.clear();
        for pos in 0..dom.peg_count() {
            if let Some(id) = dom.slot(pos).citation_id() {
                self.id_to_pos.entry(id.clone()).or_insert(pos);
            }
        }
        tracing::debug!(tracked = self.id_to_pos.len(), "indexed document citations");
    }

    /// `[citationID, noteNumber]` pairs for `ids`, numbered from `first_index`.
    pub fn positions_from(&self, ids: &[SmolStr], first_index: usize) -> Vec<CitationPosition> {
        ids.iter()
            .enumerate()
            .map(|(offset, id)| {
                CitationPosition::new(id.clone(), self.mode.note_number(first_index + offset))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(id: &str) -> Citation {
        Citation {
            citation_id: Some(id.into()),
            ..Citation::from_items(["item"])
        }
    }

    #[test]
    fn test_ids_follow_list() {
        let mut state = CitationState::new(CitationMode::Note);
        state.replace_citations(vec![registered("c1"), registered("c2"), Citation::default()]);
        assert_eq!(state.citation_ids().len(), 2);
        assert!(state.contains("c1"));
        assert!(state.contains("c2"));

        state.replace_citations(vec![registered("c2")]);
        assert!(!state.contains("c1"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_replace_reports_dropped_positions() {
        let mut state = CitationState::new(CitationMode::Note);
        state.replace_citations(vec![registered("c1"), registered("c2"), registered("c3")]);
        state.track("c1".into(), 0);
        state.track("c2".into(), 2);
        state.track("c3".into(), 5);

        let dropped = state.replace_citations(vec![registered("c2")]);
        assert_eq!(
            dropped,
            vec![(SmolStr::new("c1"), 0), (SmolStr::new("c3"), 5)]
        );
        assert_eq!(state.position_of("c2"), Some(2));
        assert_eq!(state.position_of("c1"), None);
    }

    #[test]
    fn test_untracked_ids() {
        let mut state = CitationState::new(CitationMode::Note);
        state.replace_citations(vec![registered("c1"), registered("new")]);
        state.track("c1".into(), 0);
        assert_eq!(state.untracked_ids(), vec![SmolStr::new("new")]);
        assert_eq!(state.id_at(0).map(SmolStr::as_str), Some("c1"));
    }

    #[test]
    fn test_positions_in_text_mode_are_zero() {
        let state = CitationState::new(CitationMode::InText);
        let positions = state.positions_from(&["a".into(), "b".into()], 3);
        assert!(positions.iter().all(|p| p.note_number() == 0));

        let state = CitationState::new(CitationMode::Note);
        let positions = state.positions_from(&["a".into(), "b".into()], 3);
        assert_eq!(positions, vec![CitationPosition::new("a", 4), CitationPosition::new("b", 5)]);
    }
}
