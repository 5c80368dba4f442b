//! Document synchronization: keeping `citation` elements in step with state.
//!
//! Each function borrows exactly the parts it reads or writes: the citation
//! state, the document and, for load-time repair, the persistent store.

use std::collections::BTreeSet;

use smol_str::SmolStr;
use thiserror::Error;

use crate::error::CiteError;
use crate::platform::{CitationDom, Slot};
use crate::protocol::{BibliographyData, CitationUpdate, RebuildEntry};
use crate::state::CitationState;
use crate::store::{KeyValueStore, PersistentStore};
use crate::types::{Citation, CitationMode};

/// Why stored state was discarded on load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpoofFailure {
    /// A stored citation had no ID, an ID missing from the stored ID set, or
    /// an ID used twice.
    #[error("invalid stored citation ID {0:?}")]
    InvalidCitationId(Option<SmolStr>),
    /// A stored citation has no `citation` element in the document.
    #[error("citation {0:?} has no position in the document")]
    Unplaced(SmolStr),
    /// Stored citations and document citations differ in number.
    #[error("{stored} stored citations but {nodes} citation nodes in the document")]
    CountMismatch { stored: usize, nodes: usize },
}

/// Result of `spoof_document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoofReport {
    /// `None` when the stored state was adopted.
    pub reset: Option<SpoofFailure>,
    /// Number of empty `citation` placeholders inserted.
    pub placeholders: usize,
}

/// Put the document into the state it would have had at first opening,
/// had it been saved properly.
///
/// Stored citations are adopted only if every check passes; any failure
/// discards all citation state (stored and in the document). Afterwards every
/// `citeme` trigger is followed by a `citation` element.
pub fn spoof_document<D, S>(
    state: &mut CitationState,
    dom: &mut D,
    store: &mut PersistentStore<S>,
) -> Result<SpoofReport, CiteError>
where
    D: CitationDom,
    S: KeyValueStore,
{
    tracing::debug!("spoofDocument()");
    let stored = store.citation_by_index();
    let stored_ids = store.citation_ids();
    state.index_document(dom);

    let reset = match validate_stored(&stored, &stored_ids, state, dom) {
        Ok(()) => {
            let ids: BTreeSet<SmolStr> = stored.iter().filter_map(|c| c.id().cloned()).collect();
            if ids != stored_ids {
                store.set_citation_ids(&ids)?;
            }
            state.replace_citations(stored);
            None
        }
        Err(failure) => {
            tracing::warn!(%failure, "invalid state data, removing citations");
            store.clear_citations()?;
            state.clear();
            dom.remove_all_citation_nodes()?;
            Some(failure)
        }
    };

    let mut placeholders = 0;
    for pos in 0..dom.peg_count() {
        if dom.slot(pos) == Slot::Missing {
            dom.insert_placeholder(pos)?;
            placeholders += 1;
        }
    }

    Ok(SpoofReport {
        reset,
        placeholders,
    })
}

fn validate_stored<D: CitationDom>(
    stored: &[Citation],
    stored_ids: &BTreeSet<SmolStr>,
    state: &CitationState,
    dom: &D,
) -> Result<(), SpoofFailure> {
    let mut seen = BTreeSet::new();
    for citation in stored {
        match citation.id() {
            Some(id) if stored_ids.contains(id) && seen.insert(id) => {}
            other => return Err(SpoofFailure::InvalidCitationId(other.cloned())),
        }
    }

    for id in stored.iter().filter_map(Citation::id) {
        if state.position_of(id).is_none() {
            return Err(SpoofFailure::Unplaced(id.clone()));
        }
    }

    let nodes = dom.citation_count();
    if nodes != stored.len() {
        return Err(SpoofFailure::CountMismatch {
            stored: stored.len(),
            nodes,
        });
    }
    Ok(())
}

/// Convert init rebuild triples into citation updates, indexed in order.
pub fn rebuild_to_updates(rebuild_data: &[RebuildEntry]) -> Vec<CitationUpdate> {
    rebuild_data
        .iter()
        .enumerate()
        .map(|(index, RebuildEntry(id, _, cite_string))| CitationUpdate {
            index,
            cite_string: cite_string.clone(),
            citation_id: Some(id.clone()),
        })
        .collect()
}

/// Remove the `citation` elements of tracked citations not in `keep`.
///
/// Run before an init request so the rebuild starts from a document that
/// holds only citations the engine is about to receive.
pub fn clear_document<D: CitationDom>(
    state: &mut CitationState,
    dom: &mut D,
    keep: &[Citation],
) -> Result<(), CiteError> {
    let kept: BTreeSet<&SmolStr> = keep.iter().filter_map(Citation::id).collect();
    let stale: Vec<SmolStr> = state
        .citation_ids()
        .iter()
        .filter(|id| !kept.contains(id))
        .cloned()
        .collect();
    for id in stale {
        if let Some(pos) = state.untrack(&id) {
            dom.remove_citation_node(pos)?;
        }
    }
    Ok(())
}

/// Write updated citation text into the document.
///
/// Each update is located by its citation ID, or by its index in the
/// registered list when the engine omits the ID. With `is_update` false
/// (full rebuild) tracked citations that are no longer registered lose their
/// element.
pub fn set_citations<D: CitationDom>(
    state: &mut CitationState,
    dom: &mut D,
    mode: CitationMode,
    updates: &[CitationUpdate],
    is_update: bool,
) -> Result<(), CiteError> {
    tracing::debug!(%mode, updates = updates.len(), is_update, "setCitations()");

    if !is_update {
        let registered = state.citation_by_index().to_vec();
        let dropped = state.replace_citations(registered);
        for (id, pos) in dropped {
            tracing::debug!(%id, pos, "removing unregistered citation");
            dom.remove_citation_node(pos)?;
        }
    }

    for update in updates {
        let id = update.citation_id.clone().or_else(|| {
            state
                .citation_by_index()
                .get(update.index)
                .and_then(Citation::id)
                .cloned()
        });
        let Some(id) = id else {
            tracing::warn!(index = update.index, "citation update without a citation ID");
            continue;
        };
        let Some(pos) = state.position_of(&id) else {
            tracing::warn!(%id, "citation update for a citation with no document position");
            continue;
        };
        let note_number = match mode {
            CitationMode::Note => Some(
                state
                    .citation(&id)
                    .map(|c| c.properties.note_index)
                    .filter(|n| *n > 0)
                    .unwrap_or_else(|| mode.note_number(update.index)),
            ),
            CitationMode::InText => None,
        };
        dom.render_citation(pos, &id, &update.cite_string, note_number)?;
    }
    Ok(())
}

/// Replace the rendered bibliography.
pub fn set_bibliography<D: CitationDom>(
    dom: &mut D,
    bibliography: &BibliographyData,
) -> Result<(), CiteError> {
    tracing::debug!(
        entries = bibliography.entries().map(<[String]>::len),
        "setBibliography()"
    );
    dom.render_bibliography(bibliography.entries())?;
    Ok(())
}
