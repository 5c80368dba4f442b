//! Citation menu: what the open menu refers to and what confirming it does.

use smol_str::SmolStr;

use crate::platform::CitationDom;
use crate::state::CitationState;
use crate::types::{Citation, CitationPosition};

/// User interaction routed to the menu controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    /// Click on the `citeme` trigger at this position.
    Open(usize),
    /// Click on the menu's save button.
    Confirm,
    /// Click anywhere outside the menu.
    Dismiss,
}

/// The trigger whose menu is open and the citations around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationInfo {
    pub pos: usize,
    /// ID of the citation after the trigger, if it is registered.
    pub citation_id: Option<SmolStr>,
    /// Index of that citation in the registered list.
    pub citation_index: Option<usize>,
    /// Whether a `citation` element follows the trigger.
    pub has_container: bool,
    /// Registered citations before the trigger, in document order.
    pub pre: Vec<SmolStr>,
    /// Registered citations after the trigger, in document order.
    pub post: Vec<SmolStr>,
}

impl CitationInfo {
    /// Citations other than the one at this trigger.
    pub fn others(&self) -> usize {
        self.pre.len() + self.post.len()
    }
}

/// Describe the trigger whose menu is open, or `None` if no menu is open.
pub fn current_citation_info<D: CitationDom>(dom: &D, state: &CitationState) -> Option<CitationInfo> {
    tracing::debug!("getCurrentCitationInfo()");
    let pos = dom.open_menu_position()?;
    let slot = dom.slot(pos);
    let citation_id = slot
        .citation_id()
        .filter(|id| state.contains(id))
        .cloned();
    let citation_index = citation_id.as_ref().and_then(|id| {
        state
            .citation_by_index()
            .iter()
            .position(|c| c.id() == Some(id))
    });

    let mut placed: Vec<(usize, &SmolStr)> = state
        .citation_by_index()
        .iter()
        .filter_map(Citation::id)
        .filter_map(|id| state.position_of(id).map(|p| (p, id)))
        .collect();
    placed.sort_by_key(|(p, _)| *p);

    let mut pre = Vec::new();
    let mut post = Vec::new();
    for (p, id) in placed {
        if p < pos {
            pre.push(id.clone());
        } else if p > pos {
            post.push(id.clone());
        }
    }

    Some(CitationInfo {
        pos,
        citation_id,
        citation_index,
        has_container: slot.has_container(),
        pre,
        post,
    })
}

/// What confirming the menu should do.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    /// Nothing selected for a new citation: drop the placeholder.
    DiscardPlaceholder { pos: usize },
    /// Register a new or edited citation.
    Register {
        pos: usize,
        citation: Citation,
        pre: Vec<CitationPosition>,
        post: Vec<CitationPosition>,
    },
    /// The only citation lost all its items: start over with an empty list.
    Reinitialize { pos: usize, citation_id: SmolStr },
    /// A citation lost all its items while others remain.
    ///
    /// The first remaining citation is refiled with everything else as its
    /// successors, which leaves the removed one out of the engine's registry.
    Remove {
        pos: usize,
        citation_id: SmolStr,
        refile: Citation,
        post: Vec<CitationPosition>,
    },
}

impl MenuAction {
    pub fn pos(&self) -> usize {
        match self {
            Self::DiscardPlaceholder { pos }
            | Self::Register { pos, .. }
            | Self::Reinitialize { pos, .. }
            | Self::Remove { pos, .. } => *pos,
        }
    }
}

/// Decide the action for a confirmed menu with `selection` checked.
pub fn resolve_menu_action(
    info: &CitationInfo,
    selection: &[SmolStr],
    state: &CitationState,
) -> MenuAction {
    let existing = info.citation_id.as_ref().and_then(|id| state.citation(id));

    match (existing, selection.is_empty()) {
        (None, true) => MenuAction::DiscardPlaceholder { pos: info.pos },
        (None, false) => register(info, Citation::from_items(selection.iter().cloned()), state),
        (Some(citation), false) => {
            let mut citation = citation.clone();
            citation.set_items(selection);
            register(info, citation, state)
        }
        (Some(citation), true) => {
            let citation_id = citation.id().cloned().unwrap_or_default();
            let remaining: Vec<&SmolStr> = info.pre.iter().chain(info.post.iter()).collect();
            let Some((first, rest)) = remaining.split_first() else {
                return MenuAction::Reinitialize {
                    pos: info.pos,
                    citation_id,
                };
            };
            let mut refile = state
                .citation(first)
                .cloned()
                .unwrap_or_else(|| Citation {
                    citation_id: Some((*first).clone()),
                    ..Default::default()
                });
            refile.properties.note_index = state.mode().note_number(0);
            let rest: Vec<SmolStr> = rest.iter().map(|id| (*id).clone()).collect();
            MenuAction::Remove {
                pos: info.pos,
                citation_id,
                refile,
                post: state.positions_from(&rest, 1),
            }
        }
    }
}

fn register(info: &CitationInfo, mut citation: Citation, state: &CitationState) -> MenuAction {
    let index = info.pre.len();
    citation.properties.note_index = state.mode().note_number(index);
    MenuAction::Register {
        pos: info.pos,
        citation,
        pre: state.positions_from(&info.pre, 0),
        post: state.positions_from(&info.post, index + 1),
    }
}
