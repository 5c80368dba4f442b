//! The composed citation widget.
//!
//! `CiteSupport` owns the citation state and the three platform handles and
//! wires the engine proxy, the document synchronizer and the menu controller
//! together. Every entry point runs on the UI thread; engine responses come
//! back through `handle_response`.

use serde_json::Value;
use smol_str::SmolStr;

use crate::config::CiteConfig;
use crate::engine::{EngineChannel, EngineProxy, Submission};
use crate::error::CiteError;
use crate::menu::{MenuAction, MenuEvent, current_citation_info, resolve_menu_action};
use crate::platform::{CitationDom, DomError, Slot};
use crate::protocol::{EngineCommand, EngineResponse};
use crate::state::CitationState;
use crate::store::{KeyValueStore, PersistentStore};
use crate::sync::{self, SpoofReport};
use crate::types::{Citation, CitationMode, CitationPosition, MenuEntry};

/// Edit sent to the engine and awaiting its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingEdit {
    /// Trigger the edited citation belongs to.
    pos: usize,
}

pub struct CiteSupport<D, S, C> {
    config: CiteConfig,
    state: CitationState,
    dom: D,
    store: PersistentStore<S>,
    engine: EngineProxy<C>,
    pending: Option<PendingEdit>,
}

impl<D, S, C> CiteSupport<D, S, C>
where
    D: CitationDom,
    S: KeyValueStore,
    C: EngineChannel,
{
    pub fn new(config: CiteConfig, dom: D, storage: S, channel: C) -> Self {
        Self {
            state: CitationState::new(config.mode),
            config,
            dom,
            store: PersistentStore::new(storage),
            engine: EngineProxy::new(channel),
            pending: None,
        }
    }

    pub fn config(&self) -> &CiteConfig {
        &self.config
    }

    pub fn state(&self) -> &CitationState {
        &self.state
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn store(&self) -> &PersistentStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PersistentStore<S> {
        &mut self.store
    }

    pub fn engine(&self) -> &EngineProxy<C> {
        &self.engine
    }

    /// Give back the document and storage, e.g. to reload over them.
    pub fn into_parts(self) -> (D, S) {
        (self.dom, self.store.into_inner())
    }

    pub fn processor_ready(&self) -> bool {
        self.engine.processor_ready()
    }

    pub fn citation_by_index(&self) -> &[Citation] {
        self.state.citation_by_index()
    }

    pub fn mode(&self) -> CitationMode {
        self.state.mode()
    }

    /// Validate stored state against the document and repair placeholders.
    pub fn spoof_document(&mut self) -> Result<SpoofReport, CiteError> {
        sync::spoof_document(&mut self.state, &mut self.dom, &mut self.store)
    }

    /// Initialize the engine with the stored style, locale and citations.
    pub fn init_document(&mut self) -> Result<Submission, CiteError> {
        tracing::debug!("initDocument()");
        let (style, locale) = self.style_and_locale();
        let citations = self.state.citation_by_index().to_vec();
        self.call_init_processor(style, locale, citations)
    }

    fn style_and_locale(&self) -> (SmolStr, SmolStr) {
        (
            self.store.default_style_or(&self.config.default_style),
            self.store.default_locale_or(&self.config.default_locale),
        )
    }

    /// Send `initProcessor`, first removing document citations that will
    /// not be rebuilt.
    pub fn call_init_processor(
        &mut self,
        style_name: SmolStr,
        locale_name: SmolStr,
        citation_by_index: Vec<Citation>,
    ) -> Result<Submission, CiteError> {
        if self.engine.is_busy() {
            tracing::warn!("engine busy, dropping initProcessor");
            return Ok(Submission::Dropped);
        }
        sync::clear_document(&mut self.state, &mut self.dom, &citation_by_index)?;
        let submission =
            self.engine
                .init_processor(style_name, locale_name, citation_by_index.clone())?;
        if submission.is_sent() {
            self.state.replace_citations(citation_by_index);
        }
        Ok(submission)
    }

    pub fn call_register_citation(
        &mut self,
        citation: Citation,
        pre_citations: Vec<CitationPosition>,
        post_citations: Vec<CitationPosition>,
    ) -> Result<Submission, CiteError> {
        self.engine
            .register_citation(citation, pre_citations, post_citations)
    }

    /// Open the citation menu on the trigger at `pos`.
    ///
    /// Any open menu is closed first. A placeholder `citation` element is
    /// added after the trigger if none follows it.
    pub fn show_menu(&mut self, pos: usize) -> Result<(), CiteError> {
        tracing::debug!(pos, "showMenu()");
        self.dom.close_menu();
        if pos >= self.dom.peg_count() {
            return Err(DomError(format!("no citeme trigger at position {pos}")).into());
        }

        let slot = self.dom.slot(pos);
        if slot == Slot::Missing {
            self.dom.insert_placeholder(pos)?;
        }
        let current: Vec<&SmolStr> = slot
            .citation_id()
            .and_then(|id| self.state.citation(id))
            .map(|citation| citation.item_ids().collect())
            .unwrap_or_default();

        let entries: Vec<MenuEntry> = self
            .config
            .items
            .iter()
            .map(|item| MenuEntry {
                id: item.id.clone(),
                title: item.title.clone(),
                checked: current.contains(&&item.id),
            })
            .collect();
        self.dom.open_menu(pos, &entries)?;
        Ok(())
    }

    /// Route a menu interaction.
    ///
    /// Returns the engine submission when the event confirmed an edit that
    /// needed the engine.
    pub fn handle_menu_select(&mut self, event: MenuEvent) -> Result<Option<Submission>, CiteError> {
        tracing::debug!(?event, "handleMenuSelect()");
        match event {
            MenuEvent::Open(pos) => {
                self.show_menu(pos)?;
                Ok(None)
            }
            MenuEvent::Confirm => self.citation_add_or_edit_handler(),
            MenuEvent::Dismiss => {
                self.dom.close_menu();
                Ok(None)
            }
        }
    }

    /// Apply the open menu's selection to its citation.
    pub fn citation_add_or_edit_handler(&mut self) -> Result<Option<Submission>, CiteError> {
        tracing::debug!("citationAddOrEditHandler()");
        let Some(info) = current_citation_info(&self.dom, &self.state) else {
            tracing::warn!("no citation menu open");
            return Ok(None);
        };
        let selection = self.dom.menu_selection();

        let action = resolve_menu_action(&info, &selection, &self.state);
        let pos = action.pos();
        let submission = match action {
            MenuAction::DiscardPlaceholder { pos } => {
                if self.dom.slot(pos).has_container() {
                    self.dom.remove_citation_node(pos)?;
                }
                self.dom.close_menu();
                return Ok(None);
            }
            MenuAction::Register {
                citation,
                pre,
                post,
                ..
            } => self.call_register_citation(citation, pre, post)?,
            MenuAction::Reinitialize { citation_id, .. } => {
                tracing::debug!(%citation_id, "removing last citation");
                let (style, locale) = self.style_and_locale();
                self.call_init_processor(style, locale, Vec::new())?
            }
            MenuAction::Remove {
                citation_id,
                refile,
                post,
                ..
            } => {
                tracing::debug!(%citation_id, "removing citation");
                self.call_register_citation(refile, Vec::new(), post)?
            }
        };

        match submission {
            Submission::Sent => self.pending = Some(PendingEdit { pos }),
            Submission::Dropped => tracing::warn!(pos, "edit dropped, menu left open"),
        }
        Ok(Some(submission))
    }

    /// Apply a message from the engine worker.
    ///
    /// Engine failures are shown to the user and returned as errors.
    pub fn handle_response(&mut self, message: Value) -> Result<EngineCommand, CiteError> {
        let pending = self.pending.take();
        let response = match self.engine.accept(message) {
            Ok(response) => response,
            Err(e) => {
                if let CiteError::Engine(msg) = &e {
                    self.dom.alert(&format!("ERROR: {msg}"));
                }
                return Err(e);
            }
        };
        let command = response.command();

        match response {
            EngineResponse::InitProcessor {
                xclass,
                rebuild_data,
                bibliography_data,
            } => {
                tracing::debug!(%xclass, rebuilt = rebuild_data.len(), "initProcessor response");
                self.state.set_mode(xclass);
                let updates = sync::rebuild_to_updates(&rebuild_data);
                sync::set_citations(&mut self.state, &mut self.dom, xclass, &updates, false)?;
                sync::set_bibliography(&mut self.dom, &bibliography_data)?;
            }
            EngineResponse::RegisterCitation {
                citation_by_index,
                citation_data,
                bibliography_data,
            } => {
                tracing::debug!(
                    citations = citation_by_index.len(),
                    updated = citation_data.len(),
                    "registerCitation response"
                );
                for (id, pos) in self.state.replace_citations(citation_by_index) {
                    tracing::debug!(%id, pos, "citation removed");
                    self.dom.remove_citation_node(pos)?;
                }
                let untracked = self.state.untracked_ids();
                match pending {
                    Some(PendingEdit { pos }) => {
                        if untracked.len() > 1 {
                            tracing::warn!(?untracked, "several new citations for one edit");
                        }
                        for id in untracked {
                            self.state.track(id, pos);
                        }
                    }
                    None if !untracked.is_empty() => {
                        tracing::warn!(?untracked, "new citations with no pending edit");
                    }
                    None => {}
                }
                let mode = self.state.mode();
                sync::set_citations(&mut self.state, &mut self.dom, mode, &citation_data, true)?;
                sync::set_bibliography(&mut self.dom, &bibliography_data)?;
            }
        }

        self.store
            .save(self.state.citation_by_index(), self.state.citation_ids())?;
        self.dom.close_menu();
        Ok(command)
    }

    /// Settle the outstanding request after a worker message that could not
    /// be read at all.
    pub fn handle_channel_error(&mut self, error: CiteError) -> CiteError {
        self.pending = None;
        self.engine.reject(error)
    }
}
