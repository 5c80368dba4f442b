//! In-memory document implementing `CitationDom`.
//!
//! Mirrors the browser DOM contract closely enough to drive the full widget
//! without a browser: triggers in document order, an optional `citation`
//! element after each, stray `citation` elements elsewhere in the page, a
//! bibliography container and at most one open menu.

use std::cell::RefCell;

use smol_str::SmolStr;

use crate::platform::{CitationDom, DomError, Slot};
use crate::types::MenuEntry;

/// A `citation` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCitation {
    pub id: Option<SmolStr>,
    pub html: String,
    pub note_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMenu {
    pub pos: usize,
    pub entries: Vec<MenuEntry>,
}

#[derive(Debug, Default)]
pub struct MemoryDom {
    /// The `citation` element after each trigger.
    pegs: Vec<Option<MemoryCitation>>,
    /// `citation` elements not attached to a trigger.
    stray: Vec<MemoryCitation>,
    bibliography: Option<String>,
    bibliography_hidden: bool,
    menu: Option<MemoryMenu>,
    alerts: RefCell<Vec<String>>,
}

impl MemoryDom {
    /// A document with `count` triggers and no citations.
    pub fn with_pegs(count: usize) -> Self {
        Self {
            pegs: vec![None; count],
            ..Default::default()
        }
    }

    /// Append a trigger, optionally followed by a `citation` element.
    pub fn push_peg(&mut self, citation: Option<MemoryCitation>) -> usize {
        self.pegs.push(citation);
        self.pegs.len() - 1
    }

    /// Attach a `citation` element with `id` after trigger `pos`.
    pub fn set_citation_id(&mut self, pos: usize, id: &str) -> Result<(), DomError> {
        *self.peg_mut(pos)? = Some(MemoryCitation {
            id: Some(id.into()),
            ..Default::default()
        });
        Ok(())
    }

    /// Add a `citation` element that does not follow a trigger.
    pub fn push_stray(&mut self, citation: MemoryCitation) {
        self.stray.push(citation);
    }

    pub fn citation(&self, pos: usize) -> Option<&MemoryCitation> {
        self.pegs.get(pos).and_then(Option::as_ref)
    }

    /// Total `citation` elements, placeholders included.
    pub fn citation_node_count(&self) -> usize {
        self.pegs.iter().flatten().count() + self.stray.len()
    }

    pub fn bibliography(&self) -> Option<&str> {
        self.bibliography.as_deref()
    }

    pub fn bibliography_hidden(&self) -> bool {
        self.bibliography_hidden
    }

    pub fn menu(&self) -> Option<&MemoryMenu> {
        self.menu.as_ref()
    }

    /// Tick or untick a checkbox in the open menu.
    pub fn set_checked(&mut self, item_id: &str, checked: bool) {
        if let Some(menu) = &mut self.menu {
            for entry in menu.entries.iter_mut().filter(|e| e.id == item_id) {
                entry.checked = checked;
            }
        }
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    fn peg_mut(&mut self, pos: usize) -> Result<&mut Option<MemoryCitation>, DomError> {
        self.pegs
            .get_mut(pos)
            .ok_or_else(|| DomError(format!("no citeme trigger at position {pos}")))
    }
}

impl CitationDom for MemoryDom {
    fn peg_count(&self) -> usize {
        self.pegs.len()
    }

    fn slot(&self, pos: usize) -> Slot {
        match self.citation(pos) {
            None => Slot::Missing,
            Some(MemoryCitation { id: Some(id), .. }) if !id.is_empty() => {
                Slot::Citation(id.clone())
            }
            Some(_) => Slot::Placeholder,
        }
    }

    fn citation_count(&self) -> usize {
        self.pegs
            .iter()
            .flatten()
            .chain(self.stray.iter())
            .filter(|c| c.id.as_ref().is_some_and(|id| !id.is_empty()))
            .count()
    }

    fn insert_placeholder(&mut self, pos: usize) -> Result<(), DomError> {
        let peg = self.peg_mut(pos)?;
        if peg.is_some() {
            return Err(DomError(format!("citation already follows trigger {pos}")));
        }
        *peg = Some(MemoryCitation::default());
        Ok(())
    }

    fn remove_citation_node(&mut self, pos: usize) -> Result<(), DomError> {
        *self.peg_mut(pos)? = None;
        Ok(())
    }

    fn remove_all_citation_nodes(&mut self) -> Result<(), DomError> {
        for peg in &mut self.pegs {
            *peg = None;
        }
        self.stray.clear();
        Ok(())
    }

    fn render_citation(
        &mut self,
        pos: usize,
        citation_id: &str,
        html: &str,
        note_number: Option<u32>,
    ) -> Result<(), DomError> {
        *self.peg_mut(pos)? = Some(MemoryCitation {
            id: Some(citation_id.into()),
            html: html.to_string(),
            note_number,
        });
        Ok(())
    }

    fn render_bibliography(&mut self, entries: Option<&[String]>) -> Result<(), DomError> {
        match entries {
            Some(entries) => {
                self.bibliography = Some(entries.concat());
                self.bibliography_hidden = false;
            }
            None => {
                self.bibliography = None;
                self.bibliography_hidden = true;
            }
        }
        Ok(())
    }

    fn open_menu(&mut self, pos: usize, entries: &[MenuEntry]) -> Result<(), DomError> {
        if pos >= self.pegs.len() {
            return Err(DomError(format!("no citeme trigger at position {pos}")));
        }
        self.menu = Some(MemoryMenu {
            pos,
            entries: entries.to_vec(),
        });
        Ok(())
    }

    fn open_menu_position(&self) -> Option<usize> {
        self.menu.as_ref().map(|menu| menu.pos)
    }

    fn menu_selection(&self) -> Vec<SmolStr> {
        self.menu
            .iter()
            .flat_map(|menu| menu.entries.iter())
            .filter(|entry| entry.checked)
            .map(|entry| entry.id.clone())
            .collect()
    }

    fn close_menu(&mut self) {
        self.menu = None;
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }
}
