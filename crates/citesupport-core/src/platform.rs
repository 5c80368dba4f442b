//! Platform abstraction for the document the widget edits.
//!
//! The widget only ever talks to the page through `CitationDom`. The browser
//! implementation walks real `citeme`/`citation` elements; `MemoryDom` keeps
//! the same structure in plain vectors for headless use.
//!
//! Positions are zero-based indices of `citeme` triggers in document order.

use smol_str::SmolStr;

use crate::types::MenuEntry;

/// Error type for DOM operations.
#[derive(Debug, Clone)]
pub struct DomError(pub String);

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DomError {}

impl From<&str> for DomError {
    fn from(s: &str) -> Self {
        DomError(s.to_string())
    }
}

impl From<String> for DomError {
    fn from(s: String) -> Self {
        DomError(s)
    }
}

/// What immediately follows a `citeme` trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// No `citation` element follows the trigger.
    Missing,
    /// A `citation` element without an ID.
    Placeholder,
    /// A `citation` element carrying a citation ID.
    Citation(SmolStr),
}

impl Slot {
    pub fn has_container(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    pub fn citation_id(&self) -> Option<&SmolStr> {
        match self {
            Self::Citation(id) => Some(id),
            _ => None,
        }
    }
}

/// Document operations needed by the synchronizer and the menu controller.
pub trait CitationDom {
    /// Number of `citeme` triggers in the document.
    fn peg_count(&self) -> usize;

    /// The element following the trigger at `pos`.
    ///
    /// Positions past the last trigger report `Slot::Missing`.
    fn slot(&self, pos: usize) -> Slot;

    /// Number of `citation` elements that carry a citation ID, anywhere in
    /// the document.
    fn citation_count(&self) -> usize;

    /// Insert an empty `citation` element immediately after the trigger at `pos`.
    fn insert_placeholder(&mut self, pos: usize) -> Result<(), DomError>;

    /// Remove the `citation` element following the trigger at `pos`, if any.
    fn remove_citation_node(&mut self, pos: usize) -> Result<(), DomError>;

    /// Remove every `citation` element in the document.
    fn remove_all_citation_nodes(&mut self) -> Result<(), DomError>;

    /// Write rendered citation markup into the container after `pos`,
    /// creating the container if needed.
    ///
    /// `note_number` is `Some` for note styles and `None` for in-text styles.
    fn render_citation(
        &mut self,
        pos: usize,
        citation_id: &str,
        html: &str,
        note_number: Option<u32>,
    ) -> Result<(), DomError>;

    /// Replace the bibliography container content. `None` hides it.
    fn render_bibliography(&mut self, entries: Option<&[String]>) -> Result<(), DomError>;

    /// Open the citation menu inside the trigger at `pos`.
    fn open_menu(&mut self, pos: usize, entries: &[MenuEntry]) -> Result<(), DomError>;

    /// Trigger position of the open menu, if a menu is open.
    fn open_menu_position(&self) -> Option<usize>;

    /// Checked item IDs in the open menu, in menu order.
    fn menu_selection(&self) -> Vec<SmolStr>;

    /// Close the citation menu if one is open.
    fn close_menu(&mut self);

    /// Show a blocking message to the user.
    fn alert(&self, message: &str);
}
