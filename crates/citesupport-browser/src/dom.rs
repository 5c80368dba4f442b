//! `CitationDom` over the live page.
//!
//! # DOM contract
//!
//! - Triggers are elements with class `citeme`, indexed in document order.
//! - A trigger may be immediately followed by a sibling with class
//!   `citation`; its `id` is the citation ID (empty for a placeholder).
//! - Rendered citations carry `note` or `in-text` as an extra class, and note
//!   citations a `data-note-number` attribute.
//! - The bibliography is rendered into `#bibliography`.
//! - The menu is `#cite-menu`, appended inside its trigger. It holds one
//!   checkbox per reference item (`value` is the item ID) and a
//!   `.cite-menu-save` button.

use citesupport_core::{CitationDom, DomError, MenuEntry, SmolStr, Slot};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlCollection, HtmlElement, HtmlInputElement};

pub const TRIGGER_CLASS: &str = "citeme";
pub const CITATION_CLASS: &str = "citation";
pub const BIBLIOGRAPHY_ID: &str = "bibliography";
pub const MENU_ID: &str = "cite-menu";
pub const MENU_SAVE_CLASS: &str = "cite-menu-save";

/// Browser implementation of `CitationDom`.
///
/// Holds the live `citeme` collection, so triggers added to the page later
/// are picked up without rescanning.
pub struct BrowserDom {
    document: Document,
    triggers: HtmlCollection,
}

impl BrowserDom {
    /// Bind to the window's document.
    pub fn new() -> Result<Self, DomError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("no document available")?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: Document) -> Self {
        let triggers = document.get_elements_by_class_name(TRIGGER_CLASS);
        Self { document, triggers }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn trigger(&self, pos: usize) -> Option<Element> {
        self.triggers.item(u32::try_from(pos).ok()?)
    }

    /// Position of `element` among the triggers.
    pub fn trigger_position(&self, element: &Element) -> Option<usize> {
        let element: &web_sys::Node = element;
        (0..self.triggers.length())
            .find(|&i| {
                self.triggers
                    .item(i)
                    .is_some_and(|t| t.is_same_node(Some(element)))
            })
            .map(|i| i as usize)
    }

    fn existing_trigger(&self, pos: usize) -> Result<Element, DomError> {
        self.trigger(pos)
            .ok_or_else(|| DomError(format!("no citeme trigger at position {pos}")))
    }

    /// The `citation` element right after trigger `pos`.
    pub fn citation_element(&self, pos: usize) -> Option<Element> {
        self.trigger(pos)?
            .next_element_sibling()
            .filter(|sib| sib.class_list().contains(CITATION_CLASS))
    }

    fn create_element(&self, tag: &str) -> Result<Element, DomError> {
        Ok(self
            .document
            .create_element(tag)
            .map_err(|e| format!("create_element({tag}) failed: {:?}", e))?)
    }

    fn menu(&self) -> Option<Element> {
        self.document.get_element_by_id(MENU_ID)
    }

    fn build_menu(&self, entries: &[MenuEntry]) -> Result<Element, DomError> {
        let menu = self.create_element("div")?;
        menu.set_id(MENU_ID);

        for entry in entries {
            let label = self.create_element("label")?;
            let input: HtmlInputElement = self
                .create_element("input")?
                .dyn_into()
                .map_err(|_| "input is not an HtmlInputElement")?;
            input.set_type("checkbox");
            input.set_value(&entry.id);
            input.set_checked(entry.checked);
            label
                .append_child(&input)
                .map_err(|e| format!("append_child failed: {:?}", e))?;
            label
                .append_child(&self.document.create_text_node(&entry.title))
                .map_err(|e| format!("append_child failed: {:?}", e))?;
            menu.append_child(&label)
                .map_err(|e| format!("append_child failed: {:?}", e))?;
        }

        let save = self.create_element("button")?;
        save.set_class_name(MENU_SAVE_CLASS);
        save.set_text_content(Some("Save"));
        menu.append_child(&save)
            .map_err(|e| format!("append_child failed: {:?}", e))?;
        Ok(menu)
    }
}

impl CitationDom for BrowserDom {
    fn peg_count(&self) -> usize {
        self.triggers.length() as usize
    }

    fn slot(&self, pos: usize) -> Slot {
        match self.citation_element(pos) {
            None => Slot::Missing,
            Some(el) => {
                let id = el.id();
                if id.is_empty() {
                    Slot::Placeholder
                } else {
                    Slot::Citation(SmolStr::new(id))
                }
            }
        }
    }

    fn citation_count(&self) -> usize {
        let nodes = self.document.get_elements_by_class_name(CITATION_CLASS);
        (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter(|el| !el.id().is_empty())
            .count()
    }

    fn insert_placeholder(&mut self, pos: usize) -> Result<(), DomError> {
        let trigger = self.existing_trigger(pos)?;
        if self.citation_element(pos).is_some() {
            return Err(DomError(format!("citation already follows trigger {pos}")));
        }
        let span = self.create_element("span")?;
        span.set_class_name(CITATION_CLASS);
        trigger
            .insert_adjacent_element("afterend", &span)
            .map_err(|e| format!("insert_adjacent_element failed: {:?}", e))?;
        Ok(())
    }

    fn remove_citation_node(&mut self, pos: usize) -> Result<(), DomError> {
        if let Some(el) = self.citation_element(pos) {
            el.remove();
        }
        Ok(())
    }

    fn remove_all_citation_nodes(&mut self) -> Result<(), DomError> {
        // Live collection: shrinks as elements go.
        let nodes = self.document.get_elements_by_class_name(CITATION_CLASS);
        while let Some(el) = nodes.item(0) {
            el.remove();
        }
        Ok(())
    }

    fn render_citation(
        &mut self,
        pos: usize,
        citation_id: &str,
        html: &str,
        note_number: Option<u32>,
    ) -> Result<(), DomError> {
        let el = match self.citation_element(pos) {
            Some(el) => el,
            None => {
                self.insert_placeholder(pos)?;
                self.citation_element(pos)
                    .ok_or_else(|| DomError(format!("no citation after trigger {pos}")))?
            }
        };
        el.set_id(citation_id);
        el.set_inner_html(html);
        match note_number {
            Some(n) => {
                el.set_class_name(&format!("{CITATION_CLASS} note"));
                el.set_attribute("data-note-number", &n.to_string())
                    .map_err(|e| format!("set_attribute failed: {:?}", e))?;
            }
            None => {
                el.set_class_name(&format!("{CITATION_CLASS} in-text"));
                el.remove_attribute("data-note-number")
                    .map_err(|e| format!("remove_attribute failed: {:?}", e))?;
            }
        }
        Ok(())
    }

    fn render_bibliography(&mut self, entries: Option<&[String]>) -> Result<(), DomError> {
        let Some(container) = self.document.get_element_by_id(BIBLIOGRAPHY_ID) else {
            tracing::debug!("no #bibliography container, skipping");
            return Ok(());
        };
        let container: HtmlElement = container
            .dyn_into()
            .map_err(|_| "#bibliography is not an HtmlElement")?;
        match entries {
            Some(entries) => {
                container.set_inner_html(&entries.concat());
                container.set_hidden(false);
            }
            None => {
                container.set_inner_html("");
                container.set_hidden(true);
            }
        }
        Ok(())
    }

    fn open_menu(&mut self, pos: usize, entries: &[MenuEntry]) -> Result<(), DomError> {
        let trigger = self.existing_trigger(pos)?;
        let menu = self.build_menu(entries)?;
        trigger
            .append_child(&menu)
            .map_err(|e| format!("append_child failed: {:?}", e))?;
        Ok(())
    }

    fn open_menu_position(&self) -> Option<usize> {
        let parent = self.menu()?.parent_element()?;
        self.trigger_position(&parent)
    }

    fn menu_selection(&self) -> Vec<SmolStr> {
        let Some(menu) = self.menu() else {
            return Vec::new();
        };
        let inputs = menu.get_elements_by_tag_name("input");
        (0..inputs.length())
            .filter_map(|i| inputs.item(i))
            .filter_map(|el| el.dyn_into::<HtmlInputElement>().ok())
            .filter(|input| input.checked())
            .map(|input| SmolStr::new(input.value()))
            .collect()
    }

    fn close_menu(&mut self) {
        if let Some(menu) = self.menu() {
            menu.remove();
        }
    }

    fn alert(&self, message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }
}
