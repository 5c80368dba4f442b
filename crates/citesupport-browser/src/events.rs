//! Click routing for the citation menu.

use citesupport_core::MenuEvent;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event};

use crate::dom::{BrowserDom, MENU_ID, MENU_SAVE_CLASS, TRIGGER_CLASS};

/// The element a DOM event was dispatched to, if it is an element.
pub fn event_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn within(element: &Element, selector: &str) -> Option<Element> {
    element.closest(selector).ok().flatten()
}

/// Translate a click on `target` into a menu event.
///
/// Returns `None` for clicks inside the open menu other than the save
/// button; checkboxes toggle natively.
pub fn route_click(dom: &BrowserDom, target: &Element) -> Option<MenuEvent> {
    if within(target, &format!(".{MENU_SAVE_CLASS}")).is_some() {
        return Some(MenuEvent::Confirm);
    }
    if within(target, &format!("#{MENU_ID}")).is_some() {
        return None;
    }
    if let Some(trigger) = within(target, &format!(".{TRIGGER_CLASS}")) {
        return dom.trigger_position(&trigger).map(MenuEvent::Open);
    }
    Some(MenuEvent::Dismiss)
}

/// `route_click` for a raw DOM event.
pub fn route_event(dom: &BrowserDom, event: &Event) -> Option<MenuEvent> {
    let target = event_element(event)?;
    let routed = route_click(dom, &target);
    tracing::trace!(tag = %target.tag_name(), ?routed, "click routed");
    routed
}
