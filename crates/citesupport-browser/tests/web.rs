//! WASM browser tests for citesupport-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use citesupport_browser::{
    BrowserDom, BrowserStorage, Citation, CitationDom, CitationMode, CitationState,
    EngineRequest, KeyValueStore, MemoryStore, MenuEntry, MenuEvent, PersistentStore, Slot,
    decode_message, encode_request, route_click, sync,
};
use web_sys::{Element, HtmlElement, HtmlInputElement};

/// Replace the page body with `count` paragraphs, each ending in a trigger.
fn fixture(count: usize) -> BrowserDom {
    let document = web_sys::window().unwrap().document().unwrap();
    let mut html = String::new();
    for i in 0..count {
        html.push_str(&format!(
            "<p>Sentence {i}.<span class=\"citeme\">§</span></p>"
        ));
    }
    html.push_str("<div id=\"bibliography\"></div>");
    document.body().unwrap().set_inner_html(&html);
    BrowserDom::from_document(document)
}

fn entries() -> Vec<MenuEntry> {
    vec![
        MenuEntry { id: "doe2020".into(), title: "Doe <2020>".into(), checked: true },
        MenuEntry { id: "roe2019".into(), title: "Roe".into(), checked: false },
    ]
}

fn by_selector(dom: &BrowserDom, selector: &str) -> Element {
    dom.document().query_selector(selector).unwrap().unwrap()
}

// === Document structure ===

#[wasm_bindgen_test]
fn test_spoof_inserts_placeholders_after_triggers() {
    let mut dom = fixture(3);
    let mut state = CitationState::new(CitationMode::Note);
    let mut store = PersistentStore::new(MemoryStore::new());

    let report = sync::spoof_document(&mut state, &mut dom, &mut store).unwrap();

    assert_eq!(report.placeholders, 3);
    for pos in 0..3 {
        assert_eq!(dom.slot(pos), Slot::Placeholder);
        let sibling = dom.trigger(pos).unwrap().next_element_sibling().unwrap();
        assert!(sibling.class_list().contains("citation"));
    }
    assert_eq!(dom.citation_count(), 0);
}

#[wasm_bindgen_test]
fn test_render_citation_marks_mode() {
    let mut dom = fixture(2);
    dom.render_citation(0, "c1", "Doe, <i>On Things</i>", Some(1)).unwrap();
    dom.render_citation(1, "c2", "(Roe 2019)", None).unwrap();

    let note = dom.citation_element(0).unwrap();
    assert_eq!(note.id(), "c1");
    assert_eq!(note.class_name(), "citation note");
    assert_eq!(note.get_attribute("data-note-number").as_deref(), Some("1"));
    assert_eq!(note.inner_html(), "Doe, <i>On Things</i>");

    let inline = dom.citation_element(1).unwrap();
    assert_eq!(inline.class_name(), "citation in-text");
    assert!(inline.get_attribute("data-note-number").is_none());
    assert_eq!(dom.slot(1), Slot::Citation("c2".into()));
    assert_eq!(dom.citation_count(), 2);

    dom.remove_all_citation_nodes().unwrap();
    assert_eq!(dom.slot(0), Slot::Missing);
    assert_eq!(dom.slot(1), Slot::Missing);
}

#[wasm_bindgen_test]
fn test_bibliography_hidden_when_absent() {
    let mut dom = fixture(0);
    let container: HtmlElement = by_selector(&dom, "#bibliography").dyn_into().unwrap();

    let rendered = vec!["<div>A</div>".to_string(), "<div>B</div>".to_string()];
    dom.render_bibliography(Some(rendered.as_slice())).unwrap();
    assert_eq!(container.inner_html(), "<div>A</div><div>B</div>");
    assert!(!container.hidden());

    dom.render_bibliography(None).unwrap();
    assert!(container.hidden());
}

// === Menu ===

#[wasm_bindgen_test]
fn test_menu_lives_inside_trigger() {
    let mut dom = fixture(2);
    dom.open_menu(1, &entries()).unwrap();

    assert_eq!(dom.open_menu_position(), Some(1));
    let menu = by_selector(&dom, "#cite-menu");
    let menu_node: &web_sys::Node = &menu;
    assert!(dom.trigger(1).unwrap().contains(Some(menu_node)));
    // Titles are text, not markup.
    assert!(menu.text_content().unwrap().contains("Doe <2020>"));
    assert_eq!(dom.menu_selection(), vec!["doe2020"]);

    let roe: HtmlInputElement = by_selector(&dom, "#cite-menu input[value=roe2019]")
        .dyn_into()
        .unwrap();
    roe.set_checked(true);
    assert_eq!(dom.menu_selection(), vec!["doe2020", "roe2019"]);

    dom.close_menu();
    assert_eq!(dom.open_menu_position(), None);
    assert!(dom.menu_selection().is_empty());
}

#[wasm_bindgen_test]
fn test_route_click() {
    let mut dom = fixture(2);
    dom.open_menu(0, &entries()).unwrap();

    let save = by_selector(&dom, ".cite-menu-save");
    let checkbox = by_selector(&dom, "#cite-menu input");
    let paragraph = by_selector(&dom, "p");

    assert_eq!(route_click(&dom, &save), Some(MenuEvent::Confirm));
    assert_eq!(route_click(&dom, &checkbox), None);
    assert_eq!(route_click(&dom, &dom.trigger(1).unwrap()), Some(MenuEvent::Open(1)));
    assert_eq!(route_click(&dom, &paragraph), Some(MenuEvent::Dismiss));
}

// === Storage ===

#[wasm_bindgen_test]
fn test_local_storage_round_trip() {
    let mut backend = BrowserStorage;
    backend.remove_item("citationByIndex");
    let mut store = PersistentStore::new(backend);
    assert!(store.citation_by_index().is_empty());

    let citations = vec![Citation {
        citation_id: Some("c1".into()),
        ..Citation::from_items(["doe2020"])
    }];
    store.set_citation_by_index(&citations).unwrap();
    assert_eq!(store.citation_by_index(), citations);

    store.clear_citations().unwrap();
    assert_eq!(backend.get_item("citationByIndex").as_deref(), Some("[]"));
}

// === Worker messages ===

#[wasm_bindgen_test]
fn test_requests_are_plain_objects() {
    let request = EngineRequest::RegisterCitation {
        citation: Citation::from_items(["doe2020"]),
        pre_citations: Vec::new(),
        post_citations: Vec::new(),
    };
    let value = encode_request(&request).unwrap();

    assert!(!value.is_instance_of::<js_sys::Map>());
    let command = js_sys::Reflect::get(&value, &JsValue::from_str("command")).unwrap();
    assert_eq!(command.as_string().as_deref(), Some("registerCitation"));
    let citation = js_sys::Reflect::get(&value, &JsValue::from_str("citation")).unwrap();
    assert!(!citation.is_instance_of::<js_sys::Map>());
}

#[wasm_bindgen_test]
fn test_decode_worker_message() {
    let data = js_sys::JSON::parse(
        r#"{"command": "initProcessor", "xclass": "note", "rebuildData": [["c1", 1, "Doe"]]}"#,
    )
    .unwrap();
    let value = decode_message(data).unwrap();
    assert_eq!(value["rebuildData"][0][2], "Doe");
}
