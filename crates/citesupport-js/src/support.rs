//! The `CiteSupport` JavaScript class.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use citesupport_browser::{
    BrowserCiteSupport, BrowserDom, BrowserStorage, CiteConfig, CiteError, CiteSupport,
    MenuEvent, WorkerChannel, route_event,
};
use gloo_events::EventListener;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::types::JsCiteConfig;

type Shared = Rc<RefCell<BrowserCiteSupport>>;

/// Citation editing widget bound to the current page.
///
/// Construct it, then call `start()` once the document has loaded.
#[wasm_bindgen(js_name = CiteSupport)]
pub struct JsCiteSupport {
    inner: Shared,
    click_listener: Option<EventListener>,
}

#[wasm_bindgen(js_class = CiteSupport)]
impl JsCiteSupport {
    /// Create the widget and spawn the engine worker.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<JsCiteConfig>) -> Result<JsCiteSupport, JsError> {
        let config = config.unwrap_or_default().into_config()?;
        crate::init_tracing(config.debug);
        tracing::debug!(?config, "creating CiteSupport");

        let dom = BrowserDom::new()?;
        let channel = WorkerChannel::spawn(&config.worker_url)?;
        let inner: Shared = Rc::new(RefCell::new(CiteSupport::new(
            config,
            dom,
            BrowserStorage,
            channel,
        )));

        let weak = Rc::downgrade(&inner);
        inner
            .borrow()
            .engine()
            .channel()
            .on_message(move |message| deliver(&weak, message));

        Ok(Self {
            inner,
            click_listener: None,
        })
    }

    /// Spoof the document, initialize the engine and listen for clicks.
    pub fn start(&mut self) -> Result<(), JsError> {
        self.spoof_document()?;
        self.init_document()?;
        if self.click_listener.is_none() {
            self.click_listener = Some(self.listen_for_clicks());
        }
        Ok(())
    }

    /// Check stored citations against the page. Returns false if stored
    /// state was discarded.
    #[wasm_bindgen(js_name = spoofDocument)]
    pub fn spoof_document(&self) -> Result<bool, JsError> {
        let report = self.inner.borrow_mut().spoof_document()?;
        Ok(report.reset.is_none())
    }

    /// Send the stored citations to the engine. Returns false if the engine
    /// was busy and nothing was sent.
    #[wasm_bindgen(js_name = initDocument)]
    pub fn init_document(&self) -> Result<bool, JsError> {
        Ok(self.inner.borrow_mut().init_document()?.is_sent())
    }

    #[wasm_bindgen(js_name = showMenu)]
    pub fn show_menu(&self, pos: usize) -> Result<(), JsError> {
        Ok(self.inner.borrow_mut().show_menu(pos)?)
    }

    /// Route a click event the way the page listener does.
    #[wasm_bindgen(js_name = handleMenuSelect)]
    pub fn handle_menu_select(&self, event: web_sys::Event) -> Result<(), JsError> {
        handle_click(&self.inner, &event)?;
        Ok(())
    }

    /// Apply the open menu's selection. Returns true if a request was sent
    /// to the engine.
    #[wasm_bindgen(js_name = citationAddOrEditHandler)]
    pub fn citation_add_or_edit_handler(&self) -> Result<bool, JsError> {
        let submission = self.inner.borrow_mut().citation_add_or_edit_handler()?;
        Ok(submission.is_some_and(|s| s.is_sent()))
    }

    #[wasm_bindgen(getter, js_name = processorReady)]
    pub fn processor_ready(&self) -> bool {
        self.inner.borrow().processor_ready()
    }

    #[wasm_bindgen(getter, js_name = citationByIndex)]
    pub fn citation_by_index(&self) -> Result<JsValue, JsError> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        self.inner
            .borrow()
            .citation_by_index()
            .serialize(&serializer)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> String {
        self.inner.borrow().mode().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn config(&self) -> Result<JsValue, JsError> {
        let config: CiteConfig = self.inner.borrow().config().clone();
        serde_wasm_bindgen::to_value(&config)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }
}

impl JsCiteSupport {
    fn listen_for_clicks(&self) -> EventListener {
        let document = self.inner.borrow().dom().document().clone();
        let weak = Rc::downgrade(&self.inner);
        EventListener::new(&document, "click", move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(e) = handle_click(&inner, event) {
                tracing::error!(error = %e, "citation menu action failed");
            }
        })
    }
}

fn handle_click(inner: &Shared, event: &web_sys::Event) -> Result<(), CiteError> {
    let routed: Option<MenuEvent> = route_event(inner.borrow().dom(), event);
    if let Some(menu_event) = routed {
        inner.borrow_mut().handle_menu_select(menu_event)?;
    }
    Ok(())
}

fn deliver(weak: &Weak<RefCell<BrowserCiteSupport>>, message: Result<Value, CiteError>) {
    let Some(inner) = weak.upgrade() else {
        tracing::debug!("engine message after CiteSupport was dropped");
        return;
    };
    let Ok(mut support) = inner.try_borrow_mut() else {
        tracing::error!("engine message arrived while CiteSupport was busy");
        return;
    };
    let result = match message {
        Ok(message) => support.handle_response(message).map(|_| ()),
        Err(e) => Err(support.handle_channel_error(e)),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "failed to apply engine response");
    }
}
