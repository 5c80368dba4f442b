//! WASM bindings for the citesupport citation widget.
//!
//! Exposes a `CiteSupport` class that wires the citation menu, the page's
//! `citation` elements, `localStorage` and the CSL engine worker together.

mod support;
mod types;

pub use support::*;
pub use types::*;

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Route `tracing` output to the browser console.
///
/// Only the first call installs a subscriber.
pub(crate) fn init_tracing(debug: bool) {
    use tracing::Level;
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;

    let console_level = if debug { Level::DEBUG } else { Level::INFO };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );
    let filter = EnvFilter::new(console_level.as_str().to_ascii_lowercase());

    let reg = Registry::default().with(filter).with(wasm_layer);

    let _ = set_global_default(reg);
}
