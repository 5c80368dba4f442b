//! Types exposed to JavaScript via wasm-bindgen.

use citesupport_core::{CitationMode, CiteConfig, MenuItem};
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

/// Widget configuration as passed from JavaScript.
///
/// Every field is optional; omitted fields take the widget defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsCiteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[tsify(type = "\"note\" | \"in-text\"")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_style: Option<String>,
    /// URL of the CSL engine worker script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_url: Option<String>,
    /// Reference items offered in the citation menu.
    #[serde(default)]
    pub items: Vec<JsMenuItem>,
}

/// A reference item offered in the citation menu.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsMenuItem {
    pub id: String,
    pub title: String,
}

impl JsCiteConfig {
    pub fn into_config(self) -> Result<CiteConfig, JsError> {
        let defaults = CiteConfig::default();
        let mode = match self.mode.as_deref() {
            None => defaults.mode,
            Some("note") => CitationMode::Note,
            Some("in-text") => CitationMode::InText,
            Some(other) => return Err(JsError::new(&format!("Invalid mode: {other}"))),
        };
        Ok(CiteConfig {
            debug: self.debug.unwrap_or(defaults.debug),
            mode,
            default_locale: self
                .default_locale
                .map(Into::into)
                .unwrap_or(defaults.default_locale),
            default_style: self
                .default_style
                .map(Into::into)
                .unwrap_or(defaults.default_style),
            worker_url: self.worker_url.unwrap_or(defaults.worker_url),
            items: self
                .items
                .into_iter()
                .map(|item| MenuItem::new(item.id, item.title))
                .collect(),
        })
    }
}
