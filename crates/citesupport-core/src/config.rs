//! Widget configuration.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::types::{CitationMode, MenuItem};

/// Locale used when storage has none.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Style used when storage has none.
pub const DEFAULT_STYLE: &str = "jm-indigobook-law-review";

/// Script URL of the citation engine worker.
pub const DEFAULT_WORKER_URL: &str = "_static/js/citeworker.js";

/// Configuration for a `CiteSupport` instance.
///
/// Every field has a default, so hosts only pass what they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CiteConfig {
    /// Log every operation at debug level.
    pub debug: bool,
    /// Mode assumed until the engine reports the style class.
    pub mode: CitationMode,
    pub default_locale: SmolStr,
    pub default_style: SmolStr,
    pub worker_url: String,
    /// Reference items offered in the citation menu.
    pub items: Vec<MenuItem>,
}

impl Default for CiteConfig {
    fn default() -> Self {
        Self {
            debug: true,
            mode: CitationMode::Note,
            default_locale: SmolStr::new_static(DEFAULT_LOCALE),
            default_style: SmolStr::new_static(DEFAULT_STYLE),
            worker_url: DEFAULT_WORKER_URL.to_string(),
            items: Vec::new(),
        }
    }
}

impl CiteConfig {
    /// Title of a configured item, if it is known.
    pub fn item_title(&self, id: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.title.as_str())
    }
}
