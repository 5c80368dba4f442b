//! `localStorage` backend.

use citesupport_core::{CiteError, KeyValueStore};
use gloo_storage::{LocalStorage, Storage};

/// `KeyValueStore` over the window's `localStorage`.
///
/// Values are stored as-is: `PersistentStore` has already JSON-encoded them.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl KeyValueStore for BrowserStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), CiteError> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| CiteError::Storage(format!("{key}: {e:?}")))
    }

    fn remove_item(&mut self, key: &str) {
        LocalStorage::delete(key);
    }
}
