//! citesupport-core: citation editing logic without browser dependencies.
//!
//! This crate provides:
//! - `CitationDom`, `KeyValueStore` and `EngineChannel` platform traits
//! - `EngineProxy` - single-flight gate in front of the CSL engine worker
//! - Document synchronization (`spoof_document`, `set_citations`, ...)
//! - Menu resolution for adding, editing and removing citations
//! - `CiteSupport<D, S, C>` - the composed widget
//! - In-memory platform implementations for headless hosts and tests

pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod menu;
pub mod platform;
pub mod protocol;
pub mod state;
pub mod store;
pub mod support;
pub mod sync;
pub mod types;

pub use config::{CiteConfig, DEFAULT_LOCALE, DEFAULT_STYLE, DEFAULT_WORKER_URL};
pub use engine::{BufferedChannel, EngineChannel, EngineProxy, ProcessorState, Submission};
pub use error::CiteError;
pub use memory::{MemoryCitation, MemoryDom, MemoryMenu};
pub use menu::{CitationInfo, MenuAction, MenuEvent, current_citation_info, resolve_menu_action};
pub use platform::{CitationDom, DomError, Slot};
pub use protocol::{
    BibliographyData, CitationUpdate, EngineCommand, EngineRequest, EngineResponse,
    RebuildEntry, decode_response,
};
pub use smol_str::SmolStr;
pub use state::CitationState;
pub use store::{KeyValueStore, MemoryStore, PersistentStore};
pub use support::CiteSupport;
pub use sync::{SpoofFailure, SpoofReport};
pub use types::{
    Citation, CitationItem, CitationMode, CitationPosition, CitationProperties, MenuEntry,
    MenuItem,
};
