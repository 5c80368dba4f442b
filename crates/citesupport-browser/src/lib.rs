//! Browser layer for the citesupport citation widget.
//!
//! Implements the core platform traits against the live page. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `dom`: `BrowserDom`, the `citeme`/`citation` element contract
//! - `storage`: `BrowserStorage` over `localStorage`
//! - `worker`: `WorkerChannel` to the CSL engine worker
//! - `events`: click routing for the citation menu
//!
//! # Re-exports
//!
//! This crate re-exports `citesupport-core` for convenience, so consumers
//! only need to depend on `citesupport-browser`.

pub use citesupport_core;
pub use citesupport_core::*;

pub mod dom;
pub mod events;
pub mod storage;
pub mod worker;

pub use dom::BrowserDom;
pub use events::{event_element, route_click, route_event};
pub use storage::BrowserStorage;
pub use worker::{WorkerChannel, decode_message, encode_request};

/// The widget wired to the live page.
pub type BrowserCiteSupport = CiteSupport<BrowserDom, BrowserStorage, WorkerChannel>;
