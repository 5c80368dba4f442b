//! Error types for citation widget operations.

use smol_str::SmolStr;
use thiserror::Error;

use crate::platform::DomError;

/// Errors that can occur while editing citations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CiteError {
    /// Writing to the key/value store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON encode or decode failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A DOM operation failed.
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    /// The engine answered with a non-OK result.
    #[error("engine reported failure: {0}")]
    Engine(String),

    /// Posting a message to the engine failed.
    #[error("engine channel error: {0}")]
    Channel(String),

    /// A citation ID that is not registered.
    #[error("unknown citation: {0}")]
    UnknownCitation(SmolStr),
}

impl CiteError {
    /// Returns true if the engine itself reported the failure.
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Self::Engine(_))
    }
}
