//! Channel to the CSL engine worker.
//!
//! The engine is a plain JavaScript worker speaking JSON objects, so requests
//! are posted with serde-wasm-bindgen's JSON-compatible serializer (plain
//! objects, no `Map`s) and responses are read back as `serde_json::Value`.

use std::cell::RefCell;

use citesupport_core::{CiteError, EngineChannel, EngineRequest};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{ErrorEvent, MessageEvent, Worker};

type MessageHandler = Closure<dyn FnMut(MessageEvent)>;

/// Owns the engine worker and its message handler.
///
/// Dropping the channel terminates the worker.
///
/// # Example
///
/// ```ignore
/// let channel = WorkerChannel::spawn("_static/js/citeworker.js")?;
/// channel.on_message(|message| match message {
///     Ok(value) => { /* hand to CiteSupport::handle_response */ }
///     Err(e) => tracing::error!(error = %e, "bad worker message"),
/// });
/// ```
pub struct WorkerChannel {
    worker: Worker,
    on_message: RefCell<Option<MessageHandler>>,
    _on_error: Closure<dyn FnMut(ErrorEvent)>,
}

impl WorkerChannel {
    /// Start the worker script at `worker_url`.
    pub fn spawn(worker_url: &str) -> Result<Self, CiteError> {
        tracing::debug!(worker_url, "spawning citation engine worker");
        let worker = Worker::new(worker_url)
            .map_err(|e| CiteError::Channel(format!("failed to start {worker_url}: {e:?}")))?;

        let on_error = Closure::<dyn FnMut(ErrorEvent)>::new(|event: ErrorEvent| {
            tracing::error!(
                message = %event.message(),
                file = %event.filename(),
                line = event.lineno(),
                "citation engine worker error"
            );
        });
        worker.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(Self {
            worker,
            on_message: RefCell::new(None),
            _on_error: on_error,
        })
    }

    /// Deliver every decoded worker message to `callback`, replacing any
    /// previous handler.
    pub fn on_message(&self, callback: impl Fn(Result<Value, CiteError>) + 'static) {
        let handler = MessageHandler::new(move |event: MessageEvent| {
            callback(decode_message(event.data()));
        });
        self.worker
            .set_onmessage(Some(handler.as_ref().unchecked_ref()));
        self.on_message.replace(Some(handler));
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }
}

impl EngineChannel for WorkerChannel {
    fn post(&self, request: &EngineRequest) -> Result<(), CiteError> {
        let message = encode_request(request)?;
        self.worker
            .post_message(&message)
            .map_err(|e| CiteError::Channel(format!("postMessage failed: {e:?}")))
    }
}

impl Drop for WorkerChannel {
    fn drop(&mut self) {
        self.worker.set_onmessage(None);
        self.worker.set_onerror(None);
        self.worker.terminate();
    }
}

/// Convert a request into the plain object the worker expects.
pub fn encode_request(request: &EngineRequest) -> Result<JsValue, CiteError> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    request
        .serialize(&serializer)
        .map_err(|e| CiteError::Channel(format!("failed to encode {}: {e}", request.command())))
}

/// Read a worker message payload as JSON.
pub fn decode_message(data: JsValue) -> Result<Value, CiteError> {
    serde_wasm_bindgen::from_value(data)
        .map_err(|e| CiteError::Channel(format!("malformed worker message: {e}")))
}
