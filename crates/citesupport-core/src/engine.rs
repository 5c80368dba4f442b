//! Proxy for the off-main-thread citation engine.
//!
//! The engine accepts one request at a time. `EngineProxy` enforces that with
//! a single gate: requests made while one is outstanding are dropped and
//! reported as `Submission::Dropped`. There is no queue, no timeout and no
//! correlation ID; responses are matched to the outstanding request by
//! arrival order.

use std::cell::RefCell;

use serde_json::Value;
use smol_str::SmolStr;

use crate::error::CiteError;
use crate::protocol::{EngineCommand, EngineRequest, EngineResponse, decode_response};
use crate::types::{Citation, CitationPosition};

/// Transport to the engine worker.
pub trait EngineChannel {
    fn post(&self, request: &EngineRequest) -> Result<(), CiteError>;
}

impl<C: EngineChannel + ?Sized> EngineChannel for &C {
    fn post(&self, request: &EngineRequest) -> Result<(), CiteError> {
        (**self).post(request)
    }
}

/// Channel that keeps posted requests in memory.
///
/// Used by headless hosts that drive the engine themselves, and by tests.
#[derive(Debug, Default)]
pub struct BufferedChannel {
    sent: RefCell<Vec<EngineRequest>>,
}

impl BufferedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every request posted so far.
    pub fn drain(&self) -> Vec<EngineRequest> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn last(&self) -> Option<EngineRequest> {
        self.sent.borrow().last().cloned()
    }
}

impl EngineChannel for BufferedChannel {
    fn post(&self, request: &EngineRequest) -> Result<(), CiteError> {
        self.sent.borrow_mut().push(request.clone());
        Ok(())
    }
}

/// Lifecycle of the engine as seen from the widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessorState {
    /// No successful init yet.
    #[default]
    Uninitialized,
    /// Initialized and idle.
    Ready,
    /// A request is outstanding.
    Busy(EngineCommand),
}

/// Outcome of asking the proxy to send a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Sent,
    /// Another request was outstanding; nothing was posted.
    Dropped,
}

impl Submission {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

#[derive(Debug)]
pub struct EngineProxy<C> {
    channel: C,
    state: ProcessorState,
    /// State to return to if the outstanding request fails.
    fallback: ProcessorState,
}

impl<C: EngineChannel> EngineProxy<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            state: ProcessorState::Uninitialized,
            fallback: ProcessorState::Uninitialized,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// True when a `registerCitation` request would be sent.
    pub fn processor_ready(&self) -> bool {
        self.state == ProcessorState::Ready
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, ProcessorState::Busy(_))
    }

    /// Send an init request unless another request is outstanding.
    pub fn init_processor(
        &mut self,
        style_name: SmolStr,
        locale_name: SmolStr,
        citation_by_index: Vec<Citation>,
    ) -> Result<Submission, CiteError> {
        if self.is_busy() {
            tracing::warn!(state = ?self.state, "engine busy, dropping initProcessor");
            return Ok(Submission::Dropped);
        }
        tracing::debug!(%style_name, %locale_name, citations = citation_by_index.len(), "initProcessor");
        self.send(EngineRequest::InitProcessor {
            style_name,
            locale_name,
            citation_by_index,
        })
    }

    /// Send an edit request if the processor is ready.
    pub fn register_citation(
        &mut self,
        citation: Citation,
        pre_citations: Vec<CitationPosition>,
        post_citations: Vec<CitationPosition>,
    ) -> Result<Submission, CiteError> {
        if !self.processor_ready() {
            tracing::warn!(state = ?self.state, "processor not ready, dropping registerCitation");
            return Ok(Submission::Dropped);
        }
        tracing::debug!(
            citation_id = ?citation.citation_id,
            pre = pre_citations.len(),
            post = post_citations.len(),
            "registerCitation"
        );
        self.send(EngineRequest::RegisterCitation {
            citation,
            pre_citations,
            post_citations,
        })
    }

    fn send(&mut self, request: EngineRequest) -> Result<Submission, CiteError> {
        self.channel.post(&request)?;
        self.fallback = match request.command() {
            EngineCommand::InitProcessor => ProcessorState::Uninitialized,
            EngineCommand::RegisterCitation => ProcessorState::Ready,
        };
        self.state = ProcessorState::Busy(request.command());
        Ok(Submission::Sent)
    }

    /// Accept a worker message and open the gate.
    ///
    /// On success the processor becomes ready. On an engine failure or a
    /// malformed message, a failed `registerCitation` leaves the processor
    /// ready and a failed `initProcessor` leaves it uninitialized.
    pub fn accept(&mut self, message: Value) -> Result<EngineResponse, CiteError> {
        let pending = match self.state {
            ProcessorState::Busy(command) => Some(command),
            state => {
                tracing::warn!(?state, "engine message with no request outstanding");
                None
            }
        };
        self.settle(decode_response(message), pending)
    }

    /// Settle the outstanding request with an error raised before the message
    /// could be read, such as an undecodable worker payload.
    pub fn reject(&mut self, error: CiteError) -> CiteError {
        tracing::error!(error = %error, "engine request failed");
        if self.is_busy() {
            self.state = self.fallback;
        }
        error
    }

    fn settle(
        &mut self,
        decoded: Result<EngineResponse, CiteError>,
        pending: Option<EngineCommand>,
    ) -> Result<EngineResponse, CiteError> {
        match &decoded {
            Ok(response) => {
                if pending.is_some_and(|cmd| cmd != response.command()) {
                    tracing::warn!(
                        expected = ?pending,
                        received = %response.command(),
                        "engine response does not match outstanding request"
                    );
                }
                if pending.is_some() {
                    self.state = ProcessorState::Ready;
                } else {
                    tracing::warn!(state = ?self.state, "ignoring unsolicited engine response");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "engine request failed");
                if pending.is_some() {
                    self.state = self.fallback;
                }
            }
        }
        decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn init_response() -> Value {
        json!({"command": "initProcessor", "xclass": "note", "rebuildData": []})
    }

    fn ready_proxy(channel: &BufferedChannel) -> EngineProxy<&BufferedChannel> {
        let mut proxy = EngineProxy::new(channel);
        proxy
            .init_processor("style".into(), "en-US".into(), Vec::new())
            .unwrap();
        proxy.accept(init_response()).unwrap();
        channel.drain();
        proxy
    }

    #[test]
    fn test_init_opens_gate_only_on_response() {
        let channel = BufferedChannel::new();
        let mut proxy = EngineProxy::new(&channel);
        assert!(!proxy.processor_ready());

        let sent = proxy
            .init_processor("style".into(), "en-US".into(), Vec::new())
            .unwrap();
        assert_eq!(sent, Submission::Sent);
        assert_eq!(proxy.state(), ProcessorState::Busy(EngineCommand::InitProcessor));
        assert!(!proxy.processor_ready());

        proxy.accept(init_response()).unwrap();
        assert!(proxy.processor_ready());
    }

    #[test]
    fn test_second_request_dropped_while_busy() {
        let channel = BufferedChannel::new();
        let mut proxy = ready_proxy(&channel);

        let first = proxy
            .register_citation(Citation::from_items(["a"]), Vec::new(), Vec::new())
            .unwrap();
        let second = proxy
            .register_citation(Citation::from_items(["b"]), Vec::new(), Vec::new())
            .unwrap();
        let third = proxy
            .init_processor("style".into(), "en-US".into(), Vec::new())
            .unwrap();

        assert_eq!(first, Submission::Sent);
        assert_eq!(second, Submission::Dropped);
        assert_eq!(third, Submission::Dropped);
        assert!(!proxy.processor_ready());
        assert_eq!(channel.sent_count(), 1);
    }

    #[test]
    fn test_register_dropped_before_init() {
        let channel = BufferedChannel::new();
        let mut proxy = EngineProxy::new(&channel);
        let outcome = proxy
            .register_citation(Citation::from_items(["a"]), Vec::new(), Vec::new())
            .unwrap();
        assert_eq!(outcome, Submission::Dropped);
        assert_eq!(channel.sent_count(), 0);
    }

    #[test]
    fn test_failed_register_reopens_gate() {
        let channel = BufferedChannel::new();
        let mut proxy = ready_proxy(&channel);
        proxy
            .register_citation(Citation::from_items(["a"]), Vec::new(), Vec::new())
            .unwrap();

        let err = proxy
            .accept(json!({"result": "ERROR", "msg": "bad item", "command": "registerCitation"}))
            .unwrap_err();
        assert!(err.is_engine_failure());
        assert!(proxy.processor_ready());
    }

    #[test]
    fn test_unsolicited_response_leaves_gate_closed() {
        let channel = BufferedChannel::new();
        let mut proxy = EngineProxy::new(&channel);

        proxy
            .accept(json!({"command": "registerCitation", "citationByIndex": []}))
            .unwrap();
        assert_eq!(proxy.state(), ProcessorState::Uninitialized);
        assert!(!proxy.processor_ready());

        let outcome = proxy
            .register_citation(Citation::from_items(["a"]), Vec::new(), Vec::new())
            .unwrap();
        assert_eq!(outcome, Submission::Dropped);
        assert_eq!(channel.sent_count(), 0);
    }

    #[test]
    fn test_reject_applies_failure_rule() {
        let channel = BufferedChannel::new();
        let mut proxy = ready_proxy(&channel);
        proxy
            .register_citation(Citation::from_items(["a"]), Vec::new(), Vec::new())
            .unwrap();

        let err = proxy.reject(CiteError::Channel("malformed worker message".into()));
        assert!(matches!(err, CiteError::Channel(_)));
        assert!(proxy.processor_ready());

        let mut proxy = EngineProxy::new(&channel);
        proxy
            .init_processor("style".into(), "en-US".into(), Vec::new())
            .unwrap();
        proxy.reject(CiteError::Channel("malformed worker message".into()));
        assert_eq!(proxy.state(), ProcessorState::Uninitialized);
    }

    #[test]
    fn test_failed_init_stays_uninitialized() {
        let channel = BufferedChannel::new();
        let mut proxy = EngineProxy::new(&channel);
        proxy
            .init_processor("missing-style".into(), "en-US".into(), Vec::new())
            .unwrap();

        assert!(proxy.accept(json!({"result": "no such style"})).is_err());
        assert_eq!(proxy.state(), ProcessorState::Uninitialized);

        // A new init may be attempted.
        let retry = proxy
            .init_processor("style".into(), "en-US".into(), Vec::new())
            .unwrap();
        assert!(retry.is_sent());
    }
}
