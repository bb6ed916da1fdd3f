//! In-memory transport with scripted responses.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sidekick_core::error::Result;
use sidekick_core::response::ResponseItem;
use sidekick_core::session::{
    AgentLocation, ChatTransport, Request, ResponseStream, SessionHandle, StreamEvent,
    SubmitOptions,
};

/// One scripted response turn.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTurn {
    events: Vec<StreamEvent>,
}

impl ScriptedTurn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a response item to the turn.
    pub fn item(mut self, item: ResponseItem) -> Self {
        self.events.push(StreamEvent::Item(item));
        self
    }

    /// Ends the turn with a completion event.
    pub fn completed(mut self) -> Self {
        self.events.push(StreamEvent::Completed);
        self
    }

    /// Ends the turn with a transport failure.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.events.push(StreamEvent::Failed {
            message: message.into(),
        });
        self
    }
}

/// A `ChatTransport` that replays scripted turns.
///
/// When a request arrives and a scripted turn is queued, its events are
/// delivered immediately. Without a queued turn the stream's sender is
/// parked so a test can drive events (and races) by hand. Call counters
/// expose how often each operation was invoked.
pub struct ScriptedTransport {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    parked: Mutex<Vec<mpsc::UnboundedSender<StreamEvent>>>,
    sessions_started: AtomicUsize,
    requests_sent: AtomicUsize,
    requests_resent: AtomicUsize,
    cancels: AtomicUsize,
    /// When set, `start_session` waits here before replying, so tests can
    /// overlap concurrent construction deterministically.
    start_gate: Option<Arc<tokio::sync::Notify>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            parked: Mutex::new(Vec::new()),
            sessions_started: AtomicUsize::new(0),
            requests_sent: AtomicUsize::new(0),
            requests_resent: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            start_gate: None,
        }
    }

    /// A transport whose `start_session` blocks until `gate` is notified.
    pub fn with_start_gate(gate: Arc<tokio::sync::Notify>) -> Self {
        let mut transport = Self::new();
        transport.start_gate = Some(gate);
        transport
    }

    /// Queues a turn for the next request.
    pub fn push_turn(&self, turn: ScriptedTurn) {
        self.turns.lock().unwrap().push_back(turn);
    }

    /// The sender of the most recent un-scripted request stream.
    pub fn last_parked_sender(&self) -> Option<mpsc::UnboundedSender<StreamEvent>> {
        self.parked.lock().unwrap().last().cloned()
    }

    /// Drops all parked senders, ending their streams without completion.
    pub fn drop_parked_senders(&self) {
        self.parked.lock().unwrap().clear();
    }

    pub fn sessions_started(&self) -> usize {
        self.sessions_started.load(Ordering::SeqCst)
    }

    pub fn requests_sent(&self) -> usize {
        self.requests_sent.load(Ordering::SeqCst)
    }

    pub fn requests_resent(&self) -> usize {
        self.requests_resent.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn start_session(
        &self,
        location: AgentLocation,
        token: CancellationToken,
    ) -> Result<Arc<SessionHandle>> {
        self.sessions_started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.start_gate {
            tokio::select! {
                _ = token.cancelled() => {
                    return Err(sidekick_core::SidekickError::Canceled);
                }
                _ = gate.notified() => {}
            }
        }
        tracing::debug!(%location, "scripted transport starting session");
        Ok(Arc::new(SessionHandle::new(location)))
    }

    async fn send_request(
        &self,
        session_id: &str,
        text: &str,
        _options: &SubmitOptions,
    ) -> Result<ResponseStream> {
        self.requests_sent.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(session_id, text, "scripted transport handling request");

        let (tx, stream) = ResponseStream::channel();
        let turn = self.turns.lock().unwrap().pop_front();
        match turn {
            Some(turn) => {
                for event in turn.events {
                    let _ = tx.send(event);
                }
            }
            None => self.parked.lock().unwrap().push(tx),
        }
        Ok(stream)
    }

    async fn cancel_request(&self, session_id: &str) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(session_id, "scripted transport cancel");
        self.drop_parked_senders();
    }

    async fn resend_request(
        &self,
        session_id: &str,
        prior: &Request,
        options: &SubmitOptions,
    ) -> Result<ResponseStream> {
        self.requests_resent.fetch_add(1, Ordering::SeqCst);
        self.send_request(session_id, prior.text(), options).await
    }
}
