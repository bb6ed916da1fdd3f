//! Chat transport trait and response stream.
//!
//! The trait is declared here and implemented in `sidekick-interaction`;
//! dynamic dispatch avoids a dependency cycle between the crates.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::model::{AgentLocation, SessionHandle};
use super::request::{Request, SubmitOptions};
use crate::error::Result;
use crate::response::ResponseItem;

/// One event on a streaming response.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A finalized response segment.
    Item(ResponseItem),
    /// Terminal event: all segments have been delivered.
    Completed,
    /// Terminal event: the transport failed mid-stream.
    Failed { message: String },
}

/// Receiving half of a streaming response.
pub struct ResponseStream {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
}

impl ResponseStream {
    /// Creates a stream plus the sender the transport feeds events into.
    pub fn channel() -> (mpsc::UnboundedSender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Next stream event; `None` once the sender is dropped.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

/// The external chat service this core submits conversations to.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Starts a new session at the given location. The token allows the
    /// caller to abandon a half-built session.
    async fn start_session(
        &self,
        location: AgentLocation,
        token: CancellationToken,
    ) -> Result<Arc<SessionHandle>>;

    /// Submits request text and returns the streaming response handle.
    async fn send_request(
        &self,
        session_id: &str,
        text: &str,
        options: &SubmitOptions,
    ) -> Result<ResponseStream>;

    /// Tells the service to stop producing output for the session's live
    /// request. Advisory; the local stream is torn down regardless.
    async fn cancel_request(&self, session_id: &str);

    /// Re-submits a prior request. Transports that track attempts can
    /// override this; the default just sends the prior text again.
    async fn resend_request(
        &self,
        session_id: &str,
        prior: &Request,
        options: &SubmitOptions,
    ) -> Result<ResponseStream> {
        self.send_request(session_id, prior.text(), options).await
    }
}
