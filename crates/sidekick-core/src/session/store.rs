//! Lazy, single-flight session ownership.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use super::model::{AgentLocation, SessionHandle};
use super::transport::ChatTransport;
use crate::cancellation::{Outcome, run_cancellable};
use crate::error::{Result, SidekickError};
use crate::lazy::Lazy;

/// Owns at most one lazily-constructed session per host surface.
///
/// Construction is single-flight: concurrent `ensure_session` calls share
/// one in-flight transport call, so no duplicate session is ever created.
/// Construction is also cancelable, so rapid show/hide sequences do not
/// leak half-built sessions.
pub struct SessionStore {
    transport: Arc<dyn ChatTransport>,
    location: AgentLocation,
    session: Lazy<Arc<SessionHandle>>,
    /// Token handed to the in-flight construction; rotated on `clear()`.
    construct_token: Mutex<CancellationToken>,
}

impl SessionStore {
    pub fn new(transport: Arc<dyn ChatTransport>, location: AgentLocation) -> Self {
        Self {
            transport,
            location,
            session: Lazy::new(),
            construct_token: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn location(&self) -> AgentLocation {
        self.location
    }

    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        self.transport.clone()
    }

    /// Returns the held session, constructing it on first use.
    ///
    /// On construction failure the store stays empty and the next call
    /// retries from scratch. If `clear()` cancels an in-flight
    /// construction, every waiter gets [`SidekickError::Canceled`].
    pub async fn ensure_session(&self) -> Result<Arc<SessionHandle>> {
        let token = self.construct_token.lock().unwrap().clone();
        let transport = self.transport.clone();
        let location = self.location;
        self.session
            .get_or_build(move || async move {
                tracing::debug!(%location, "constructing session");
                match run_cancellable(&token, transport.start_session(location, token.clone()))
                    .await
                {
                    Outcome::Completed(result) => result,
                    Outcome::Canceled => Err(SidekickError::Canceled),
                }
            })
            .await
    }

    /// The held session, if one has been constructed.
    pub fn session(&self) -> Option<Arc<SessionHandle>> {
        self.session.value()
    }

    pub fn has_session(&self) -> bool {
        self.session.has_value()
    }

    /// Cancels any in-flight construction and drops the held session.
    /// Idempotent.
    pub fn clear(&self) {
        let token = {
            let mut guard = self.construct_token.lock().unwrap();
            std::mem::replace(&mut *guard, CancellationToken::new())
        };
        token.cancel();
        if let Some(session) = self.session.clear() {
            tracing::debug!(session_id = %session.id(), "session cleared");
        }
    }
}
