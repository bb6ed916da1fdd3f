//! Single-outstanding-request controller.
//!
//! The controller enforces "at most one active request per session" and
//! deterministic cancel semantics. It deliberately does NOT cancel a live
//! request when a new submit arrives: a second submit while in flight is a
//! precondition violation, so response interleaving cannot happen by
//! accident. The same policy applies to both host kinds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::model::SessionHandle;
use super::request::{Request, SubmitOptions};
use super::store::SessionStore;
use super::transport::StreamEvent;
use crate::cancellation::EpochSource;
use crate::error::{Result, SidekickError};
use crate::response::ResponseHandle;

/// Externally observable controller phase, used for command enablement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    Idle,
    InFlight,
    Settled,
    Canceled,
}

enum PhaseState {
    Idle,
    InFlight { request: Arc<Request>, epoch: u64 },
    Settled,
    Canceled,
}

impl PhaseState {
    fn phase(&self) -> ControllerPhase {
        match self {
            Self::Idle => ControllerPhase::Idle,
            Self::InFlight { .. } => ControllerPhase::InFlight,
            Self::Settled => ControllerPhase::Settled,
            Self::Canceled => ControllerPhase::Canceled,
        }
    }
}

/// Submits one user request at a time against the store-held session.
///
/// Settled and Canceled are terminal only for the current request; the
/// controller itself is reusable across requests.
pub struct RequestController {
    store: Arc<SessionStore>,
    phase: Mutex<PhaseState>,
    /// The one active cancellation source; replaced on every submit.
    source: Mutex<Option<EpochSource>>,
    next_epoch: AtomicU64,
}

impl RequestController {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            phase: Mutex::new(PhaseState::Idle),
            source: Mutex::new(None),
            next_epoch: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase.lock().unwrap().phase()
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase() == ControllerPhase::InFlight
    }

    /// The most recently submitted request, if any.
    pub fn last_request(&self) -> Option<Arc<Request>> {
        self.store.session().and_then(|session| session.last_request())
    }

    /// The response of the most recent request, if any.
    pub fn last_response(&self) -> Option<Arc<ResponseHandle>> {
        self.last_request().map(|request| request.response())
    }

    /// Submits a fresh request. Attempt counter starts at 0.
    ///
    /// Returns `Ok(Some(response))` once the terminal item has been
    /// observed, `Ok(None)` if the request was canceled or the transport
    /// failed. Fails fast with `NoActiveSession` or `RequestInFlight` on
    /// precondition violations.
    pub async fn submit(
        &self,
        text: &str,
        options: SubmitOptions,
    ) -> Result<Option<Arc<ResponseHandle>>> {
        self.submit_with(text.to_string(), 0, options, None).await
    }

    /// Re-submits the last request's text with attempt = previous + 1.
    pub async fn rerun(&self) -> Result<Option<Arc<ResponseHandle>>> {
        let session = self.store.session().ok_or(SidekickError::NoActiveSession)?;
        let prior = session.last_request().ok_or(SidekickError::NoPriorRequest)?;
        let options = SubmitOptions {
            modality: prior.modality(),
        };
        self.submit_with(
            prior.text().to_string(),
            prior.attempt() + 1,
            options,
            Some(prior),
        )
        .await
    }

    /// Cancels the active request, if any. Always safe to call.
    ///
    /// Synchronous: the canceled status is visible to the caller
    /// immediately, even though stream teardown completes asynchronously.
    pub fn cancel(&self) {
        {
            let source = self.source.lock().unwrap();
            if let Some(source) = source.as_ref() {
                source.cancel();
            }
        }
        let mut phase = self.phase.lock().unwrap();
        if let PhaseState::InFlight { request, .. } = &*phase {
            tracing::debug!(request_id = %request.id(), "request canceled");
            request.response().mark_canceled();
            *phase = PhaseState::Canceled;
        }
    }

    async fn submit_with(
        &self,
        text: String,
        attempt: u32,
        options: SubmitOptions,
        rerun_of: Option<Arc<Request>>,
    ) -> Result<Option<Arc<ResponseHandle>>> {
        let session = self.store.session().ok_or(SidekickError::NoActiveSession)?;

        let (request, token, epoch) = self.begin_request(&session, &text, attempt, &options)?;
        let response = request.response();
        tracing::debug!(
            request_id = %request.id(),
            session_id = %session.id(),
            attempt,
            "submitting request"
        );

        let transport = self.store.transport();
        let sent = match &rerun_of {
            Some(prior) => {
                transport
                    .resend_request(session.id(), prior, &options)
                    .await
            }
            None => transport.send_request(session.id(), &text, &options).await,
        };

        let mut stream = match sent {
            Ok(stream) => stream,
            Err(err) => {
                // Transport-level errors never escape submit; the request
                // settles as canceled and the error is kept for the log.
                tracing::warn!(request_id = %request.id(), error = %err, "transport rejected request");
                self.settle_canceled(&request, epoch);
                return Ok(None);
            }
        };

        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    // Advisory: ask the service to stop producing output.
                    transport.cancel_request(session.id()).await;
                    self.settle_canceled(&request, epoch);
                    return Ok(None);
                }
                event = stream.next_event() => event,
            };

            match event {
                Some(StreamEvent::Item(item)) => {
                    response.push_item(item);
                }
                Some(StreamEvent::Completed) => {
                    // Cancellation pre-empts settlement: if the cancel and
                    // the terminal item raced, the response stays canceled.
                    if token.is_cancelled() || !response.complete() {
                        self.settle_canceled(&request, epoch);
                        return Ok(None);
                    }
                    self.settle_complete(epoch);
                    tracing::debug!(
                        request_id = %request.id(),
                        items = response.item_count(),
                        "request settled"
                    );
                    return Ok(Some(response));
                }
                Some(StreamEvent::Failed { message }) => {
                    tracing::warn!(request_id = %request.id(), %message, "response stream failed");
                    self.settle_canceled(&request, epoch);
                    return Ok(None);
                }
                None => {
                    tracing::warn!(request_id = %request.id(), "response stream ended without completion");
                    self.settle_canceled(&request, epoch);
                    return Ok(None);
                }
            }
        }
    }

    /// Creates the request/response pair and rotates the cancellation
    /// source, atomically with the in-flight check.
    fn begin_request(
        &self,
        session: &Arc<SessionHandle>,
        text: &str,
        attempt: u32,
        options: &SubmitOptions,
    ) -> Result<(Arc<Request>, tokio_util::sync::CancellationToken, u64)> {
        let mut phase = self.phase.lock().unwrap();
        if let PhaseState::InFlight { request, .. } = &*phase {
            return Err(SidekickError::RequestInFlight {
                request_id: request.id().to_string(),
            });
        }

        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        let source = EpochSource::new(epoch);
        let token = source.token();
        // Invalidate the previous source: stale cancellations from the old
        // epoch can no longer reach this request.
        *self.source.lock().unwrap() = Some(source);

        let request = Arc::new(Request::new(text, attempt, options.modality));
        session.push_request(request.clone());
        *phase = PhaseState::InFlight {
            request: request.clone(),
            epoch,
        };
        Ok((request, token, epoch))
    }

    fn settle_canceled(&self, request: &Arc<Request>, epoch: u64) {
        request.response().mark_canceled();
        let mut phase = self.phase.lock().unwrap();
        if let PhaseState::InFlight { epoch: current, .. } = &*phase {
            if *current == epoch {
                *phase = PhaseState::Canceled;
            }
        }
    }

    fn settle_complete(&self, epoch: u64) {
        let mut phase = self.phase.lock().unwrap();
        if let PhaseState::InFlight { epoch: current, .. } = &*phase {
            if *current == epoch {
                *phase = PhaseState::Settled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::response::{ResponseItem, ResponseStatus, count_artifacts, ArtifactCount};
    use crate::session::model::AgentLocation;
    use crate::session::transport::{ChatTransport, ResponseStream};

    /// Transport that either replies with a scripted turn or parks the
    /// stream sender so the test can drive events by hand.
    struct TestTransport {
        scripted: Mutex<VecDeque<Vec<StreamEvent>>>,
        senders: Mutex<Vec<mpsc::UnboundedSender<StreamEvent>>>,
        sends: AtomicUsize,
        resends: AtomicUsize,
        cancels: AtomicUsize,
        reject_send: bool,
    }

    impl TestTransport {
        fn new() -> Self {
            Self {
                scripted: Mutex::new(VecDeque::new()),
                senders: Mutex::new(Vec::new()),
                sends: AtomicUsize::new(0),
                resends: AtomicUsize::new(0),
                cancels: AtomicUsize::new(0),
                reject_send: false,
            }
        }

        fn rejecting() -> Self {
            let mut transport = Self::new();
            transport.reject_send = true;
            transport
        }

        fn script(&self, events: Vec<StreamEvent>) {
            self.scripted.lock().unwrap().push_back(events);
        }

        fn last_sender(&self) -> mpsc::UnboundedSender<StreamEvent> {
            self.senders.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ChatTransport for TestTransport {
        async fn start_session(
            &self,
            location: AgentLocation,
            _token: CancellationToken,
        ) -> Result<Arc<SessionHandle>> {
            Ok(Arc::new(SessionHandle::new(location)))
        }

        async fn send_request(
            &self,
            _session_id: &str,
            _text: &str,
            _options: &SubmitOptions,
        ) -> Result<ResponseStream> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.reject_send {
                return Err(SidekickError::transport("gateway timeout"));
            }
            let (tx, stream) = ResponseStream::channel();
            if let Some(events) = self.scripted.lock().unwrap().pop_front() {
                for event in events {
                    let _ = tx.send(event);
                }
            }
            self.senders.lock().unwrap().push(tx);
            Ok(stream)
        }

        async fn cancel_request(&self, _session_id: &str) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }

        async fn resend_request(
            &self,
            session_id: &str,
            prior: &Request,
            options: &SubmitOptions,
        ) -> Result<ResponseStream> {
            self.resends.fetch_add(1, Ordering::SeqCst);
            self.send_request(session_id, prior.text(), options).await
        }
    }

    async fn controller_with(transport: Arc<TestTransport>) -> Arc<RequestController> {
        let store = Arc::new(SessionStore::new(transport, AgentLocation::Terminal));
        store.ensure_session().await.unwrap();
        Arc::new(RequestController::new(store))
    }

    fn completed_turn(items: Vec<ResponseItem>) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> = items.into_iter().map(StreamEvent::Item).collect();
        events.push(StreamEvent::Completed);
        events
    }

    #[tokio::test]
    async fn test_submit_requires_session() {
        let transport = Arc::new(TestTransport::new());
        let store = Arc::new(SessionStore::new(transport, AgentLocation::Terminal));
        let controller = RequestController::new(store);

        let err = controller
            .submit("hello", SubmitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SidekickError::NoActiveSession));
    }

    #[tokio::test]
    async fn test_submit_settles_complete() {
        let transport = Arc::new(TestTransport::new());
        transport.script(completed_turn(vec![
            ResponseItem::code(Some("sh"), "ls -la"),
        ]));
        let controller = controller_with(transport).await;

        let response = controller
            .submit("list files", SubmitOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.status(), ResponseStatus::Complete);
        assert_eq!(count_artifacts(&response), ArtifactCount::One);
        assert_eq!(controller.phase(), ControllerPhase::Settled);
        assert_eq!(controller.last_request().unwrap().attempt(), 0);
    }

    #[tokio::test]
    async fn test_double_submit_while_in_flight_rejects() {
        let transport = Arc::new(TestTransport::new());
        let controller = controller_with(transport.clone()).await;

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("first", SubmitOptions::default()).await }
        });
        tokio::task::yield_now().await;
        assert!(controller.is_in_flight());

        // The second submit must reject, never silently supersede.
        let err = controller
            .submit("second", SubmitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SidekickError::RequestInFlight { .. }));

        transport.last_sender().send(StreamEvent::Completed).unwrap();
        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_before_terminal_item() {
        let transport = Arc::new(TestTransport::new());
        let controller = controller_with(transport.clone()).await;

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("slow", SubmitOptions::default()).await }
        });
        tokio::task::yield_now().await;

        controller.cancel();
        // Canceled status is visible synchronously.
        assert_eq!(controller.phase(), ControllerPhase::Canceled);

        // The terminal item arrives after the cancel: it must lose.
        let _ = transport.last_sender().send(StreamEvent::Completed);
        let outcome = pending.await.unwrap().unwrap();
        assert!(outcome.is_none());
        assert_eq!(
            controller.last_response().unwrap().status(),
            ResponseStatus::Canceled
        );
        // The transport was told to stop producing output.
        assert_eq!(transport.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_race_terminal_first_in_queue() {
        // Terminal event is already queued when cancel fires; the canceled
        // status must still win because cancel marks the response directly.
        let transport = Arc::new(TestTransport::new());
        let controller = controller_with(transport.clone()).await;

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("racy", SubmitOptions::default()).await }
        });
        tokio::task::yield_now().await;

        transport.last_sender().send(StreamEvent::Completed).unwrap();
        controller.cancel();

        let outcome = pending.await.unwrap().unwrap();
        assert!(outcome.is_none());
        assert_eq!(
            controller.last_response().unwrap().status(),
            ResponseStatus::Canceled
        );
    }

    #[tokio::test]
    async fn test_cancel_with_no_active_request_is_noop() {
        let transport = Arc::new(TestTransport::new());
        let controller = controller_with(transport).await;
        controller.cancel();
        assert_eq!(controller.phase(), ControllerPhase::Idle);
    }

    #[tokio::test]
    async fn test_rerun_increments_attempt_and_keeps_text() {
        let transport = Arc::new(TestTransport::new());
        transport.script(completed_turn(vec![ResponseItem::text("a")]));
        transport.script(completed_turn(vec![ResponseItem::text("b")]));
        let controller = controller_with(transport.clone()).await;

        controller
            .submit("explain this", SubmitOptions::default())
            .await
            .unwrap();
        controller.rerun().await.unwrap();

        let last = controller.last_request().unwrap();
        assert_eq!(last.text(), "explain this");
        assert_eq!(last.attempt(), 1);
        assert_eq!(transport.resends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rerun_without_prior_request() {
        let transport = Arc::new(TestTransport::new());
        let controller = controller_with(transport).await;
        let err = controller.rerun().await.unwrap_err();
        assert!(matches!(err, SidekickError::NoPriorRequest));
    }

    #[tokio::test]
    async fn test_cancel_then_submit_starts_fresh() {
        let transport = Arc::new(TestTransport::new());
        let controller = controller_with(transport.clone()).await;

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("first", SubmitOptions::default()).await }
        });
        tokio::task::yield_now().await;
        controller.cancel();
        assert!(pending.await.unwrap().unwrap().is_none());
        let canceled_response = controller.last_response().unwrap();

        // A fresh submit resets the attempt counter and gets its own
        // response; the canceled source cannot touch it.
        transport.script(completed_turn(vec![ResponseItem::text("ok")]));
        let response = controller
            .submit("second", SubmitOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.status(), ResponseStatus::Complete);
        assert_ne!(response.id(), canceled_response.id());
        assert_eq!(controller.last_request().unwrap().attempt(), 0);
        assert_eq!(canceled_response.status(), ResponseStatus::Canceled);
    }

    #[tokio::test]
    async fn test_transport_rejection_maps_to_canceled() {
        let transport = Arc::new(TestTransport::rejecting());
        let controller = controller_with(transport).await;

        let outcome = controller
            .submit("unreachable", SubmitOptions::default())
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(controller.phase(), ControllerPhase::Canceled);
        assert_eq!(
            controller.last_response().unwrap().status(),
            ResponseStatus::Canceled
        );
    }

    #[tokio::test]
    async fn test_stream_failure_maps_to_canceled() {
        let transport = Arc::new(TestTransport::new());
        transport.script(vec![
            StreamEvent::Item(ResponseItem::text("partial")),
            StreamEvent::Failed {
                message: "connection reset".to_string(),
            },
        ]);
        let controller = controller_with(transport).await;

        let outcome = controller
            .submit("flaky", SubmitOptions::default())
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(controller.phase(), ControllerPhase::Canceled);
    }

    #[tokio::test]
    async fn test_dropped_stream_maps_to_canceled() {
        let transport = Arc::new(TestTransport::new());
        let controller = controller_with(transport.clone()).await;

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("dropped", SubmitOptions::default()).await }
        });
        tokio::task::yield_now().await;

        // Dropping the sender ends the stream without a terminal event.
        transport.senders.lock().unwrap().clear();
        let outcome = pending.await.unwrap().unwrap();
        assert!(outcome.is_none());
        assert_eq!(controller.phase(), ControllerPhase::Canceled);
    }

    #[tokio::test]
    async fn test_voice_modality_carried_through_rerun() {
        let transport = Arc::new(TestTransport::new());
        transport.script(completed_turn(vec![ResponseItem::text("heard")]));
        transport.script(completed_turn(vec![ResponseItem::text("again")]));
        let controller = controller_with(transport).await;

        controller
            .submit("dictated", SubmitOptions::voice())
            .await
            .unwrap();
        controller.rerun().await.unwrap();

        use crate::session::request::InputModality;
        assert_eq!(
            controller.last_request().unwrap().modality(),
            InputModality::Voice
        );
    }
}
