//! Assistant command actions.
//!
//! Each action validates its precondition and delegates to the controller,
//! extractor, or host surface. Precondition failures mean the surrounding
//! enablement logic (context keys) is wrong; they are returned as typed
//! errors and must never be shown to the user.

use std::sync::Arc;

use async_trait::async_trait;

use sidekick_application::WidgetStateCoordinator;
use sidekick_core::error::{Result, SidekickError};
use sidekick_core::host::HostSurfaceAdapter;
use sidekick_core::response::{ArtifactCount, ResponseHandle, ResponseStatus, artifacts, count_artifacts};
use sidekick_core::session::{Request, RequestController};

/// The shared conversation surface "view in chat" transplants into.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Shows the request/response pair in the shared chat view.
    async fn open_exchange(
        &self,
        request: Arc<Request>,
        response: Arc<ResponseHandle>,
    ) -> Result<()>;
}

/// Command objects surrounding one assistant widget.
pub struct CommandActions {
    controller: Arc<RequestController>,
    coordinator: Arc<WidgetStateCoordinator>,
    surface: Arc<dyn HostSurfaceAdapter>,
    chat: Arc<dyn ChatSurface>,
}

impl CommandActions {
    pub fn new(
        controller: Arc<RequestController>,
        coordinator: Arc<WidgetStateCoordinator>,
        surface: Arc<dyn HostSurfaceAdapter>,
        chat: Arc<dyn ChatSurface>,
    ) -> Self {
        Self {
            controller,
            coordinator,
            surface,
            chat,
        }
    }

    /// Confirms the current response's proposed edits as final.
    pub fn accept(&self) -> Result<()> {
        self.settled_response()?;
        self.surface.accept_pending_edits();
        Ok(())
    }

    /// Reverts the proposed edits; the session stays usable for a
    /// follow-up request.
    pub fn discard(&self) -> Result<()> {
        self.settled_response()?;
        self.surface.discard_pending_edits();
        Ok(())
    }

    /// Executes the response's single code block in the host surface.
    pub async fn run(&self) -> Result<()> {
        self.run_artifact(ArtifactCount::One, true).await
    }

    /// Executes the first of several code blocks.
    pub async fn run_first(&self) -> Result<()> {
        self.run_artifact(ArtifactCount::Many, true).await
    }

    /// Stages the single code block in the host surface without executing.
    pub async fn insert(&self) -> Result<()> {
        self.run_artifact(ArtifactCount::One, false).await
    }

    /// Stages the first of several code blocks without executing.
    pub async fn insert_first(&self) -> Result<()> {
        self.run_artifact(ArtifactCount::Many, false).await
    }

    /// Re-submits the last request ("try again").
    pub async fn rerun(&self) -> Result<Option<Arc<ResponseHandle>>> {
        if let Some(request) = self.controller.last_request() {
            if self.controller.is_in_flight() {
                return Err(SidekickError::RequestInFlight {
                    request_id: request.id().to_string(),
                });
            }
        }
        self.controller.rerun().await
    }

    /// Moves the current exchange into the shared chat view and hides the
    /// local widget.
    pub async fn view_in_chat(&self) -> Result<()> {
        let request = self
            .controller
            .last_request()
            .ok_or(SidekickError::NoPriorRequest)?;
        let response = request.response();
        self.chat.open_exchange(request, response).await?;
        self.coordinator.hide();
        Ok(())
    }

    /// Cancels whatever is in flight and hides the widget. Always valid.
    pub fn close(&self) {
        self.controller.cancel();
        self.coordinator.hide();
    }

    /// Drops the session and its pending state. Explicit follow-up to
    /// `run`/`accept`; never invoked implicitly.
    pub fn clear(&self) {
        self.controller.cancel();
        self.controller.store().clear();
    }

    fn settled_response(&self) -> Result<Arc<ResponseHandle>> {
        let response = self
            .controller
            .last_response()
            .ok_or(SidekickError::NoPriorRequest)?;
        if response.status() != ResponseStatus::Complete {
            return Err(SidekickError::ResponseNotComplete);
        }
        if response.is_empty() {
            return Err(SidekickError::EmptyResponse);
        }
        Ok(response)
    }

    async fn run_artifact(&self, required: ArtifactCount, execute: bool) -> Result<()> {
        let response = self.settled_response()?;
        if count_artifacts(&response) != required {
            let expected = match required {
                ArtifactCount::One => "exactly one",
                ArtifactCount::Many => "two or more",
                ArtifactCount::None => "no",
            };
            return Err(SidekickError::ArtifactMismatch {
                expected,
                actual: artifacts(&response).len(),
            });
        }
        // Both variants act on the first block; "run" is only offered when
        // it is unambiguous.
        let artifact = artifacts(&response)
            .into_iter()
            .next()
            .ok_or(SidekickError::EmptyResponse)?;
        self.surface.run_command(&artifact.content, execute).await?;
        self.surface.scroll_to_end();
        Ok(())
    }
}
