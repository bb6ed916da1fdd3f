//! Host-surface capability interface.
//!
//! One polymorphic adapter covers both controller families (inline editor
//! and terminal pane) so the session/request state machine is not
//! duplicated per host kind. Implementations live with the UI layer.

use async_trait::async_trait;

use crate::error::Result;

/// Opaque geometry of the host surface. This core never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The UI element a session is attached to.
#[async_trait]
pub trait HostSurfaceAdapter: Send + Sync {
    /// Moves input focus to the surface.
    fn focus(&self);

    /// Current surface geometry.
    fn bounds(&self) -> SurfaceBounds;

    /// Runs or stages command text in the surface. With `execute` the text
    /// is executed immediately; without it the text is only inserted.
    async fn run_command(&self, text: &str, execute: bool) -> Result<()>;

    /// Scrolls the surface content to the end.
    fn scroll_to_end(&self);

    /// Releases any positioning offset the widget applied to the surface.
    fn clear_offset(&self);

    /// Finalizes the proposed edits currently shown on the surface.
    fn accept_pending_edits(&self);

    /// Reverts the proposed edits currently shown on the surface.
    fn discard_pending_edits(&self);
}
