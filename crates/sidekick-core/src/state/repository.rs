//! View-state repository trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::AgentLocation;
use crate::state::model::ViewState;

/// Persistence for widget view state.
///
/// Implementations must degrade gracefully: missing or corrupt state is
/// reported as `None`, never as an error, so a broken storage file can at
/// worst lose UI continuity.
#[async_trait]
pub trait ViewStateRepository: Send + Sync {
    /// Loads the view state saved for a surface kind, if any.
    async fn get(&self, location: AgentLocation) -> Option<ViewState>;

    /// Stores the view state for a surface kind.
    async fn store(&self, location: AgentLocation, state: &ViewState) -> Result<()>;
}
