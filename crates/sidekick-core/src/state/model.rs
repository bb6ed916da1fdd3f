//! Widget continuity state.

use serde::{Deserialize, Serialize};

/// Minimal snapshot persisted for UI continuity across reloads.
///
/// Keyed by host surface kind, not per widget instance. Written on every
/// view-model change, read once at widget construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// Id of the last chat view model shown in the widget.
    pub last_view_model_id: Option<String>,
}

impl ViewState {
    pub fn with_view_model(id: impl Into<String>) -> Self {
        Self {
            last_view_model_id: Some(id.into()),
        }
    }
}
