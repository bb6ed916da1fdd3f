//! Versioned storage DTOs.
//!
//! Domain models never touch disk directly; they pass through versioned
//! DTOs so the on-disk schema can evolve independently.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sidekick_core::state::ViewState;

/// On-disk view-state file, schema version 1.
///
/// One entry per host surface kind, keyed by the location's stable string
/// form ("terminal", "inline-editor").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewStateFileV1 {
    #[serde(default)]
    pub surfaces: HashMap<String, ViewStateEntryV1>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewStateEntryV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_view_model_id: Option<String>,
}

impl From<&ViewState> for ViewStateEntryV1 {
    fn from(state: &ViewState) -> Self {
        Self {
            last_view_model_id: state.last_view_model_id.clone(),
        }
    }
}

impl From<ViewStateEntryV1> for ViewState {
    fn from(dto: ViewStateEntryV1) -> Self {
        Self {
            last_view_model_id: dto.last_view_model_id,
        }
    }
}
