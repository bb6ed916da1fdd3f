//! View-state repositories.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use sidekick_core::error::{Result, SidekickError};
use sidekick_core::session::AgentLocation;
use sidekick_core::state::{ViewState, ViewStateRepository};

use crate::dto::ViewStateFileV1;

/// View-state repository backed by a TOML file.
///
/// The default path is `<config_dir>/sidekick/view_state.toml`. A missing,
/// unreadable, or unparsable file degrades to "no prior state"; only writes
/// report errors, and callers treat those as best-effort too.
pub struct TomlViewStateRepository {
    path: Option<PathBuf>,
}

impl TomlViewStateRepository {
    pub fn new() -> Self {
        Self {
            path: dirs::config_dir().map(|dir| dir.join("sidekick").join("view_state.toml")),
        }
    }

    /// Uses an explicit file path instead of the config directory.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    fn load(&self) -> ViewStateFileV1 {
        let Some(path) = &self.path else {
            return ViewStateFileV1::default();
        };
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %err, "failed to read view state");
                }
                return ViewStateFileV1::default();
            }
        };
        match toml::from_str(&content) {
            Ok(file) => file,
            Err(err) => {
                // Corrupt state means lost continuity, nothing worse.
                tracing::warn!(path = %path.display(), error = %err, "discarding corrupt view state");
                ViewStateFileV1::default()
            }
        }
    }

    fn save(&self, file: &ViewStateFileV1) -> Result<()> {
        let Some(path) = &self.path else {
            return Err(SidekickError::data_access(
                "no config directory available for view state",
            ));
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(file)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl Default for TomlViewStateRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ViewStateRepository for TomlViewStateRepository {
    async fn get(&self, location: AgentLocation) -> Option<ViewState> {
        self.load()
            .surfaces
            .remove(location.as_str())
            .map(ViewState::from)
    }

    async fn store(&self, location: AgentLocation, state: &ViewState) -> Result<()> {
        let mut file = self.load();
        file.surfaces
            .insert(location.as_str().to_string(), state.into());
        self.save(&file)
    }
}

/// In-memory repository for tests and demos.
pub struct MemoryViewStateRepository {
    states: Mutex<HashMap<&'static str, ViewState>>,
}

impl MemoryViewStateRepository {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryViewStateRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ViewStateRepository for MemoryViewStateRepository {
    async fn get(&self, location: AgentLocation) -> Option<ViewState> {
        self.states.lock().unwrap().get(location.as_str()).cloned()
    }

    async fn store(&self, location: AgentLocation, state: &ViewState) -> Result<()> {
        self.states
            .lock()
            .unwrap()
            .insert(location.as_str(), state.clone());
        Ok(())
    }
}
