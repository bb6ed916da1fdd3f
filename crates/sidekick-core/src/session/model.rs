//! Session domain model.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::request::Request;

/// The kind of host surface a session is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLocation {
    /// An editor region with inline proposed edits.
    InlineEditor,
    /// A terminal pane running shell commands.
    Terminal,
}

impl AgentLocation {
    /// Stable string form, used as a storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InlineEditor => "inline-editor",
            Self::Terminal => "terminal",
        }
    }
}

impl fmt::Display for AgentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live conversation bound to one host surface.
///
/// At most one session exists per host surface; it is created lazily by the
/// [`super::SessionStore`] and destroyed on `clear()` or surface disposal.
/// The request list grows in submission order and is only appended to by the
/// owning [`super::RequestController`].
pub struct SessionHandle {
    /// Unique session identifier (UUID format)
    id: String,
    /// Which host surface kind this session is attached to
    location: AgentLocation,
    /// Timestamp when the session was created (ISO 8601 format)
    created_at: String,
    /// Exchanged requests, in submission order
    requests: Mutex<Vec<Arc<Request>>>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("requests", &self.request_count())
            .finish()
    }
}

impl SessionHandle {
    pub fn new(location: AgentLocation) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            location,
            created_at: chrono::Utc::now().to_rfc3339(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> AgentLocation {
        self.location
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Snapshot of the exchanged requests.
    pub fn requests(&self) -> Vec<Arc<Request>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The most recently submitted request, if any.
    pub fn last_request(&self) -> Option<Arc<Request>> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub(crate) fn push_request(&self, request: Arc<Request>) {
        self.requests.lock().unwrap().push(request);
    }
}
