//! Request model and submit options.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::response::ResponseHandle;

/// How the user produced the request text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputModality {
    #[default]
    Keyboard,
    Voice,
}

/// Options carried alongside a submit call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitOptions {
    pub modality: InputModality,
}

impl SubmitOptions {
    pub fn voice() -> Self {
        Self {
            modality: InputModality::Voice,
        }
    }
}

/// One user submission within a session.
///
/// Immutable once created; only its response mutates (while streaming).
/// The attempt counter is 0 for a fresh submit and increments on rerun.
pub struct Request {
    id: String,
    text: String,
    attempt: u32,
    modality: InputModality,
    created_at: String,
    response: Arc<ResponseHandle>,
}

impl Request {
    pub fn new(text: impl Into<String>, attempt: u32, modality: InputModality) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            attempt,
            modality,
            created_at: chrono::Utc::now().to_rfc3339(),
            response: Arc::new(ResponseHandle::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn modality(&self) -> InputModality {
        self.modality
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// The single response paired with this request.
    pub fn response(&self) -> Arc<ResponseHandle> {
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_request() {
        let request = Request::new("list files", 0, InputModality::Keyboard);
        assert_eq!(request.text(), "list files");
        assert_eq!(request.attempt(), 0);
        assert!(!request.response().is_settled());
    }

    #[test]
    fn test_requests_get_distinct_responses() {
        let a = Request::new("x", 0, InputModality::Keyboard);
        let b = Request::new("x", 1, InputModality::Keyboard);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.response().id(), b.response().id());
    }
}
