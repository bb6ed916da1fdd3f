//! The live response object.

use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::item::ResponseItem;

/// Completion status of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Pending,
    Complete,
    Canceled,
}

impl ResponseStatus {
    /// Whether this status is terminal (`Complete` or `Canceled`).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The result of a request, observable while streaming.
///
/// Status is published through a watch channel, so a response settles at
/// most once and listeners that subscribe after settlement immediately see
/// the cached terminal status. Items stop mutating once the response has
/// settled.
pub struct ResponseHandle {
    id: String,
    status: watch::Sender<ResponseStatus>,
    items: Mutex<Vec<ResponseItem>>,
    /// Markdown-rendered snapshot, captured once at completion.
    markdown: OnceLock<String>,
}

impl ResponseHandle {
    pub fn new() -> Self {
        let (status, _) = watch::channel(ResponseStatus::Pending);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status,
            items: Mutex::new(Vec::new()),
            markdown: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> ResponseStatus {
        *self.status.borrow()
    }

    pub fn is_settled(&self) -> bool {
        self.status().is_terminal()
    }

    /// Subscribes to status changes. A subscriber attached after settlement
    /// observes the terminal status immediately.
    pub fn subscribe(&self) -> watch::Receiver<ResponseStatus> {
        self.status.subscribe()
    }

    /// Waits until the response settles and returns the terminal status.
    pub async fn settled(&self) -> ResponseStatus {
        let mut rx = self.status.subscribe();
        match rx.wait_for(|status| status.is_terminal()).await {
            Ok(status) => *status,
            // The sender lives in `self`; this arm is unreachable in practice.
            Err(_) => ResponseStatus::Canceled,
        }
    }

    /// Snapshot of the items received so far, in document order.
    pub fn items(&self) -> Vec<ResponseItem> {
        self.items.lock().unwrap().clone()
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// The markdown snapshot taken at completion, if the response completed.
    pub fn markdown(&self) -> Option<&str> {
        self.markdown.get().map(String::as_str)
    }

    /// Appends a streamed item. Ignored once the response has settled.
    pub(crate) fn push_item(&self, item: ResponseItem) -> bool {
        if self.is_settled() {
            return false;
        }
        self.items.lock().unwrap().push(item);
        true
    }

    /// Settles the response as `Complete` and captures the markdown
    /// snapshot. Returns false if the response already settled, in which
    /// case nothing changes; a cancellation that raced in first wins.
    pub(crate) fn complete(&self) -> bool {
        let settled = self.status.send_if_modified(|status| {
            if matches!(status, ResponseStatus::Pending) {
                *status = ResponseStatus::Complete;
                true
            } else {
                false
            }
        });
        if settled {
            let snapshot = render_markdown(&self.items.lock().unwrap());
            let _ = self.markdown.set(snapshot);
        }
        settled
    }

    /// Settles the response as `Canceled`. Returns false if already settled.
    pub(crate) fn mark_canceled(&self) -> bool {
        self.status.send_if_modified(|status| {
            if matches!(status, ResponseStatus::Pending) {
                *status = ResponseStatus::Canceled;
                true
            } else {
                false
            }
        })
    }
}

impl Default for ResponseHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("items", &self.item_count())
            .finish()
    }
}

fn render_markdown(items: &[ResponseItem]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            ResponseItem::Text { content } => {
                out.push_str(content);
                out.push_str("\n\n");
            }
            ResponseItem::Code { language, content } => {
                out.push_str("```");
                if let Some(language) = language {
                    out.push_str(language);
                }
                out.push('\n');
                out.push_str(content);
                out.push_str("\n```\n\n");
            }
            ResponseItem::EditGroup { description, .. } => {
                out.push_str(description);
                out.push_str("\n\n");
            }
            ResponseItem::ToolInvocation { name, .. } => {
                out.push('`');
                out.push_str(name);
                out.push_str("`\n\n");
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settles_exactly_once() {
        let response = ResponseHandle::new();
        assert_eq!(response.status(), ResponseStatus::Pending);

        assert!(response.complete());
        assert!(!response.complete());
        assert!(!response.mark_canceled());
        assert_eq!(response.status(), ResponseStatus::Complete);
    }

    #[test]
    fn test_cancel_beats_late_completion() {
        let response = ResponseHandle::new();
        assert!(response.mark_canceled());
        // The terminal segment arrives after cancellation: no effect.
        assert!(!response.complete());
        assert_eq!(response.status(), ResponseStatus::Canceled);
        assert!(response.markdown().is_none());
    }

    #[test]
    fn test_items_frozen_after_settlement() {
        let response = ResponseHandle::new();
        assert!(response.push_item(ResponseItem::text("hello")));
        response.complete();
        assert!(!response.push_item(ResponseItem::text("late")));
        assert_eq!(response.item_count(), 1);
    }

    #[test]
    fn test_markdown_snapshot() {
        let response = ResponseHandle::new();
        response.push_item(ResponseItem::text("Run this:"));
        response.push_item(ResponseItem::code(Some("sh"), "ls -la"));
        response.complete();
        assert_eq!(response.markdown(), Some("Run this:\n\n```sh\nls -la\n```"));
    }

    #[test]
    fn test_debug_is_a_summary() {
        let response = ResponseHandle::new();
        response.push_item(ResponseItem::text("hello"));
        let rendered = format!("{response:?}");
        assert!(rendered.contains(response.id()));
        assert!(rendered.contains("Pending"));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_terminal_status() {
        let response = ResponseHandle::new();
        response.complete();
        // Subscribing after settlement must not miss the notification.
        assert_eq!(response.settled().await, ResponseStatus::Complete);
    }
}
