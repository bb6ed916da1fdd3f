//! Tracing layer for streaming assistant events to a frontend channel.
//!
//! Captures the lifecycle events the session core emits through `tracing`
//! (submit, settle, cancel) and forwards them over a tokio channel, so a
//! host UI can surface progress and warnings without scraping log output.

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Coarse classification of a lifecycle event, for UI routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantEventKind {
    /// A request was handed to the transport.
    Submitted,
    /// A request reached its terminal Complete status.
    Settled,
    /// A request was canceled or mapped to canceled.
    Canceled,
    /// Anything else (session construction, storage warnings, ...).
    Message,
}

impl AssistantEventKind {
    // Message strings are the ones the request controller emits; keep in
    // sync with sidekick-core::session::controller.
    fn classify(message: &str) -> Self {
        match message {
            "submitting request" => Self::Submitted,
            "request settled" => Self::Settled,
            "request canceled" => Self::Canceled,
            _ => Self::Message,
        }
    }
}

/// One event delivered to the frontend channel.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantEvent {
    pub kind: AssistantEventKind,
    /// Emitting module path.
    pub target: String,
    /// Log level (INFO, DEBUG, WARN, ERROR).
    pub level: String,
    pub message: String,
    /// Request the event belongs to, when the emitter recorded one.
    pub request_id: Option<String>,
    /// Remaining structured fields.
    pub fields: Map<String, Value>,
    /// RFC 3339 capture time.
    pub timestamp: String,
}

/// A tracing layer that forwards assistant events to a channel.
pub struct AssistantEventLayer {
    sender: mpsc::UnboundedSender<AssistantEvent>,
}

impl AssistantEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<AssistantEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for AssistantEventLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let out = AssistantEvent {
            kind: AssistantEventKind::classify(&fields.message),
            target: event.metadata().target().to_string(),
            level: event.metadata().level().to_string(),
            message: fields.message,
            request_id: fields.request_id,
            fields: fields.rest,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Dropped receiver just means nobody is watching anymore.
        let _ = self.sender.send(out);
    }
}

/// Collects an event's fields, splitting out the ones the frontend treats
/// specially (`message`, `request_id`) from the free-form remainder.
#[derive(Default)]
struct EventFields {
    message: String,
    request_id: Option<String>,
    rest: Map<String, Value>,
}

impl EventFields {
    fn put(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => {
                self.message = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
            }
            "request_id" => {
                self.request_id = Some(match value {
                    Value::String(id) => id,
                    other => other.to_string(),
                });
            }
            name => {
                self.rest.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for EventFields {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.into());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }
}
