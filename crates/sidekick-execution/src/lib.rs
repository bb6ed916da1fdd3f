//! Command layer and event plumbing.
//!
//! The commands here are the thin action objects bound to UI gestures
//! (accept, discard, run, rerun, close); all real state lives in the
//! session core. The tracing layer streams orchestration events to a
//! frontend channel.

mod commands;
mod tracing_layer;

pub use commands::{ChatSurface, CommandActions};
pub use tracing_layer::{AssistantEvent, AssistantEventKind, AssistantEventLayer};
