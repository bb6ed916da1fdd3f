//! Concrete chat transports and agent metadata.
//!
//! `sidekick-core` declares the `ChatTransport` trait; this crate provides
//! the implementations used by tests, demos, and host integrations, plus
//! the default-agent metadata that supplies widget placeholder text.

mod default_agent;
mod scripted;

pub use default_agent::{AgentMetadata, AgentMetadataProvider, StaticAgentRegistry};
pub use scripted::{ScriptedTransport, ScriptedTurn};
