//! Storage implementations for the Sidekick core.

mod dto;
mod view_state;

pub use view_state::{MemoryViewStateRepository, TomlViewStateRepository};
