//! Default-agent metadata.

use std::collections::HashMap;

use sidekick_core::session::AgentLocation;

/// Descriptive metadata for the agent answering at a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMetadata {
    pub id: String,
    /// Short description, shown as the widget's default placeholder text.
    pub description: String,
}

/// Supplies the default agent for a host surface kind.
pub trait AgentMetadataProvider: Send + Sync {
    fn default_agent(&self, location: AgentLocation) -> Option<AgentMetadata>;
}

/// A fixed in-memory agent registry.
pub struct StaticAgentRegistry {
    agents: HashMap<AgentLocation, AgentMetadata>,
}

impl StaticAgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Registers the default agent for a location, replacing any previous
    /// registration.
    pub fn register(mut self, location: AgentLocation, agent: AgentMetadata) -> Self {
        self.agents.insert(location, agent);
        self
    }
}

impl Default for StaticAgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetadataProvider for StaticAgentRegistry {
    fn default_agent(&self, location: AgentLocation) -> Option<AgentMetadata> {
        self.agents.get(&location).cloned()
    }
}
