//! Response item kinds.

use serde::{Deserialize, Serialize};

/// A single edit within an edit group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// Path of the file the edit applies to.
    pub path: String,
    /// Replacement text.
    pub replacement: String,
}

/// One segment of a streaming response, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseItem {
    /// Plain prose segment.
    Text { content: String },
    /// Fenced code or terminal-command block.
    Code {
        #[serde(default)]
        language: Option<String>,
        content: String,
    },
    /// A group of proposed edits awaiting accept/discard.
    EditGroup {
        description: String,
        #[serde(default)]
        edits: Vec<TextEdit>,
    },
    /// A tool the agent invoked while producing the response.
    ToolInvocation {
        name: String,
        arguments: serde_json::Value,
    },
}

impl ResponseItem {
    /// Whether this item contributes a runnable/insertable code artifact.
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Code { .. })
    }

    /// Convenience constructor for a text segment.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Convenience constructor for a code block.
    pub fn code(language: Option<&str>, content: impl Into<String>) -> Self {
        Self::Code {
            language: language.map(str::to_string),
            content: content.into(),
        }
    }
}
