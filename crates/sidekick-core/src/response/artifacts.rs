//! Code-artifact extraction.
//!
//! Artifacts are a derived, indexed view over a response's items: the n-th
//! artifact is the n-th `Code` item in document order, independent of how
//! many non-code items precede it. Extraction is recomputed on demand and is
//! idempotent for a settled response.

use serde::{Deserialize, Serialize};

use super::handle::ResponseHandle;

/// A code/command fragment extracted from a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    /// Position among the response's code items (0 = first code block).
    pub index: usize,
    pub language: Option<String>,
    pub content: String,
}

/// Coarse artifact count used for command enablement.
///
/// "Run" is only unambiguous with exactly one block; with two or more only
/// "run first" variants are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactCount {
    None,
    One,
    Many,
}

impl ArtifactCount {
    fn from_len(len: usize) -> Self {
        match len {
            0 => Self::None,
            1 => Self::One,
            _ => Self::Many,
        }
    }
}

/// Extracts all code artifacts from `response`, in document order.
pub fn artifacts(response: &ResponseHandle) -> Vec<CodeArtifact> {
    response
        .items()
        .into_iter()
        .filter_map(|item| match item {
            crate::response::ResponseItem::Code { language, content } => {
                Some((language, content))
            }
            _ => None,
        })
        .enumerate()
        .map(|(index, (language, content))| CodeArtifact {
            index,
            language,
            content,
        })
        .collect()
}

/// Returns the artifact at `index`, if present.
pub fn artifact_at(response: &ResponseHandle, index: usize) -> Option<CodeArtifact> {
    artifacts(response).into_iter().nth(index)
}

/// Counts the artifacts in `response`.
pub fn count_artifacts(response: &ResponseHandle) -> ArtifactCount {
    let count = response
        .items()
        .iter()
        .filter(|item| item.is_code())
        .count();
    ArtifactCount::from_len(count)
}
