//! Response domain module.
//!
//! A response is the (possibly streaming) result of one request. It mutates
//! in place while stream segments arrive and becomes immutable once it
//! settles to `Complete` or `Canceled`.
//!
//! - `item`: response item kinds (text, code, edit groups, tool invocations)
//! - `handle`: the live, observable response object
//! - `artifacts`: derived code-artifact extraction

mod artifacts;
mod handle;
mod item;

pub use artifacts::{ArtifactCount, CodeArtifact, artifact_at, artifacts, count_artifacts};
pub use handle::{ResponseHandle, ResponseStatus};
pub use item::{ResponseItem, TextEdit};
