//! Widget-facing orchestration on top of the session core.
//!
//! Tracks observable UI state (visibility, focus, placeholder text),
//! persists minimal continuity state, and maintains the single "active
//! controller" pointer across multiple host surfaces.

pub mod widget;

pub use widget::{ActiveControllerRegistry, WidgetStateCoordinator};
