//! Widget state management.
//!
//! - `registry`: the shared "exactly one active controller" pointer
//! - `coordinator`: per-widget visibility/focus/placeholder state

mod coordinator;
mod registry;

pub use coordinator::WidgetStateCoordinator;
pub use registry::ActiveControllerRegistry;
