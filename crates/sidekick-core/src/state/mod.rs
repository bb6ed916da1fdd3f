//! View-state domain module.
//!
//! - `model`: the minimal serializable widget continuity state
//! - `repository`: persistence trait, implemented in `sidekick-infrastructure`

mod model;
mod repository;

pub use model::ViewState;
pub use repository::ViewStateRepository;
