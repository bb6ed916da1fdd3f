//! Session domain module.
//!
//! A session is one conversation bound to a host surface (an inline editor
//! region or a terminal pane).
//!
//! # Module Structure
//!
//! - `model`: session handle and location tag
//! - `request`: request model and submit options
//! - `transport`: chat transport trait and response stream
//! - `store`: lazy single-flight session ownership
//! - `controller`: single-outstanding-request state machine

mod controller;
mod model;
mod request;
mod store;
mod transport;

// Re-export public API
pub use controller::{ControllerPhase, RequestController};
pub use model::{AgentLocation, SessionHandle};
pub use request::{InputModality, Request, SubmitOptions};
pub use store::SessionStore;
pub use transport::{ChatTransport, ResponseStream, StreamEvent};
