pub mod cancellation;
pub mod error;
pub mod host;
pub mod lazy;
pub mod response;
pub mod session;
pub mod state;

// Re-export common error type
pub use error::SidekickError;
