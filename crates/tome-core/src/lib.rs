//! Domain layer of the Tome client.
//!
//! Entity models, the tri-state selection read model, the gateway seam the
//! engines depend on, and the shared error taxonomy. Everything here is
//! transport-agnostic; the HTTP implementation lives in
//! `tome-infrastructure` and the stateful engines in `tome-application`.

pub mod chat;
pub mod config;
pub mod drive;
pub mod error;
pub mod feedback;
pub mod gateway;
pub mod message;

// Re-export common error types
pub use error::{GatewayError, TomeError};
