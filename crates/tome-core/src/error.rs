//! Error types for the Tome client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure taxonomy produced by the remote gateway.
///
/// Variants mirror the backend's HTTP contract. The gateway classifies,
/// the engines decide what to do with each class (see [`FailureKind`]).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayError {
    /// Credential rejected (HTTP 401). Terminal for the session.
    #[error("unauthorized: credential rejected by the backend")]
    Unauthorized,

    /// Access revoked (HTTP 403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Entity vanished (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// State conflict (HTTP 409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend fault (HTTP 5xx or an unexpected status).
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Network failure or a malformed response body.
    #[error("transport error: {0}")]
    Transport(String),
}

/// How a failure should be handled once it crosses an engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Global credential expiry; the orchestrator notifies the auth
    /// collaborator, which forces a logout.
    CredentialExpired,
    /// The entity vanished or access was revoked; a registry/tree refresh
    /// reconciles local state with the authority.
    Vanished,
    /// Session-scoped fault, surfaced to the user and never auto-retried.
    Fault,
}

impl GatewayError {
    /// Classifies this error for the propagation policy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Unauthorized => FailureKind::CredentialExpired,
            Self::Forbidden(_) | Self::NotFound(_) => FailureKind::Vanished,
            Self::Conflict(_) | Self::Server { .. } | Self::Transport(_) => FailureKind::Fault,
        }
    }

    /// Check if this is the global credential-expiry signal
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Check if this is a transport-level (network/parse) failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// A shared error type for the Tome client.
///
/// Wraps the gateway taxonomy and adds the precondition failures the engines
/// raise before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TomeError {
    /// Failure reported by the remote gateway
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// No chat is currently active
    #[error("no chat is currently active")]
    NoActiveChat,

    /// A send for the active chat is already in flight (single-flight guard)
    #[error("a message for this chat is already being delivered")]
    SendInFlight,

    /// Chat id unknown even after a registry refresh
    #[error("chat not found: '{0}'")]
    ChatNotFound(String),

    /// Message id not present in the active log
    #[error("message not found: '{0}'")]
    MessageNotFound(String),

    /// Source node id not present in the current tree
    #[error("source not found: '{0}'")]
    SourceNotFound(String),

    /// Follow-up anchor carries no retrievable query
    #[error("message '{0}' carries no retrievable query to follow up on")]
    MissingQueryMetadata(String),

    /// Operation requires a backend-confirmed message id
    #[error("message '{0}' has not been confirmed by the backend yet")]
    MessagePending(String),

    /// Internal error (should not happen in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl TomeError {
    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the underlying gateway error, if this wraps one.
    pub fn gateway(&self) -> Option<&GatewayError> {
        match self {
            Self::Gateway(err) => Some(err),
            _ => None,
        }
    }

    /// Check if this is the global credential-expiry signal
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Gateway(GatewayError::Unauthorized))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<anyhow::Error> for TomeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, TomeError>`.
pub type Result<T> = std::result::Result<T, TomeError>;
