//! Client lifecycle events emitted by the orchestrator.

use serde::{Deserialize, Serialize};

/// Events the external collaborators subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A request was rejected with 401. The credential is gone for the whole
    /// session; the auth collaborator must force a logout.
    CredentialExpired,
}
