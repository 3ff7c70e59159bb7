//! Backend gateway trait.
//!
//! The seam between the engines and the HTTP transport. Implementations
//! attach the bearer credential and normalize every outcome into the
//! `GatewayError` taxonomy; they perform exactly one round-trip per call.
//! Retry, refresh, and reconciliation policy all live in the engines above.

use crate::chat::ChatSession;
use crate::drive::SourceNode;
use crate::error::GatewayError;
use crate::feedback::Feedback;
use crate::message::{ChatMode, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A type alias for gateway call results.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Yields the bearer credential attached to outgoing requests.
///
/// The token lifecycle (login/refresh/expiry) belongs to the external auth
/// collaborator. Reading the current value per request doubles as
/// best-effort detection of a token swapped by another tab.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Request payload for posting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub content: String,
    pub mode: ChatMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OutgoingMetadata>,
}

/// Optional request metadata: selection scoping and follow-up anchoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMetadata {
    /// Source ids the retrieval should be restricted to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ids: Vec<String>,
    /// Set when re-issuing an earlier query against one specific source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_source_id: Option<String>,
}

/// What the backend returns for a posted message: the confirmed user turn
/// (absent for follow-ups) and the assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageExchange {
    pub user_message: Option<Message>,
    pub assistant_message: Message,
}

/// Typed surface of the backend's REST API.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// `GET /chats`
    async fn list_chats(&self) -> GatewayResult<Vec<ChatSession>>;

    /// `POST /chats` — blocks until the backend assigns an id.
    async fn create_chat(&self, title: Option<&str>) -> GatewayResult<ChatSession>;

    /// `DELETE /chats/{id}` — 204 on success.
    async fn delete_chat(&self, chat_id: &str) -> GatewayResult<()>;

    /// `GET /chats/{id}/messages` — fetched messages arrive confirmed.
    async fn fetch_messages(&self, chat_id: &str) -> GatewayResult<Vec<Message>>;

    /// `POST /chats/{id}/messages`
    async fn post_message(
        &self,
        chat_id: &str,
        outgoing: &OutgoingMessage,
    ) -> GatewayResult<MessageExchange>;

    /// `POST /chats/{id}/messages/{msg_id}/feedback`
    async fn post_feedback(
        &self,
        chat_id: &str,
        message_id: i64,
        feedback: &Feedback,
    ) -> GatewayResult<()>;

    /// `GET /drive/items`
    async fn fetch_drive_tree(&self) -> GatewayResult<Vec<SourceNode>>;
}
