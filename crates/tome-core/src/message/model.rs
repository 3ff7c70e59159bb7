//! Message domain model.

use crate::feedback::Feedback;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a message.
///
/// Messages are the only entity with two identity regimes: a transient key
/// assigned by the client at optimistic insert time, and a durable id
/// assigned once the authority confirms receipt. Reconciliation matches on
/// the transient key captured at insert time, never on timestamps or
/// content — content can legitimately repeat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageId {
    /// Client-assigned, valid only until server confirmation.
    Transient { key: Uuid },
    /// Authority-assigned, durable.
    Assigned { id: i64 },
}

impl MessageId {
    /// Mints a fresh transient identity, returning the correlation key
    /// alongside it.
    pub fn fresh() -> (Self, Uuid) {
        let key = Uuid::new_v4();
        (Self::Transient { key }, key)
    }

    /// Wraps a backend-assigned id.
    pub fn assigned(id: i64) -> Self {
        Self::Assigned { id }
    }

    /// The backend id, if this message has been confirmed.
    pub fn remote_id(&self) -> Option<i64> {
        match self {
            Self::Assigned { id } => Some(*id),
            Self::Transient { .. } => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient { key } => write!(f, "local:{key}"),
            Self::Assigned { id } => write!(f, "{id}"),
        }
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Assistant,
}

/// Delivery state of a message from this client's point of view.
///
/// `Pending -> Confirmed` on the happy path, `Pending -> Failed` terminally.
/// A failed message is never auto-retried; the UI must re-issue the intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Confirmed,
    Failed,
}

/// Message content.
///
/// Assistant replies come either as prose or as a bullet list of findings,
/// so the body is a proper sum type rather than two optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    Text { content: String },
    Items { items: Vec<String> },
}

impl MessageBody {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }
}

/// How a reply is produced: free generation or retrieval-grounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    Gen,
    Rag,
}

/// Pointer from an assistant reply to one grounding document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub name: String,
}

/// The retrieval query behind an assistant reply.
///
/// Kept so a follow-up can re-issue the original query scoped to a single
/// source. Absent on messages that were not produced by retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub query: String,
    pub mode: ChatMode,
}

/// A single entry in a chat's message log.
///
/// Confirmed messages are immutable except for the `feedback` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: String,
    pub body: MessageBody,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub delivery: DeliveryState,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub source_refs: Vec<SourceRef>,
    #[serde(default)]
    pub query_metadata: Option<QueryMetadata>,
}

impl Message {
    /// Builds the optimistic user-authored record inserted before a send.
    pub fn pending_user(key: Uuid, session_id: &str, content: &str) -> Self {
        Self {
            id: MessageId::Transient { key },
            session_id: session_id.to_string(),
            body: MessageBody::text(content),
            author: Author::User,
            created_at: Utc::now(),
            delivery: DeliveryState::Pending,
            feedback: None,
            source_refs: Vec::new(),
            query_metadata: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.delivery == DeliveryState::Pending
    }

    pub fn is_failed(&self) -> bool {
        self.delivery == DeliveryState::Failed
    }
}
