//! Wire representations of the backend's JSON surface.
//!
//! The backend speaks camelCase JSON; these types absorb that and map into
//! the domain models. Everything fetched from the backend arrives with
//! delivery already confirmed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tome_core::chat::ChatSession;
use tome_core::drive::{NodeKind, SourceNode};
use tome_core::feedback::Feedback;
use tome_core::gateway::MessageExchange;
use tome_core::message::{
    Author, DeliveryState, Message, MessageBody, MessageId, QueryMetadata, SourceRef,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDto {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatDto> for ChatSession {
    fn from(dto: ChatDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            created_at: dto.created_at,
            updated_at: dto.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<String>>,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub query_metadata: Option<QueryMetadata>,
}

impl MessageDto {
    /// Maps into the domain message. The wire format carries no session id
    /// on individual messages; the caller supplies the chat the response
    /// was fetched for.
    pub fn into_message(self, session_id: &str) -> Message {
        let body = match self.items {
            Some(items) if !items.is_empty() => MessageBody::Items { items },
            _ => MessageBody::text(self.content.unwrap_or_default()),
        };
        Message {
            id: MessageId::assigned(self.id),
            session_id: session_id.to_string(),
            body,
            author: self.author,
            created_at: self.created_at,
            delivery: DeliveryState::Confirmed,
            feedback: self.feedback,
            source_refs: self.sources,
            query_metadata: self.query_metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeDto {
    #[serde(default)]
    pub user_message: Option<MessageDto>,
    pub ai_message: MessageDto,
}

impl ExchangeDto {
    pub fn into_exchange(self, session_id: &str) -> MessageExchange {
        MessageExchange {
            user_message: self.user_message.map(|m| m.into_message(session_id)),
            assistant_message: self.ai_message.into_message(session_id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DriveItemDto {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub children: Vec<DriveItemDto>,
}

impl From<DriveItemDto> for SourceNode {
    fn from(dto: DriveItemDto) -> Self {
        Self {
            id: dto.id,
            kind: dto.kind,
            name: dto.name,
            children: dto.children.into_iter().map(SourceNode::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateChatBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

/// Non-2xx responses carry `{"message": "..."}`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
