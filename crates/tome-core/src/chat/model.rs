//! Chat session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat session as known to the remote authority.
///
/// Identity is assigned by the backend: a chat has no meaningful local-only
/// existence, so unlike messages there is no transient id regime here.
/// Creation blocks until the backend acknowledges; deletion is destructive
/// and not undoable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Backend-assigned identifier
    pub id: String,
    /// Human-readable chat title
    pub title: String,
    /// Timestamp when the chat was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last confirmed activity
    pub updated_at: DateTime<Utc>,
}

/// Sorts chats most-recently-updated first, the only order the registry
/// ever exposes.
pub fn sort_by_activity(chats: &mut [ChatSession]) {
    chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
