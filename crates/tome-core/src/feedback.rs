//! Message rating types.

use serde::{Deserialize, Serialize};

/// Thumbs-up/down verdict on an assistant reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Positive,
    Negative,
}

/// A rating attached to a message.
///
/// Attached at most once: once present it is terminal for the message's
/// lifetime in the client's view. There is no edit or un-rate path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
