//! Per-message rating state machine, layered on the message log.

use crate::message_sync::MessageSyncEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tome_core::error::{Result, TomeError};
use tome_core::feedback::{Feedback, Rating};
use tome_core::gateway::BackendGateway;
use tome_core::message::MessageId;

/// Outcome of a rating attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOutcome {
    /// The rating was accepted by the backend.
    Applied,
    /// The message already carries a terminal rating; nothing was sent.
    AlreadyRated,
    /// A submission for this message is already in flight; nothing was sent.
    InFlight,
}

/// Immutable view of the tracker, published after every change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    /// Messages with a rating submission currently in flight.
    pub in_flight: Vec<MessageId>,
    /// Human-readable description of the last failed submission.
    pub last_error: Option<String>,
}

/// Tracks rating submissions per message.
///
/// Ratings are terminal: once a message carries one there is no edit or
/// un-rate path, and further attempts are ignored without touching the
/// network. A failed submission is rolled back so the message is
/// indistinguishable from never-rated and the user can retry.
pub struct FeedbackTracker {
    gateway: Arc<dyn BackendGateway>,
    messages: Arc<MessageSyncEngine>,
    in_flight: Mutex<HashSet<MessageId>>,
    snapshot_tx: watch::Sender<FeedbackSnapshot>,
}

impl FeedbackTracker {
    pub fn new(gateway: Arc<dyn BackendGateway>, messages: Arc<MessageSyncEngine>) -> Self {
        let (snapshot_tx, _) = watch::channel(FeedbackSnapshot::default());
        Self {
            gateway,
            messages,
            in_flight: Mutex::new(HashSet::new()),
            snapshot_tx,
        }
    }

    /// Current view of the tracker.
    pub fn snapshot(&self) -> FeedbackSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribes to tracker snapshots.
    pub fn subscribe(&self) -> watch::Receiver<FeedbackSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self, in_flight: &HashSet<MessageId>, last_error: Option<String>) {
        self.snapshot_tx.send_replace(FeedbackSnapshot {
            in_flight: in_flight.iter().cloned().collect(),
            last_error,
        });
    }

    /// Rates a message once.
    ///
    /// Requires a backend-confirmed id: there is nothing to rate server-side
    /// before confirmation. The rating is applied optimistically, then
    /// submitted; on failure the field is rolled back to absent.
    pub async fn rate(
        &self,
        message_id: &MessageId,
        rating: Rating,
        comment: Option<String>,
    ) -> Result<RateOutcome> {
        let Some(remote_id) = message_id.remote_id() else {
            return Err(TomeError::MessagePending(message_id.to_string()));
        };
        let session_id = self
            .messages
            .active_session()
            .await
            .ok_or(TomeError::NoActiveChat)?;

        if self.messages.feedback_of(message_id).await?.is_some() {
            tracing::debug!("[FeedbackTracker] message {} already rated", message_id);
            return Ok(RateOutcome::AlreadyRated);
        }
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(message_id.clone()) {
                return Ok(RateOutcome::InFlight);
            }
            self.publish(&in_flight, None);
        }

        let feedback = Feedback { rating, comment };
        if let Err(err) = self
            .messages
            .apply_feedback(message_id, feedback.clone())
            .await
        {
            self.finish(message_id, None).await;
            return Err(err);
        }

        let result = self
            .gateway
            .post_feedback(&session_id, remote_id, &feedback)
            .await;

        match result {
            Ok(()) => {
                self.finish(message_id, None).await;
                Ok(RateOutcome::Applied)
            }
            Err(err) => {
                // Roll back so a failed rating is indistinguishable from
                // "never rated".
                self.messages.clear_feedback(message_id).await?;
                self.finish(message_id, Some(err.to_string())).await;
                Err(err.into())
            }
        }
    }

    async fn finish(&self, message_id: &MessageId, last_error: Option<String>) {
        let mut in_flight = self.in_flight.lock().await;
        in_flight.remove(message_id);
        self.publish(&in_flight, last_error);
    }
}
