//! Message log state container with optimistic send reconciliation.
//!
//! The engine binds to one chat at a time, owns its ordered message log,
//! applies optimistic local mutations, and reconciles them against backend
//! responses by correlation key. All freshness decisions happen at the
//! moment a response is applied: in-flight requests are never cancelled,
//! stale results are discarded.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tome_core::error::{Result, TomeError};
use tome_core::feedback::Feedback;
use tome_core::gateway::{BackendGateway, OutgoingMessage, OutgoingMetadata};
use tome_core::message::{ChatMode, DeliveryState, Message, MessageId, SourceRef};
use uuid::Uuid;

/// Immutable view of the message log, published after every mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageLogSnapshot {
    /// The chat this log belongs to, if any.
    pub session_id: Option<String>,
    /// The ordered log: server order for fetched history, with optimistic
    /// records spliced in at their insertion position.
    pub messages: Vec<Message>,
    /// True while a send or follow-up is in flight.
    pub sending: bool,
    /// True while a history fetch for the bound chat is in flight.
    pub loading: bool,
    /// Human-readable description of the last failed operation.
    pub last_error: Option<String>,
}

/// What a successful send produced, for callers that propagate the
/// freshly-assigned timestamps into the chat registry ordering.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub session_id: String,
    pub user_message: Option<Message>,
    pub assistant_message: Message,
}

#[derive(Default)]
struct LogState {
    active_session: Option<String>,
    log: Vec<Message>,
    /// Correlation key of the one in-flight send, if any (single-flight).
    in_flight: Option<Uuid>,
    loading: bool,
    last_error: Option<String>,
}

pub struct MessageSyncEngine {
    gateway: Arc<dyn BackendGateway>,
    state: RwLock<LogState>,
    snapshot_tx: watch::Sender<MessageLogSnapshot>,
}

impl MessageSyncEngine {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        let (snapshot_tx, _) = watch::channel(MessageLogSnapshot::default());
        Self {
            gateway,
            state: RwLock::new(LogState::default()),
            snapshot_tx,
        }
    }

    /// Current view of the log.
    pub fn snapshot(&self) -> MessageLogSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribes to log snapshots.
    pub fn subscribe(&self) -> watch::Receiver<MessageLogSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// The chat the engine is currently bound to.
    pub async fn active_session(&self) -> Option<String> {
        self.state.read().await.active_session.clone()
    }

    fn publish(&self, state: &LogState) {
        self.snapshot_tx.send_replace(MessageLogSnapshot {
            session_id: state.active_session.clone(),
            messages: state.log.clone(),
            sending: state.in_flight.is_some(),
            loading: state.loading,
            last_error: state.last_error.clone(),
        });
    }

    /// Binds to `session_id` and replaces the log from the backend.
    ///
    /// The binding happens synchronously, so a later call for another chat
    /// supersedes this one: when the fetch resolves, the result is committed
    /// only if the requested chat is still the bound one. Last selection
    /// wins; the stale response is discarded, not cancelled.
    pub async fn load_history(&self, session_id: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.active_session = Some(session_id.to_string());
            state.log.clear();
            state.in_flight = None;
            state.loading = true;
            state.last_error = None;
            self.publish(&state);
        }

        let fetched = self.gateway.fetch_messages(session_id).await;

        let mut state = self.state.write().await;
        if state.active_session.as_deref() != Some(session_id) {
            tracing::debug!(
                "[MessageSyncEngine] discarding stale history for '{}'",
                session_id
            );
            return Ok(());
        }
        state.loading = false;
        match fetched {
            Ok(messages) => {
                state.log = messages;
                state.last_error = None;
                self.publish(&state);
                Ok(())
            }
            Err(err) => {
                state.last_error = Some(err.to_string());
                self.publish(&state);
                Err(err.into())
            }
        }
    }

    /// Binds to a freshly created chat whose log is known to be empty,
    /// skipping the round-trip.
    pub async fn bind_empty(&self, session_id: &str) {
        let mut state = self.state.write().await;
        state.active_session = Some(session_id.to_string());
        state.log.clear();
        state.in_flight = None;
        state.loading = false;
        state.last_error = None;
        self.publish(&state);
    }

    /// Unbinds and drops the log (active chat deleted, or logout).
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = LogState::default();
        self.publish(&state);
    }

    /// Sends a user message.
    ///
    /// Single-flight per chat: a second send while one is pending is
    /// rejected, not queued. A pending record is inserted optimistically
    /// under a fresh correlation key; on success it is replaced in place by
    /// the confirmed user message and the assistant reply is appended right
    /// after it. On failure its delivery becomes `Failed` in place — the
    /// record is never removed and never auto-retried.
    pub async fn send(
        &self,
        content: &str,
        mode: ChatMode,
        source_ids: Vec<String>,
    ) -> Result<SendReceipt> {
        let (session_id, key) = {
            let mut state = self.state.write().await;
            let session_id = state
                .active_session
                .clone()
                .ok_or(TomeError::NoActiveChat)?;
            if state.in_flight.is_some() {
                return Err(TomeError::SendInFlight);
            }
            let key = Uuid::new_v4();
            state.in_flight = Some(key);
            state.log.push(Message::pending_user(key, &session_id, content));
            self.publish(&state);
            (session_id, key)
        };

        let outgoing = OutgoingMessage {
            content: content.to_string(),
            mode,
            metadata: if source_ids.is_empty() {
                None
            } else {
                Some(OutgoingMetadata {
                    source_ids,
                    ..Default::default()
                })
            },
        };
        let result = self.gateway.post_message(&session_id, &outgoing).await;

        self.reconcile_exchange(session_id, key, result, false).await
    }

    /// Re-issues the retrieval query recorded in an earlier assistant
    /// reply, scoped to one source.
    ///
    /// Appends a local marker turn and then only the new assistant reply;
    /// the marker never travels to the backend as a user message of its
    /// own. An anchor without query metadata is a precondition failure,
    /// raised before any network call.
    pub async fn request_follow_up(
        &self,
        anchor_id: &MessageId,
        source: &SourceRef,
    ) -> Result<SendReceipt> {
        let (session_id, key, metadata) = {
            let mut state = self.state.write().await;
            let session_id = state
                .active_session
                .clone()
                .ok_or(TomeError::NoActiveChat)?;
            let anchor = state
                .log
                .iter()
                .find(|m| &m.id == anchor_id)
                .ok_or_else(|| TomeError::MessageNotFound(anchor_id.to_string()))?;
            let metadata = anchor
                .query_metadata
                .clone()
                .ok_or_else(|| TomeError::MissingQueryMetadata(anchor_id.to_string()))?;
            if state.in_flight.is_some() {
                return Err(TomeError::SendInFlight);
            }
            let key = Uuid::new_v4();
            state.in_flight = Some(key);
            let mut marker = Message::pending_user(
                key,
                &session_id,
                &format!("More from \"{}\"", source.name),
            );
            marker.source_refs = vec![source.clone()];
            state.log.push(marker);
            self.publish(&state);
            (session_id, key, metadata)
        };

        let outgoing = OutgoingMessage {
            content: metadata.query,
            mode: metadata.mode,
            metadata: Some(OutgoingMetadata {
                follow_up_source_id: Some(source.id.clone()),
                ..Default::default()
            }),
        };
        let result = self.gateway.post_message(&session_id, &outgoing).await;

        self.reconcile_exchange(session_id, key, result, true).await
    }

    /// Applies a post-message outcome to the optimistic record keyed by
    /// `key`.
    ///
    /// The record is located by its correlation key, never by timestamp or
    /// content. If the chat was switched away mid-flight the record is gone
    /// and the response is discarded — the backend still committed it, so
    /// the receipt is returned either way.
    async fn reconcile_exchange(
        &self,
        session_id: String,
        key: Uuid,
        result: tome_core::gateway::GatewayResult<tome_core::gateway::MessageExchange>,
        keep_marker: bool,
    ) -> Result<SendReceipt> {
        let mut state = self.state.write().await;
        if state.in_flight == Some(key) {
            state.in_flight = None;
        }
        match result {
            Ok(exchange) => {
                let transient = MessageId::Transient { key };
                let position = state.log.iter().position(|m| m.id == transient);
                match position {
                    Some(position) => {
                        if keep_marker {
                            state.log[position].delivery = DeliveryState::Confirmed;
                        } else {
                            match exchange.user_message.clone() {
                                Some(user) => state.log[position] = user,
                                None => state.log[position].delivery = DeliveryState::Confirmed,
                            }
                        }
                        state
                            .log
                            .insert(position + 1, exchange.assistant_message.clone());
                        state.last_error = None;
                        self.publish(&state);
                    }
                    None => {
                        tracing::debug!(
                            "[MessageSyncEngine] discarding send result for '{}': \
                             optimistic record is gone",
                            session_id
                        );
                    }
                }
                Ok(SendReceipt {
                    session_id,
                    user_message: exchange.user_message,
                    assistant_message: exchange.assistant_message,
                })
            }
            Err(err) => {
                if let Some(message) = state
                    .log
                    .iter_mut()
                    .find(|m| m.id == (MessageId::Transient { key }))
                {
                    message.delivery = DeliveryState::Failed;
                }
                state.last_error = Some(err.to_string());
                self.publish(&state);
                Err(err.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // Feedback surface
    //
    // Confirmed messages are immutable except for the feedback field, and
    // that field mutates only through these three operations.
    // ------------------------------------------------------------------

    /// Returns the feedback currently attached to a message.
    pub async fn feedback_of(&self, message_id: &MessageId) -> Result<Option<Feedback>> {
        let state = self.state.read().await;
        let message = state
            .log
            .iter()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| TomeError::MessageNotFound(message_id.to_string()))?;
        Ok(message.feedback.clone())
    }

    /// Attaches feedback to a message (optimistic apply).
    pub async fn apply_feedback(&self, message_id: &MessageId, feedback: Feedback) -> Result<()> {
        self.set_feedback(message_id, Some(feedback)).await
    }

    /// Detaches feedback (rollback after a failed submission).
    pub async fn clear_feedback(&self, message_id: &MessageId) -> Result<()> {
        self.set_feedback(message_id, None).await
    }

    async fn set_feedback(
        &self,
        message_id: &MessageId,
        feedback: Option<Feedback>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let message = state
            .log
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| TomeError::MessageNotFound(message_id.to_string()))?;
        message.feedback = feedback;
        self.publish(&state);
        Ok(())
    }
}
