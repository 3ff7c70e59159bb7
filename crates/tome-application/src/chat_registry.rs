//! Chat list state container.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tome_core::chat::{ChatSession, sort_by_activity};
use tome_core::error::{Result, TomeError};
use tome_core::gateway::BackendGateway;

/// Immutable view of the registry, published after every mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// All known chats, most recently updated first.
    pub chats: Vec<ChatSession>,
    /// The active chat, if any.
    pub current: Option<String>,
    /// Human-readable description of the last failed operation, cleared by
    /// the next success.
    pub last_error: Option<String>,
}

#[derive(Default)]
struct RegistryState {
    chats: Vec<ChatSession>,
    current: Option<String>,
    last_error: Option<String>,
}

/// Owns the chat list and the "current chat" pointer.
///
/// The list is always kept sorted by `updated_at` descending. The current
/// pointer is cleared, never silently reassigned, when the active chat goes
/// away — presentation must ask the user again.
pub struct ChatRegistry {
    gateway: Arc<dyn BackendGateway>,
    state: RwLock<RegistryState>,
    snapshot_tx: watch::Sender<RegistrySnapshot>,
}

impl ChatRegistry {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        let (snapshot_tx, _) = watch::channel(RegistrySnapshot::default());
        Self {
            gateway,
            state: RwLock::new(RegistryState::default()),
            snapshot_tx,
        }
    }

    /// Current view of the registry.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribes to registry snapshots.
    pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Id of the active chat, if any.
    pub async fn current(&self) -> Option<String> {
        self.state.read().await.current.clone()
    }

    fn publish(&self, state: &RegistryState) {
        self.snapshot_tx.send_replace(RegistrySnapshot {
            chats: state.chats.clone(),
            current: state.current.clone(),
            last_error: state.last_error.clone(),
        });
    }

    async fn surface_failure(&self, err: tome_core::GatewayError) -> TomeError {
        let mut state = self.state.write().await;
        state.last_error = Some(err.to_string());
        self.publish(&state);
        err.into()
    }

    /// Replaces the list wholesale from the backend.
    ///
    /// Clears the current pointer if the active chat is gone from the new
    /// list.
    pub async fn refresh(&self) -> Result<()> {
        match self.gateway.list_chats().await {
            Ok(mut chats) => {
                sort_by_activity(&mut chats);
                let mut state = self.state.write().await;
                state.chats = chats;
                if let Some(current) = &state.current
                    && !state.chats.iter().any(|c| &c.id == current)
                {
                    tracing::debug!(
                        "[ChatRegistry] active chat '{}' vanished on refresh",
                        current
                    );
                    state.current = None;
                }
                state.last_error = None;
                self.publish(&state);
                Ok(())
            }
            Err(err) => Err(self.surface_failure(err).await),
        }
    }

    /// Creates a chat, blocking until the backend assigns an id.
    ///
    /// There is no optimistic path here: a chat has no meaningful local-only
    /// existence, since no message can be attached before the id exists.
    pub async fn create(&self, title: Option<&str>) -> Result<ChatSession> {
        match self.gateway.create_chat(title).await {
            Ok(chat) => {
                let mut state = self.state.write().await;
                state.chats.push(chat.clone());
                sort_by_activity(&mut state.chats);
                state.last_error = None;
                self.publish(&state);
                Ok(chat)
            }
            Err(err) => Err(self.surface_failure(err).await),
        }
    }

    /// Makes `chat_id` the active chat.
    ///
    /// Selecting the already-active chat is a no-op. An id missing from the
    /// list triggers one refresh before giving up, which covers ids learned
    /// from a stale reference.
    pub async fn select(&self, chat_id: &str) -> Result<()> {
        {
            let state = self.state.read().await;
            if state.current.as_deref() == Some(chat_id) {
                return Ok(());
            }
        }
        if !self.contains(chat_id).await {
            tracing::debug!(
                "[ChatRegistry] '{}' not in list, refreshing before select",
                chat_id
            );
            self.refresh().await?;
            if !self.contains(chat_id).await {
                return Err(TomeError::ChatNotFound(chat_id.to_string()));
            }
        }
        let mut state = self.state.write().await;
        state.current = Some(chat_id.to_string());
        self.publish(&state);
        Ok(())
    }

    async fn contains(&self, chat_id: &str) -> bool {
        self.state
            .read()
            .await
            .chats
            .iter()
            .any(|c| c.id == chat_id)
    }

    /// Deletes a chat. Destructive and not undoable.
    ///
    /// Returns whether the deleted chat was the active one, so the caller
    /// can drop the message log that pointed at it.
    pub async fn delete(&self, chat_id: &str) -> Result<bool> {
        match self.gateway.delete_chat(chat_id).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                state.chats.retain(|c| c.id != chat_id);
                let was_active = state.current.as_deref() == Some(chat_id);
                if was_active {
                    state.current = None;
                }
                state.last_error = None;
                self.publish(&state);
                Ok(was_active)
            }
            Err(err) => Err(self.surface_failure(err).await),
        }
    }

    /// Records fresh confirmed activity on a chat and re-sorts the list.
    pub async fn note_activity(&self, chat_id: &str, at: chrono::DateTime<chrono::Utc>) {
        let mut state = self.state.write().await;
        if let Some(chat) = state.chats.iter_mut().find(|c| c.id == chat_id) {
            chat.updated_at = at;
            sort_by_activity(&mut state.chats);
            self.publish(&state);
        }
    }

    /// Drops all local state (credential change).
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = RegistryState::default();
        self.publish(&state);
    }
}
