//! Composition root for the client engines.

use crate::chat_registry::ChatRegistry;
use crate::event::ClientEvent;
use crate::feedback_tracker::{FeedbackTracker, RateOutcome};
use crate::message_sync::MessageSyncEngine;
use crate::selection_tree::SelectionTreeEngine;
use std::sync::Arc;
use tokio::sync::mpsc;
use tome_core::chat::ChatSession;
use tome_core::error::{FailureKind, Result};
use tome_core::feedback::Rating;
use tome_core::gateway::BackendGateway;
use tome_core::message::{ChatMode, MessageId, SourceRef};

/// What to refresh when an operation reports a vanished entity.
#[derive(Debug, Clone, Copy)]
enum Reconcile {
    ChatList,
    SourceTree,
    Nothing,
}

/// Wires the engines to lifecycle events and exposes the unified operation
/// surface presentation code calls.
///
/// The engines stay independent — each owns exactly one collection — and
/// this is the only place where a result from one engine feeds another:
/// send receipts bump registry ordering, deletes clear the log, the
/// selection scopes retrieval sends.
pub struct SessionOrchestrator {
    registry: Arc<ChatRegistry>,
    messages: Arc<MessageSyncEngine>,
    feedback: Arc<FeedbackTracker>,
    sources: Arc<SelectionTreeEngine>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl SessionOrchestrator {
    /// Builds the engine set over one gateway. Returns the orchestrator and
    /// the receiving end of its lifecycle event channel.
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let messages = Arc::new(MessageSyncEngine::new(gateway.clone()));
        let orchestrator = Self {
            registry: Arc::new(ChatRegistry::new(gateway.clone())),
            feedback: Arc::new(FeedbackTracker::new(gateway.clone(), messages.clone())),
            messages,
            sources: Arc::new(SelectionTreeEngine::new(gateway)),
            events,
        };
        (orchestrator, events_rx)
    }

    /// The chat registry, for snapshots and subscriptions.
    pub fn registry(&self) -> &ChatRegistry {
        &self.registry
    }

    /// The message log engine, for snapshots and subscriptions.
    pub fn messages(&self) -> &MessageSyncEngine {
        &self.messages
    }

    /// The source selection engine, for snapshots and subscriptions.
    pub fn sources(&self) -> &SelectionTreeEngine {
        &self.sources
    }

    /// The feedback tracker, for snapshots and subscriptions.
    pub fn feedback(&self) -> &FeedbackTracker {
        &self.feedback
    }

    /// Initial load after login: chat list and source tree.
    pub async fn bootstrap(&self) -> Result<()> {
        let listed = self.registry.refresh().await;
        self.observe(listed, Reconcile::Nothing).await?;
        let loaded = self.sources.load_tree().await;
        self.observe(loaded, Reconcile::Nothing).await
    }

    /// Makes a chat active and loads its history. Last selection wins if
    /// calls overlap.
    pub async fn open_chat(&self, chat_id: &str) -> Result<()> {
        let selected = self.registry.select(chat_id).await;
        self.observe(selected, Reconcile::ChatList).await?;
        let loaded = self.messages.load_history(chat_id).await;
        self.observe(loaded, Reconcile::ChatList).await
    }

    /// Creates a chat, selects it, and binds an empty log to it.
    pub async fn create_chat(&self, title: Option<&str>) -> Result<ChatSession> {
        let created = self.registry.create(title).await;
        let chat = self.observe(created, Reconcile::Nothing).await?;
        self.registry.select(&chat.id).await?;
        self.messages.bind_empty(&chat.id).await;
        Ok(chat)
    }

    /// Deletes a chat; the message log is dropped if the active chat went
    /// away.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let deleted = self.registry.delete(chat_id).await;
        let was_active = self.observe(deleted, Reconcile::ChatList).await?;
        if was_active {
            self.messages.clear().await;
        }
        Ok(())
    }

    /// Sends a user message in the given mode.
    ///
    /// Retrieval sends are scoped to the current source selection. A
    /// confirmed exchange moves the chat's `updated_at` to the assistant
    /// reply's timestamp, which re-sorts the registry.
    pub async fn send_message(&self, content: &str, mode: ChatMode) -> Result<()> {
        let source_ids = match mode {
            ChatMode::Rag => self.sources.selected_ids().await,
            ChatMode::Gen => Vec::new(),
        };
        let sent = self.messages.send(content, mode, source_ids).await;
        let receipt = self.observe(sent, Reconcile::ChatList).await?;
        self.registry
            .note_activity(&receipt.session_id, receipt.assistant_message.created_at)
            .await;
        Ok(())
    }

    /// Follows up on one source of an earlier assistant reply. A vanished
    /// entity here most likely means the scoped source is gone, so the tree
    /// is what gets reconciled.
    pub async fn follow_up(&self, anchor_id: &MessageId, source: &SourceRef) -> Result<()> {
        let sent = self.messages.request_follow_up(anchor_id, source).await;
        let receipt = self.observe(sent, Reconcile::SourceTree).await?;
        self.registry
            .note_activity(&receipt.session_id, receipt.assistant_message.created_at)
            .await;
        Ok(())
    }

    /// Rates an assistant reply.
    pub async fn rate_message(
        &self,
        message_id: &MessageId,
        rating: Rating,
        comment: Option<String>,
    ) -> Result<RateOutcome> {
        let rated = self.feedback.rate(message_id, rating, comment).await;
        self.observe(rated, Reconcile::ChatList).await
    }

    /// Toggles a source node in the selection tree. Purely local.
    pub async fn toggle_source(&self, node_id: &str) -> Result<()> {
        self.sources.toggle(node_id).await
    }

    /// Reloads the source tree.
    pub async fn reload_sources(&self) -> Result<()> {
        let loaded = self.sources.load_tree().await;
        self.observe(loaded, Reconcile::Nothing).await
    }

    /// Refreshes the chat list.
    pub async fn refresh_chats(&self) -> Result<()> {
        let listed = self.registry.refresh().await;
        self.observe(listed, Reconcile::Nothing).await
    }

    /// Credential change: drops every engine back to empty.
    pub async fn reset(&self) {
        self.registry.clear().await;
        self.messages.clear().await;
        self.sources.clear().await;
    }

    /// Applies the propagation policy to a finished operation.
    ///
    /// 401 emits `CredentialExpired` for the auth collaborator. A vanished
    /// entity triggers the reconciling refresh the caller named; if that
    /// refresh empties the current pointer, the orphaned message log is
    /// dropped too. Everything else stays in the owning engine's snapshot.
    async fn observe<T>(&self, result: Result<T>, reconcile: Reconcile) -> Result<T> {
        if let Err(err) = &result
            && let Some(gateway_err) = err.gateway()
        {
            match gateway_err.failure_kind() {
                FailureKind::CredentialExpired => {
                    tracing::warn!("[SessionOrchestrator] credential expired, notifying auth");
                    let _ = self.events.send(ClientEvent::CredentialExpired);
                }
                FailureKind::Vanished => self.reconcile(reconcile).await,
                FailureKind::Fault => {}
            }
        }
        result
    }

    async fn reconcile(&self, reconcile: Reconcile) {
        match reconcile {
            Reconcile::ChatList => {
                tracing::debug!("[SessionOrchestrator] entity vanished, refreshing chat list");
                match self.registry.refresh().await {
                    Ok(()) => {
                        if self.registry.current().await.is_none() {
                            self.messages.clear().await;
                        }
                    }
                    Err(refresh_err) => {
                        tracing::warn!(
                            "[SessionOrchestrator] reconciling refresh failed: {}",
                            refresh_err
                        );
                        if refresh_err.is_unauthorized() {
                            let _ = self.events.send(ClientEvent::CredentialExpired);
                        }
                    }
                }
            }
            Reconcile::SourceTree => {
                tracing::debug!("[SessionOrchestrator] source vanished, reloading tree");
                if let Err(reload_err) = self.sources.load_tree().await {
                    tracing::warn!(
                        "[SessionOrchestrator] reconciling reload failed: {}",
                        reload_err
                    );
                    if reload_err.is_unauthorized() {
                        let _ = self.events.send(ClientEvent::CredentialExpired);
                    }
                }
            }
            Reconcile::Nothing => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubGateway, at, chat, confirmed, exchange};
    use tome_core::GatewayError;
    use tome_core::drive::SourceNode;
    use tome_core::message::Author;

    #[tokio::test]
    async fn create_then_send_updates_log_and_registry_order() {
        let gateway = Arc::new(StubGateway::new());
        gateway.queue_chat_list(Ok(vec![chat("old", 100)]));
        gateway.queue_tree(Ok(vec![]));
        gateway.queue_create(Ok(chat("fresh", 200)));

        let mut user = confirmed(42, "fresh", Author::User, "hello");
        user.created_at = at(300);
        let mut assistant = confirmed(43, "fresh", Author::Assistant, "hi");
        assistant.created_at = at(301);
        gateway.queue_post(Ok(exchange(Some(user), assistant)));

        let (orchestrator, _events) = SessionOrchestrator::new(gateway);
        orchestrator.bootstrap().await.unwrap();
        let created = orchestrator.create_chat(Some("Fresh")).await.unwrap();
        assert_eq!(created.id, "fresh");

        orchestrator.send_message("hello", ChatMode::Gen).await.unwrap();

        let log = orchestrator.messages().snapshot();
        let ids: Vec<_> = log.messages.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, [MessageId::assigned(42), MessageId::assigned(43)]);

        let registry = orchestrator.registry().snapshot();
        assert_eq!(registry.chats[0].id, "fresh");
        assert_eq!(registry.chats[0].updated_at, at(301));
    }

    #[tokio::test]
    async fn rag_sends_are_scoped_to_the_selection() {
        let gateway = Arc::new(StubGateway::new());
        gateway.queue_tree(Ok(vec![SourceNode::folder(
            "reports",
            "Reports",
            vec![
                SourceNode::file("q1", "Q1.pdf"),
                SourceNode::file("q2", "Q2.pdf"),
            ],
        )]));
        gateway.queue_create(Ok(chat("c1", 100)));
        gateway.queue_post(Ok(exchange(
            Some(confirmed(1, "c1", Author::User, "question")),
            confirmed(2, "c1", Author::Assistant, "answer"),
        )));

        let (orchestrator, _events) = SessionOrchestrator::new(gateway.clone());
        orchestrator.reload_sources().await.unwrap();
        orchestrator.toggle_source("reports").await.unwrap();
        orchestrator.create_chat(None).await.unwrap();

        orchestrator
            .send_message("question", ChatMode::Rag)
            .await
            .unwrap();

        let posted = gateway.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(
            posted[0].metadata.as_ref().unwrap().source_ids,
            ["q1", "q2"]
        );
    }

    #[tokio::test]
    async fn unauthorized_anywhere_emits_credential_expired() {
        let gateway = Arc::new(StubGateway::new());
        gateway.queue_chat_list(Err(GatewayError::Unauthorized));

        let (orchestrator, mut events) = SessionOrchestrator::new(gateway);
        let err = orchestrator.refresh_chats().await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(events.try_recv().unwrap(), ClientEvent::CredentialExpired);
    }

    #[tokio::test]
    async fn vanished_chat_triggers_a_reconciling_refresh() {
        let gateway = Arc::new(StubGateway::new());
        gateway.queue_chat_list(Ok(vec![chat("a", 100), chat("b", 200)]));
        gateway.queue_tree(Ok(vec![]));
        gateway.queue_history("a", Err(GatewayError::NotFound("chat gone".into())));
        // The reconciling refresh no longer carries chat a.
        gateway.queue_chat_list(Ok(vec![chat("b", 200)]));

        let (orchestrator, _events) = SessionOrchestrator::new(gateway.clone());
        orchestrator.bootstrap().await.unwrap();
        let err = orchestrator.open_chat("a").await.unwrap_err();

        assert!(err.gateway().is_some());
        assert_eq!(gateway.call_count("list_chats"), 2);
        let registry = orchestrator.registry().snapshot();
        assert_eq!(registry.chats.len(), 1);
        assert_eq!(registry.current, None);
        // The orphaned log was dropped along with the pointer.
        assert!(orchestrator.messages().snapshot().session_id.is_none());
    }

    #[tokio::test]
    async fn deleting_the_active_chat_drops_the_log() {
        let gateway = Arc::new(StubGateway::new());
        gateway.queue_chat_list(Ok(vec![chat("a", 100)]));
        gateway.queue_tree(Ok(vec![]));
        gateway.queue_history("a", Ok(vec![confirmed(1, "a", Author::User, "hi")]));
        gateway.queue_delete(Ok(()));

        let (orchestrator, _events) = SessionOrchestrator::new(gateway);
        orchestrator.bootstrap().await.unwrap();
        orchestrator.open_chat("a").await.unwrap();
        assert_eq!(orchestrator.messages().snapshot().messages.len(), 1);

        orchestrator.delete_chat("a").await.unwrap();

        assert_eq!(orchestrator.registry().snapshot().current, None);
        assert!(orchestrator.messages().snapshot().messages.is_empty());
    }

    #[tokio::test]
    async fn reset_empties_every_engine() {
        let gateway = Arc::new(StubGateway::new());
        gateway.queue_chat_list(Ok(vec![chat("a", 100)]));
        gateway.queue_tree(Ok(vec![SourceNode::file("q1", "Q1.pdf")]));

        let (orchestrator, _events) = SessionOrchestrator::new(gateway);
        orchestrator.bootstrap().await.unwrap();
        orchestrator.toggle_source("q1").await.unwrap();

        orchestrator.reset().await;

        assert!(orchestrator.registry().snapshot().chats.is_empty());
        assert!(orchestrator.messages().snapshot().messages.is_empty());
        let sources = orchestrator.sources().snapshot();
        assert!(sources.tree.is_empty());
        assert!(sources.selected.is_empty());
    }
}
