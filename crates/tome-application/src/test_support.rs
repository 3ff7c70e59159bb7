//! Shared test doubles for the engine tests.
//!
//! `StubGateway` scripts per-endpoint response queues and records every
//! call, so tests can assert both on resulting state and on exactly which
//! requests were (or were not) issued. Endpoints can be gated on a
//! `Notify` to hold a response until the test releases it.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tome_core::chat::ChatSession;
use tome_core::drive::SourceNode;
use tome_core::error::GatewayError;
use tome_core::feedback::Feedback;
use tome_core::gateway::{BackendGateway, GatewayResult, MessageExchange, OutgoingMessage};
use tome_core::message::{
    Author, DeliveryState, Message, MessageBody, MessageId, QueryMetadata,
};

#[derive(Default)]
pub struct StubGateway {
    chat_lists: Mutex<VecDeque<GatewayResult<Vec<ChatSession>>>>,
    creates: Mutex<VecDeque<GatewayResult<ChatSession>>>,
    deletes: Mutex<VecDeque<GatewayResult<()>>>,
    histories: Mutex<HashMap<String, VecDeque<GatewayResult<Vec<Message>>>>>,
    history_gates: Mutex<HashMap<String, Arc<Notify>>>,
    posts: Mutex<VecDeque<GatewayResult<MessageExchange>>>,
    post_gate: Mutex<Option<Arc<Notify>>>,
    feedback_acks: Mutex<VecDeque<GatewayResult<()>>>,
    trees: Mutex<VecDeque<GatewayResult<Vec<SourceNode>>>>,
    calls: Mutex<Vec<String>>,
    posted: Mutex<Vec<OutgoingMessage>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_chat_list(&self, result: GatewayResult<Vec<ChatSession>>) {
        self.chat_lists.lock().unwrap().push_back(result);
    }

    pub fn queue_create(&self, result: GatewayResult<ChatSession>) {
        self.creates.lock().unwrap().push_back(result);
    }

    pub fn queue_delete(&self, result: GatewayResult<()>) {
        self.deletes.lock().unwrap().push_back(result);
    }

    pub fn queue_history(&self, chat_id: &str, result: GatewayResult<Vec<Message>>) {
        self.histories
            .lock()
            .unwrap()
            .entry(chat_id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Holds every `fetch_messages` for `chat_id` until the returned handle
    /// is notified.
    pub fn gate_history(&self, chat_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.history_gates
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), gate.clone());
        gate
    }

    pub fn queue_post(&self, result: GatewayResult<MessageExchange>) {
        self.posts.lock().unwrap().push_back(result);
    }

    /// Holds every `post_message` until the returned handle is notified.
    pub fn gate_posts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.post_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn queue_feedback(&self, result: GatewayResult<()>) {
        self.feedback_acks.lock().unwrap().push_back(result);
    }

    pub fn queue_tree(&self, result: GatewayResult<Vec<SourceNode>>) {
        self.trees.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Outgoing payloads seen by `post_message`, in call order.
    pub fn posted(&self) -> Vec<OutgoingMessage> {
        self.posted.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn unscripted<T>(endpoint: &str) -> GatewayResult<T> {
        Err(GatewayError::Transport(format!(
            "unscripted call to {endpoint}"
        )))
    }
}

#[async_trait]
impl BackendGateway for StubGateway {
    async fn list_chats(&self) -> GatewayResult<Vec<ChatSession>> {
        self.record("list_chats");
        self.chat_lists
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("list_chats"))
    }

    async fn create_chat(&self, title: Option<&str>) -> GatewayResult<ChatSession> {
        self.record(format!("create_chat:{}", title.unwrap_or("")));
        self.creates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("create_chat"))
    }

    async fn delete_chat(&self, chat_id: &str) -> GatewayResult<()> {
        self.record(format!("delete_chat:{chat_id}"));
        self.deletes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("delete_chat"))
    }

    async fn fetch_messages(&self, chat_id: &str) -> GatewayResult<Vec<Message>> {
        self.record(format!("fetch_messages:{chat_id}"));
        let gate = self.history_gates.lock().unwrap().get(chat_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.histories
            .lock()
            .unwrap()
            .get_mut(chat_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Self::unscripted("fetch_messages"))
    }

    async fn post_message(
        &self,
        chat_id: &str,
        outgoing: &OutgoingMessage,
    ) -> GatewayResult<MessageExchange> {
        self.record(format!("post_message:{chat_id}"));
        self.posted.lock().unwrap().push(outgoing.clone());
        let gate = self.post_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.posts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("post_message"))
    }

    async fn post_feedback(
        &self,
        chat_id: &str,
        message_id: i64,
        _feedback: &Feedback,
    ) -> GatewayResult<()> {
        self.record(format!("post_feedback:{chat_id}:{message_id}"));
        self.feedback_acks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("post_feedback"))
    }

    async fn fetch_drive_tree(&self) -> GatewayResult<Vec<SourceNode>> {
        self.record("fetch_drive_tree");
        self.trees
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("fetch_drive_tree"))
    }
}

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn chat(id: &str, updated_secs: i64) -> ChatSession {
    ChatSession {
        id: id.to_string(),
        title: format!("Chat {id}"),
        created_at: at(updated_secs),
        updated_at: at(updated_secs),
    }
}

pub fn confirmed(id: i64, session_id: &str, author: Author, text: &str) -> Message {
    Message {
        id: MessageId::assigned(id),
        session_id: session_id.to_string(),
        body: MessageBody::text(text),
        author,
        created_at: at(id),
        delivery: DeliveryState::Confirmed,
        feedback: None,
        source_refs: Vec::new(),
        query_metadata: None,
    }
}

pub fn assistant_with_query(id: i64, session_id: &str, text: &str, query: &str) -> Message {
    let mut message = confirmed(id, session_id, Author::Assistant, text);
    message.query_metadata = Some(QueryMetadata {
        query: query.to_string(),
        mode: tome_core::message::ChatMode::Rag,
    });
    message
}

pub fn exchange(user: Option<Message>, assistant: Message) -> MessageExchange {
    MessageExchange {
        user_message: user,
        assistant_message: assistant,
    }
}
