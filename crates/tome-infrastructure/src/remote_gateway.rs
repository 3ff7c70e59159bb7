//! HTTP implementation of the backend gateway.

use crate::dto::{ChatDto, CreateChatBody, DriveItemDto, ErrorBody, ExchangeDto, MessageDto};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tome_core::chat::ChatSession;
use tome_core::config::ClientConfig;
use tome_core::drive::SourceNode;
use tome_core::error::GatewayError;
use tome_core::feedback::Feedback;
use tome_core::gateway::{
    BackendGateway, GatewayResult, MessageExchange, OutgoingMessage, TokenSource,
};
use tome_core::message::Message;

/// reqwest-backed gateway.
///
/// One round-trip per call: no retries, no caching. Failure policy lives in
/// the engines above; this layer only attaches the credential and
/// normalizes outcomes into the `GatewayError` taxonomy.
pub struct RemoteGateway {
    client: Client,
    base_url: String,
    timeout: Duration,
    token_source: Arc<dyn TokenSource>,
}

impl RemoteGateway {
    pub fn new(config: &ClientConfig, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            token_source,
        }
    }

    /// Performs one request against the backend.
    ///
    /// A 2xx with a body deserializes into `T`; a 204 or empty body yields
    /// `Ok(None)`, which is distinct from a parse failure (`Transport`).
    async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> GatewayResult<Option<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("[RemoteGateway] {} {}", method, path);

        let mut request = self.client.request(method, &url).timeout(self.timeout);
        if let Some(token) = self.token_source.bearer_token() {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(None);
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| GatewayError::Transport(format!("reading {url} failed: {e}")))?;
            if bytes.is_empty() {
                return Ok(None);
            }
            let parsed = serde_json::from_slice(&bytes).map_err(|e| {
                GatewayError::Transport(format!("malformed response from {url}: {e}"))
            })?;
            return Ok(Some(parsed));
        }

        let message = response
            .bytes()
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice::<ErrorBody>(&bytes).ok())
            .map(|body| body.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        Err(classify_status(status.as_u16(), message))
    }

    /// Like [`Self::call`], for endpoints whose success contract includes a
    /// body.
    async fn call_expecting<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> GatewayResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.call(method, path, body)
            .await?
            .ok_or_else(|| GatewayError::Transport(format!("empty response body from {path}")))
    }
}

/// Maps an HTTP status onto the failure taxonomy.
fn classify_status(status: u16, message: String) -> GatewayError {
    match status {
        401 => GatewayError::Unauthorized,
        403 => GatewayError::Forbidden(message),
        404 => GatewayError::NotFound(message),
        409 => GatewayError::Conflict(message),
        _ => GatewayError::Server { status, message },
    }
}

#[async_trait]
impl BackendGateway for RemoteGateway {
    async fn list_chats(&self) -> GatewayResult<Vec<ChatSession>> {
        let chats: Vec<ChatDto> = self
            .call_expecting::<(), _>(Method::GET, "/chats", None)
            .await?;
        Ok(chats.into_iter().map(ChatSession::from).collect())
    }

    async fn create_chat(&self, title: Option<&str>) -> GatewayResult<ChatSession> {
        let chat: ChatDto = self
            .call_expecting(Method::POST, "/chats", Some(&CreateChatBody { title }))
            .await?;
        Ok(chat.into())
    }

    async fn delete_chat(&self, chat_id: &str) -> GatewayResult<()> {
        self.call::<(), serde_json::Value>(Method::DELETE, &format!("/chats/{chat_id}"), None)
            .await?;
        Ok(())
    }

    async fn fetch_messages(&self, chat_id: &str) -> GatewayResult<Vec<Message>> {
        let messages: Vec<MessageDto> = self
            .call_expecting::<(), _>(Method::GET, &format!("/chats/{chat_id}/messages"), None)
            .await?;
        Ok(messages
            .into_iter()
            .map(|dto| dto.into_message(chat_id))
            .collect())
    }

    async fn post_message(
        &self,
        chat_id: &str,
        outgoing: &OutgoingMessage,
    ) -> GatewayResult<MessageExchange> {
        let exchange: ExchangeDto = self
            .call_expecting(
                Method::POST,
                &format!("/chats/{chat_id}/messages"),
                Some(outgoing),
            )
            .await?;
        Ok(exchange.into_exchange(chat_id))
    }

    async fn post_feedback(
        &self,
        chat_id: &str,
        message_id: i64,
        feedback: &Feedback,
    ) -> GatewayResult<()> {
        self.call::<_, serde_json::Value>(
            Method::POST,
            &format!("/chats/{chat_id}/messages/{message_id}/feedback"),
            Some(feedback),
        )
        .await?;
        Ok(())
    }

    async fn fetch_drive_tree(&self) -> GatewayResult<Vec<SourceNode>> {
        let items: Vec<DriveItemDto> = self
            .call_expecting::<(), _>(Method::GET, "/drive/items", None)
            .await?;
        Ok(items.into_iter().map(SourceNode::from).collect())
    }
}
