//! Chat backend abstraction
//!
//! The session talks to the assistant service only through [`Backend`], so the
//! HTTP client can be swapped for an in-memory fake in tests.

mod error;
mod http;
mod types;

#[cfg(test)]
pub mod testing;

pub use error::{TransportError, TransportErrorKind};
pub use http::HttpBackend;
pub use types::*;

use crate::conversations::{Conversation, ConversationId};
use crate::messages::Message;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Request/response boundary to the assistant service
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /api/conversations`, newest first
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError>;

    /// `POST /api/conversations`, returns the server-assigned id
    async fn create_conversation(&self) -> Result<ConversationId, TransportError>;

    /// `DELETE /api/conversations/{id}`
    async fn delete_conversation(&self, id: ConversationId) -> Result<(), TransportError>;

    /// `GET /api/messages/{id}`, full history in send order
    async fn load_messages(&self, id: ConversationId) -> Result<Vec<Message>, TransportError>;

    /// `POST /api/chat`
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError>;
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        (**self).list_conversations().await
    }

    async fn create_conversation(&self) -> Result<ConversationId, TransportError> {
        (**self).create_conversation().await
    }

    async fn delete_conversation(&self, id: ConversationId) -> Result<(), TransportError> {
        (**self).delete_conversation(id).await
    }

    async fn load_messages(&self, id: ConversationId) -> Result<Vec<Message>, TransportError> {
        (**self).load_messages(id).await
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        (**self).send_chat(request).await
    }
}

/// Logging wrapper for backends
pub struct LoggingBackend<B> {
    inner: B,
}

impl<B: Backend> LoggingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(operation: &str, start: Instant, result: &Result<T, TransportError>) {
    let duration = start.elapsed();
    match result {
        Ok(_) => {
            tracing::debug!(
                operation,
                duration_ms = %duration.as_millis(),
                "Backend request completed"
            );
        }
        Err(e) => {
            tracing::warn!(
                operation,
                duration_ms = %duration.as_millis(),
                kind = e.kind.as_str(),
                status = ?e.status,
                error = %e.message,
                "Backend request failed"
            );
        }
    }
}

#[async_trait]
impl<B: Backend> Backend for LoggingBackend<B> {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        let start = Instant::now();
        let result = self.inner.list_conversations().await;
        log_outcome("list_conversations", start, &result);
        result
    }

    async fn create_conversation(&self) -> Result<ConversationId, TransportError> {
        let start = Instant::now();
        let result = self.inner.create_conversation().await;
        log_outcome("create_conversation", start, &result);
        result
    }

    async fn delete_conversation(&self, id: ConversationId) -> Result<(), TransportError> {
        let start = Instant::now();
        let result = self.inner.delete_conversation(id).await;
        log_outcome("delete_conversation", start, &result);
        result
    }

    async fn load_messages(&self, id: ConversationId) -> Result<Vec<Message>, TransportError> {
        let start = Instant::now();
        let result = self.inner.load_messages(id).await;
        log_outcome("load_messages", start, &result);
        result
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        let start = Instant::now();
        let result = self.inner.send_chat(request).await;
        log_outcome("send_chat", start, &result);
        if let Ok(reply) = &result {
            tracing::info!(
                conv_id = request.conversation_id,
                response_chars = reply.response.chars().count(),
                "Chat reply received"
            );
        }
        result
    }
}
