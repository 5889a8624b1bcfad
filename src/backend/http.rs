//! HTTP implementation of the chat backend

use super::{Backend, ChatReply, ChatRequest, CreatedConversation, TransportError};
use crate::config::ClientConfig;
use crate::conversations::{Conversation, ConversationId};
use crate::messages::Message;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

/// Talks to the chat service under `{base_url}/api`
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, &config.api_base))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turn non-2xx responses into errors, keeping the body for the log
    async fn check(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::status(status.as_u16(), &body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::decode(format!("Unexpected response body: {e}")))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, TransportError> {
        let response = self.client.get(self.url("conversations")).send().await?;
        Self::decode(response).await
    }

    async fn create_conversation(&self) -> Result<ConversationId, TransportError> {
        let response = self.client.post(self.url("conversations")).send().await?;
        let created: CreatedConversation = Self::decode(response).await?;
        Ok(created.id)
    }

    async fn delete_conversation(&self, id: ConversationId) -> Result<(), TransportError> {
        let response = self
            .client
            .delete(self.url(&format!("conversations/{id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn load_messages(&self, id: ConversationId) -> Result<Vec<Message>, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("messages/{id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        let response = self
            .client
            .post(self.url("chat"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }
}
