//! Conversation list cache
//!
//! A pull-based cache over the backend. The list is re-fetched whenever the
//! refresh token it last synced against goes stale; nothing is pushed.

use crate::backend::{Backend, TransportError};
use crate::refresh::RefreshToken;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Server-assigned conversation identifier
pub type ConversationId = i64;

/// Title the backend gives every new conversation
pub const DEFAULT_TITLE: &str = "New Conversation";

/// A backend-persisted thread of messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Local stand-in for a conversation the backend just created
    pub fn placeholder(id: ConversationId) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Accept RFC 3339 as well as SQLite's `CURRENT_TIMESTAMP` format (UTC, no offset)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Holds the loading flag up for as long as it lives, including when the
/// request future is dropped mid-flight
struct LoadingGuard<'a>(&'a mut bool);

impl<'a> LoadingGuard<'a> {
    fn new(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Cached conversation list, newest first
pub struct ConversationStore<B> {
    backend: Arc<B>,
    cached: Vec<Conversation>,
    last_synced: Option<RefreshToken>,
    loading: bool,
}

impl<B: Backend> ConversationStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            cached: Vec::new(),
            last_synced: None,
            loading: false,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.cached
    }

    #[allow(dead_code)] // API completeness
    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.cached.iter().find(|c| c.id == id)
    }

    /// True while a listing request is in flight
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Fetch the full list and replace the cache.
    ///
    /// On failure the previous cache is left untouched; no empty list is
    /// substituted.
    pub async fn list(&mut self) -> Result<&[Conversation], TransportError> {
        let result = {
            let _loading = LoadingGuard::new(&mut self.loading);
            self.backend.list_conversations().await
        };

        let mut conversations = result?;
        // Stable, so backend order survives for equal timestamps
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.cached = conversations;
        Ok(&self.cached)
    }

    /// Create a conversation and put it at the head of the cache
    pub async fn create(&mut self) -> Result<Conversation, TransportError> {
        let id = self.backend.create_conversation().await?;
        let conversation = Conversation::placeholder(id);
        self.cached.retain(|c| c.id != id);
        self.cached.insert(0, conversation.clone());
        tracing::info!(conv_id = id, "Conversation created");
        Ok(conversation)
    }

    /// Delete a conversation. Backend failures are logged and swallowed;
    /// the entry leaves the cache either way.
    pub async fn delete(&mut self, id: ConversationId) {
        if let Err(e) = self.backend.delete_conversation(id).await {
            tracing::warn!(conv_id = id, error = %e, "Delete failed, ignoring");
        }
        self.cached.retain(|c| c.id != id);
    }

    /// Re-list if `token` differs from the one last synced against.
    ///
    /// Returns whether a fetch happened. A failed fetch leaves the token
    /// unseen so the next sync retries.
    pub async fn sync(&mut self, token: RefreshToken) -> Result<bool, TransportError> {
        if self.last_synced == Some(token) {
            return Ok(false);
        }
        self.list().await?;
        self.last_synced = Some(token);
        Ok(true)
    }
}
