//! Wire types for the chat backend

use crate::conversations::ConversationId;
use serde::{Deserialize, Serialize};

/// Response to `POST /api/conversations`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedConversation {
    pub id: ConversationId,
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub conversation_id: ConversationId,
    pub message: String,
}

/// Response to `POST /api/chat`: one complete reply, never streamed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}
